use std::io::{self, Write};

/// Mirrors serial bytes to a local terminal.
///
/// Bytes passed to a session are shown in red, bytes nobody is listening for in green.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalEcho {
    enabled: bool,
}

impl LocalEcho {
    /// Echo only if `enabled`.
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Whether anything is echoed.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Echo a byte to stdout.
    pub fn echo(&self, byte: u8, relayed: bool) {
        if !self.enabled {
            return;
        }

        let mut stdout = io::stdout().lock();
        // Echo is best effort, a closed stdout must not end the relay.
        let _ = write_colored(&mut stdout, byte, relayed).and_then(|_| stdout.flush());
    }
}

fn write_colored(out: &mut impl Write, byte: u8, relayed: bool) -> io::Result<()> {
    let color = if relayed { 31 } else { 32 };
    write!(out, "\x1B[{color}m{}\x1B[0m", byte as char)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn relayed_is_red() {
        let mut out = vec![];
        write_colored(&mut out, b'A', true).unwrap();

        assert_eq!(out, b"\x1B[31mA\x1B[0m");
    }

    #[test]
    fn discarded_is_green() {
        let mut out = vec![];
        write_colored(&mut out, b'B', false).unwrap();

        assert_eq!(out, b"\x1B[32mB\x1B[0m");
    }
}
