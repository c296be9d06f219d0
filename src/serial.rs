use std::{fmt::Display, io, str::FromStr, time::Duration};

/// The real serial port.
pub mod serial_port;

/// An in-memory serial device, for tests.
pub mod mock;

/// A byte-oriented serial device, as the relay needs it.
///
/// Neither method may block for longer than asked to.
#[allow(async_fn_in_trait)]
pub trait SerialDevice {
    /// Wait at most `wait` for a single byte.
    ///
    /// `Ok(None)` means nothing arrived in time.
    async fn poll_byte(&mut self, wait: Duration) -> io::Result<Option<u8>>;

    /// Write as many of `bytes` as the device accepts right now,
    /// returning how many that was. Zero means the device is not ready.
    fn try_write(&mut self, bytes: &[u8]) -> io::Result<usize>;
}

/// The baud rates the relay supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BaudRate {
    /// 9600 baud.
    B9600,

    /// 115200 baud.
    #[default]
    B115200,
}

impl BaudRate {
    /// Bits per second.
    pub fn bits_per_second(self) -> u32 {
        match self {
            BaudRate::B9600 => 9600,
            BaudRate::B115200 => 115_200,
        }
    }
}

impl TryFrom<u32> for BaudRate {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            9600 => Ok(BaudRate::B9600),
            115_200 => Ok(BaudRate::B115200),
            other => Err(format!(
                "Unsupported baudrate {other}, use one of 9600 or 115200"
            )),
        }
    }
}

impl FromStr for BaudRate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("Unsupported baudrate `{s}`, use one of 9600 or 115200"))?;

        Self::try_from(value)
    }
}

impl Display for BaudRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.bits_per_second())
    }
}
