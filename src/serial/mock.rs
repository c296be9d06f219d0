//! A mock serial device.
//! Bytes it should "receive from the wire" are scripted,
//! and everything written to it is recorded.
//!
//! Clones share the same device, so a test can keep one
//! while the relay owns another.

use std::{
    collections::VecDeque,
    io,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tracing::trace;

use super::SerialDevice;

/// What the next poll of a [`MockSerial`] yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockInput {
    /// A byte arrives.
    Byte(u8),

    /// Nothing arrives in time.
    Idle,

    /// The device fails.
    Fail,
}

#[derive(Debug, Default)]
struct State {
    input: VecDeque<MockInput>,
    written: Vec<u8>,
    write_budget: Option<usize>,
    fail_writes: bool,
}

/// In-memory [`SerialDevice`].
#[derive(Debug, Clone, Default)]
pub struct MockSerial {
    state: Arc<Mutex<State>>,
}

impl MockSerial {
    /// A device with nothing to say.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Script bytes the device will produce, one per poll.
    pub fn push_bytes<B: AsRef<[u8]>>(&self, bytes: B) {
        self.state()
            .input
            .extend(bytes.as_ref().iter().copied().map(MockInput::Byte));
    }

    /// Script an arbitrary poll outcome.
    pub fn push(&self, input: MockInput) {
        self.state().input.push_back(input);
    }

    /// Limit how many bytes each write accepts.
    /// `None` accepts everything.
    pub fn set_write_budget(&self, budget: Option<usize>) {
        self.state().write_budget = budget;
    }

    /// Make every following write fail.
    pub fn fail_writes(&self) {
        self.state().fail_writes = true;
    }

    /// Everything written so far.
    pub fn written(&self) -> Vec<u8> {
        self.state().written.clone()
    }

    /// How many scripted poll outcomes are left.
    pub fn pending_input(&self) -> usize {
        self.state().input.len()
    }
}

impl SerialDevice for MockSerial {
    async fn poll_byte(&mut self, _wait: Duration) -> io::Result<Option<u8>> {
        match self.state().input.pop_front() {
            Some(MockInput::Byte(byte)) => Ok(Some(byte)),
            Some(MockInput::Idle) | None => Ok(None),
            Some(MockInput::Fail) => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "mock serial device failed",
            )),
        }
    }

    fn try_write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let mut state = self.state();

        if state.fail_writes {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "mock serial device failed",
            ));
        }

        let accepted = match state.write_budget {
            Some(budget) => bytes.len().min(budget),
            None => bytes.len(),
        };

        trace!("Mock serial accepted {accepted} of {} byte(s)", bytes.len());
        state.written.extend_from_slice(&bytes[..accepted]);

        Ok(accepted)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn scripted_input_then_idle() {
        let mut serial = MockSerial::new();
        serial.push_bytes(b"ab");
        serial.push(MockInput::Idle);
        serial.push(MockInput::Fail);

        assert_eq!(serial.poll_byte(Duration::ZERO).await.unwrap(), Some(b'a'));
        assert_eq!(serial.poll_byte(Duration::ZERO).await.unwrap(), Some(b'b'));
        assert_eq!(serial.poll_byte(Duration::ZERO).await.unwrap(), None);
        assert!(serial.poll_byte(Duration::ZERO).await.is_err());
        assert_eq!(serial.poll_byte(Duration::ZERO).await.unwrap(), None);
    }

    #[test]
    fn write_budget_limits_each_write() {
        let mut serial = MockSerial::new();
        serial.set_write_budget(Some(2));

        assert_eq!(serial.try_write(b"hello").unwrap(), 2);
        assert_eq!(serial.try_write(b"llo").unwrap(), 2);
        assert_eq!(serial.written(), b"hell");
    }

    #[test]
    fn clones_share_the_device() {
        let observer = MockSerial::new();
        let mut device = observer.clone();

        device.try_write(b"shared").unwrap();
        observer.push_bytes(b"x");

        assert_eq!(observer.written(), b"shared");
        assert_eq!(device.pending_input(), 1);
    }
}
