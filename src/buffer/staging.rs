use bytes::{Bytes, BytesMut};

use super::BufferError;

/// How many serial bytes may wait for the next write opportunity.
pub const STAGING_CAPACITY: usize = 256;

/// Holds bytes read from serial until the active session can take them.
///
/// Not a ring: once full, appends fail instead of wrapping over older bytes.
#[derive(Debug)]
pub struct StagingBuffer {
    bytes: BytesMut,
    capacity: usize,
}

impl Default for StagingBuffer {
    fn default() -> Self {
        Self::new(STAGING_CAPACITY)
    }
}

impl StagingBuffer {
    /// An empty buffer holding at most `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a byte at the end.
    pub fn append(&mut self, byte: u8) -> Result<(), BufferError> {
        if self.bytes.len() >= self.capacity {
            return Err(BufferError::Full {
                capacity: self.capacity,
            });
        }

        self.bytes.extend_from_slice(&[byte]);
        Ok(())
    }

    /// Take everything staged so far as one message, leaving the buffer empty.
    ///
    /// Returns `None` if nothing was staged.
    pub fn flush(&mut self) -> Option<Bytes> {
        if self.bytes.is_empty() {
            return None;
        }

        let message = self.bytes.split().freeze();
        self.bytes.reserve(self.capacity);

        Some(message)
    }

    /// Drop everything staged so far.
    pub fn reset(&mut self) {
        self.bytes.clear();
    }

    /// Bytes staged so far.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of bytes staged.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True when nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// True when another append would fail.
    pub fn is_full(&self) -> bool {
        self.bytes.len() >= self.capacity
    }

    /// Maximum number of staged bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn fills_to_capacity_then_overflows() {
        let mut staging = StagingBuffer::default();

        for i in 0..STAGING_CAPACITY {
            staging.append(i as u8).unwrap();
        }
        assert!(staging.is_full());

        let err = staging.append(0xff).unwrap_err();
        assert_eq!(
            err,
            BufferError::Full {
                capacity: STAGING_CAPACITY
            }
        );
        assert_eq!(staging.len(), STAGING_CAPACITY);
        assert_eq!(staging.as_slice()[STAGING_CAPACITY - 1], (STAGING_CAPACITY - 1) as u8);
    }

    #[test]
    fn flush_hands_out_one_message_in_order() {
        let mut staging = StagingBuffer::default();
        staging.append(0x48).unwrap();
        staging.append(0x49).unwrap();

        let message = staging.flush().unwrap();

        assert_eq!(&message[..], &[0x48, 0x49]);
        assert!(staging.is_empty());
    }

    #[test]
    fn flush_of_nothing_is_none() {
        let mut staging = StagingBuffer::default();

        assert_eq!(staging.flush(), None);
    }

    #[test]
    fn next_append_after_flush_starts_over() {
        let mut staging = StagingBuffer::new(2);
        staging.append(1).unwrap();
        staging.append(2).unwrap();
        staging.flush().unwrap();

        staging.append(3).unwrap();
        staging.append(4).unwrap();
        assert!(staging.append(5).is_err());

        assert_eq!(staging.flush().unwrap(), Bytes::from_static(&[3, 4]));
    }

    #[test]
    fn reset_discards() {
        let mut staging = StagingBuffer::default();
        staging.append(b'x').unwrap();

        staging.reset();

        assert!(staging.is_empty());
        assert_eq!(staging.flush(), None);
    }

    #[test]
    fn flushed_message_is_unaffected_by_later_appends() {
        let mut staging = StagingBuffer::default();
        staging.append(b'a').unwrap();
        let first = staging.flush().unwrap();

        staging.append(b'b').unwrap();

        assert_eq!(&first[..], b"a");
        assert_eq!(staging.as_slice(), b"b");
    }
}
