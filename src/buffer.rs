use thiserror::Error;

/// The bounded circular queue.
pub(crate) mod ring;

/// The flat serial-to-session staging buffer.
pub(crate) mod staging;

pub use ring::RingBuffer;
pub use staging::{StagingBuffer, STAGING_CAPACITY};

/// Errors from the bounded buffers.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum BufferError {
    /// No room for another element.
    #[error("Buffer is full (capacity {capacity})")]
    Full {
        /// How many elements the buffer holds when full.
        capacity: usize,
    },

    /// Nothing to take out.
    #[error("Buffer is empty")]
    Empty,

    /// The backing storage could not be set up.
    #[error("Could not allocate a buffer of capacity {capacity}")]
    Allocation {
        /// The requested capacity.
        capacity: usize,
    },
}
