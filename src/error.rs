use std::io;

use thiserror::Error;

use crate::buffer::BufferError;

/// Errors which end the relay.
///
/// None of these are retried, each maps to a distinct process exit code.
#[derive(Debug, Error)]
pub enum Error {
    /// The serial device could not be opened.
    #[error("Could not open serial device `{path}`")]
    SerialOpen {
        /// Path to the device.
        path: String,

        /// What went wrong.
        #[source]
        source: tokio_serial::Error,
    },

    /// The serial device opened but could not be set up.
    #[error("Could not configure serial device `{path}`")]
    SerialConfig {
        /// Path to the device.
        path: String,

        /// What went wrong.
        #[source]
        source: tokio_serial::Error,
    },

    /// A buffer could not be allocated.
    #[error("Buffer setup failed")]
    Allocation(#[source] BufferError),

    /// The transport engine could not be set up, or stopped.
    #[error("Transport problem: {0}")]
    Transport(String),

    /// Reading the serial device failed.
    #[error("Read fail on serial")]
    SerialRead(#[source] io::Error),

    /// Writing the serial device failed.
    #[error("Write fail on serial")]
    SerialWrite(#[source] io::Error),

    /// Serial output arrived faster than the active session took it.
    #[error("Output to the session overflowed ({capacity} bytes waiting), the session is not keeping up")]
    StagingOverflow {
        /// How many bytes were waiting.
        capacity: usize,
    },

    /// Input from the session arrived faster than the serial device took it.
    #[error("Input from the session overflowed: {incoming} byte(s) arrived with room for {free}")]
    InboundOverflow {
        /// The size of the message that did not fit.
        incoming: usize,

        /// How much room was left.
        free: usize,
    },
}

impl Error {
    /// The process exit code this error maps to.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::SerialOpen { .. } => 1,
            Error::SerialConfig { .. } => 2,
            Error::Allocation(_) => 3,
            Error::Transport(_) => 4,
            Error::SerialRead(_) | Error::SerialWrite(_) => 5,
            Error::StagingOverflow { .. } => 6,
            Error::InboundOverflow { .. } => 7,
        }
    }
}
