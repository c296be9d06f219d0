#![deny(missing_docs)]
#![doc = include_str!("../README.md")]

/// Bounded buffers, both directions.
pub mod buffer;

/// Who gets to drive the serial line.
pub mod arbitrator;

/// The loop tying the serial device and the transport together.
pub mod relay;

/// A remote peer.
pub mod session;

/// Message-based transports carrying sessions.
pub mod transport;

/// Serial device drivers.
pub mod serial;

/// Mirroring serial output to a local terminal.
pub mod echo;

/// Code relating to setting up the server which accepts websockets.
pub mod server;

/// Handles incoming websockets.
pub(crate) mod websocket;

pub use websocket::PROTOCOL;

/// Clients.
pub mod client;

/// The command line interface.
pub mod cli;

/// Relates to config files.
pub mod config;

/// Possible errors in this library.
pub mod error;

/// Logging/tracing setup.
pub mod logging;
