use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;

use crate::{error::Error, session::Session};

/// Websocket transport, the one used in production.
pub mod websocket;

/// A scripted transport, for tests.
pub mod mock;

/// The most events a single [`Transport::service`] call hands out.
pub const MAX_EVENTS_PER_SERVICE: usize = 64;

/// Something that happened on the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A session was established.
    Established(Session),

    /// A session which asked to be told can now take a message.
    /// See [`Transport::request_writable`].
    Writable(Session),

    /// A session sent a message.
    Received(Session, Bytes),

    /// A session is gone.
    Closed(Session),
}

/// A finite batch of events from one [`Transport::service`] call.
#[derive(Debug)]
pub struct Events(std::vec::IntoIter<TransportEvent>);

impl From<Vec<TransportEvent>> for Events {
    fn from(events: Vec<TransportEvent>) -> Self {
        Self(events.into_iter())
    }
}

impl Iterator for Events {
    type Item = TransportEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

/// Problems with a single session.
/// These do not affect the transport as a whole.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The session is closed, or was never known.
    #[error("No such session: {0}")]
    NoSuchSession(String),

    /// The session cannot take another message yet.
    #[error("Session {0} is not writable right now")]
    NotWritable(String),
}

/// A message-based transport carrying sessions.
///
/// Events are pulled with [`Transport::service`] instead of being pushed via callbacks,
/// so all session state stays with whoever calls it.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Wait at most `wait` for something to happen, then hand out what did.
    ///
    /// Errors here mean the transport as a whole is broken.
    async fn service(&mut self, wait: Duration) -> Result<Events, Error>;

    /// Send one message to a session.
    fn write(&mut self, session: &Session, message: Bytes) -> Result<(), TransportError>;

    /// Ask for a [`TransportEvent::Writable`] once the session can take a message.
    fn request_writable(&mut self, session: &Session);

    /// Close a session.
    /// Messages already written are still delivered before the close.
    fn close(&mut self, session: &Session);
}
