//! Decides which single session gets to drive the serial line.
//!
//! The first session to establish is admitted and stays active until it closes.
//! Anyone else gets told the line is busy and is closed.

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::{
    buffer::{BufferError, StagingBuffer},
    error::Error,
    session::Session,
    transport::Transport,
};

/// What a session gets when someone else is already active.
pub const BUSY_NOTICE: &[u8] = b"BUSY\n\n";

/// Owns the active session and the serial output waiting for it.
#[derive(Debug, Default)]
pub struct Arbitrator {
    active: Option<Session>,
    staging: StagingBuffer,
}

impl Arbitrator {
    /// No active session, nothing staged.
    pub fn new() -> Self {
        Self::default()
    }

    /// The active session, if any.
    pub fn active(&self) -> Option<&Session> {
        self.active.as_ref()
    }

    /// True when some session is active.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Serial output waiting for the active session.
    pub fn staged(&self) -> &[u8] {
        self.staging.as_slice()
    }

    /// A session was established.
    pub fn on_establish<T: Transport>(&mut self, transport: &mut T, candidate: &Session) {
        match &self.active {
            None => {
                info!(session = %candidate, "Admitted");
                self.active = Some(candidate.clone());
            }
            Some(active) if active == candidate => {
                debug!(session = %candidate, "Already active, ignoring");
            }
            Some(active) => {
                info!(session = %candidate, %active, "Busy, rejecting");
                Self::reject(transport, candidate);
            }
        }
    }

    /// A session is gone.
    ///
    /// If it was the active one, whatever was staged for it is dropped.
    pub fn on_close(&mut self, session: &Session) {
        if self.active.as_ref() == Some(session) {
            info!(%session, "Active session closed");
            self.active = None;
            self.staging.reset();
        } else {
            debug!(%session, "Closed");
        }
    }

    /// A session can take a message.
    pub fn on_writable<T: Transport>(&mut self, transport: &mut T, session: &Session) {
        if self.active.as_ref() == Some(session) {
            self.flush(transport, session);
        } else {
            Self::reject(transport, session);
        }
    }

    /// A session sent something.
    ///
    /// Returns the message if it should reach the serial device.
    pub fn on_receive(&self, session: &Session, message: Bytes) -> Option<Bytes> {
        if self.active.as_ref() == Some(session) {
            Some(message)
        } else {
            debug!(%session, "Dropping {} byte(s) from inactive session", message.len());
            None
        }
    }

    /// Stage a serial byte for the active session and ask to be told when it can be sent.
    ///
    /// Returns false if there is no active session, in which case the byte is not kept.
    pub fn stage<T: Transport>(&mut self, transport: &mut T, byte: u8) -> Result<bool, Error> {
        let Some(active) = &self.active else {
            return Ok(false);
        };

        self.staging.append(byte).map_err(|e| match e {
            BufferError::Full { capacity } => Error::StagingOverflow { capacity },
            other => Error::Allocation(other),
        })?;

        transport.request_writable(active);

        Ok(true)
    }

    fn flush<T: Transport>(&mut self, transport: &mut T, session: &Session) {
        let Some(message) = self.staging.flush() else {
            return;
        };

        let len = message.len();
        match transport.write(session, message) {
            Ok(()) => debug!(%session, "Flushed {len} byte(s)"),
            Err(e) => warn!(%session, "Dropped {len} byte(s): {e}"),
        }
    }

    fn reject<T: Transport>(transport: &mut T, session: &Session) {
        if let Err(e) = transport.write(session, Bytes::from_static(BUSY_NOTICE)) {
            debug!(%session, "Could not send busy notice: {e}");
        }
        transport.close(session);
    }
}
