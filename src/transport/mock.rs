//! A scripted transport.
//!
//! Events are queued up front and handed out on the next [`Transport::service`].
//! Writes, closes and writability requests are recorded for inspection.

use std::{
    collections::{HashSet, VecDeque},
    time::Duration,
};

use bytes::Bytes;

use super::{Events, Transport, TransportError, TransportEvent, MAX_EVENTS_PER_SERVICE};
use crate::{error::Error, session::Session};

/// In-memory [`Transport`].
#[derive(Debug, Default)]
pub struct MockTransport {
    pending: VecDeque<TransportEvent>,
    gone: HashSet<Session>,
    sent: Vec<(Session, Bytes)>,
    closed: Vec<Session>,
    writable_requests: Vec<Session>,
    waits: Vec<Duration>,
    stopped: bool,
}

impl MockTransport {
    /// A transport where nothing happens.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event for the next service call.
    pub fn push(&mut self, event: TransportEvent) {
        self.pending.push_back(event);
    }

    /// Queue a new session.
    pub fn establish(&mut self, session: &Session) {
        self.gone.remove(session);
        self.push(TransportEvent::Established(session.clone()));
    }

    /// Queue a writability event.
    pub fn writable(&mut self, session: &Session) {
        self.push(TransportEvent::Writable(session.clone()));
    }

    /// Queue a message from the peer.
    pub fn receive(&mut self, session: &Session, message: impl Into<Bytes>) {
        self.push(TransportEvent::Received(session.clone(), message.into()));
    }

    /// Queue the peer going away.
    pub fn peer_close(&mut self, session: &Session) {
        self.push(TransportEvent::Closed(session.clone()));
    }

    /// Make every following service call fail.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Everything written, in order.
    pub fn sent(&self) -> &[(Session, Bytes)] {
        &self.sent
    }

    /// Everything written to one session, in order.
    pub fn sent_to(&self, session: &Session) -> Vec<Bytes> {
        self.sent
            .iter()
            .filter(|(to, _)| to == session)
            .map(|(_, message)| message.clone())
            .collect()
    }

    /// Sessions closed from our side, in order.
    pub fn closed(&self) -> &[Session] {
        &self.closed
    }

    /// Every writability request made.
    pub fn writable_requests(&self) -> &[Session] {
        &self.writable_requests
    }

    /// The wait given to each service call.
    pub fn waits(&self) -> &[Duration] {
        &self.waits
    }

    /// Events not yet handed out.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl Transport for MockTransport {
    async fn service(&mut self, wait: Duration) -> Result<Events, Error> {
        self.waits.push(wait);

        if self.stopped {
            return Err(Error::Transport("Mock transport stopped".into()));
        }

        let count = self.pending.len().min(MAX_EVENTS_PER_SERVICE);
        let events = self.pending.drain(..count).collect::<Vec<_>>();

        for event in &events {
            if let TransportEvent::Closed(session) = event {
                self.gone.insert(session.clone());
            }
        }

        Ok(events.into())
    }

    fn write(&mut self, session: &Session, message: Bytes) -> Result<(), TransportError> {
        if self.gone.contains(session) {
            return Err(TransportError::NoSuchSession(session.to_string()));
        }

        self.sent.push((session.clone(), message));
        Ok(())
    }

    fn request_writable(&mut self, session: &Session) {
        self.writable_requests.push(session.clone());
    }

    fn close(&mut self, session: &Session) {
        self.gone.insert(session.clone());
        self.closed.push(session.clone());
    }
}
