use std::{collections::HashMap, net::SocketAddr, time::Duration};

use bytes::Bytes;
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
};
use tracing::{debug, trace};

use super::{Events, Transport, TransportError, TransportEvent, MAX_EVENTS_PER_SERVICE};
use crate::{
    error::Error,
    server,
    session::Session,
    websocket::ConnectionEvent,
};

/// Sessions over websockets.
///
/// The server and its connection tasks run on the same runtime as the caller,
/// they only forward frames. Session state lives here, with whoever calls
/// [`Transport::service`].
pub struct WebsocketTransport {
    connections: mpsc::UnboundedReceiver<ConnectionEvent>,
    outboxes: HashMap<Session, mpsc::Sender<Bytes>>,
    wants_writable: Vec<Session>,
    local_addr: SocketAddr,
    server: JoinHandle<()>,
}

impl WebsocketTransport {
    /// Start listening for websocket sessions on the given address.
    ///
    /// Use port 0 to get any free port, see [`WebsocketTransport::local_addr`].
    pub async fn bind(addr: SocketAddr) -> Result<Self, Error> {
        let (connections_sender, connections) = mpsc::unbounded_channel();

        let (local_addr, server) = server::serve(addr, connections_sender)?;

        Ok(Self {
            connections,
            outboxes: HashMap::new(),
            wants_writable: vec![],
            local_addr,
            server,
        })
    }

    /// The address the server listens on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    fn is_writable(&self, session: &Session) -> bool {
        self.outboxes
            .get(session)
            .map_or(false, |outbox| outbox.capacity() > 0)
    }

    fn track(&mut self, event: ConnectionEvent, events: &mut Vec<TransportEvent>) {
        match event {
            ConnectionEvent::Opened { session, outbox } => {
                debug!(%session, "Opened");
                self.outboxes.insert(session.clone(), outbox);
                events.push(TransportEvent::Established(session));
            }
            ConnectionEvent::Message { session, message } => {
                events.push(TransportEvent::Received(session, message));
            }
            ConnectionEvent::Closed { session } => {
                debug!(%session, "Closed");
                self.outboxes.remove(&session);
                self.wants_writable.retain(|waiting| waiting != &session);
                events.push(TransportEvent::Closed(session));
            }
        }
    }

    fn collect_writable(&mut self, events: &mut Vec<TransportEvent>) {
        let outboxes = &self.outboxes;

        self.wants_writable
            .retain(|session| match outboxes.get(session) {
                Some(outbox) if outbox.capacity() > 0 => {
                    events.push(TransportEvent::Writable(session.clone()));
                    false
                }
                // Still busy sending the last one.
                Some(_) => true,
                None => false,
            });
    }
}

impl Transport for WebsocketTransport {
    async fn service(&mut self, wait: Duration) -> Result<Events, Error> {
        if self.server.is_finished() {
            return Err(Error::Transport("Websocket server stopped".into()));
        }

        let mut events = vec![];

        // Only sit and wait if there is nothing to report already.
        let anything_writable = self
            .wants_writable
            .iter()
            .any(|session| self.is_writable(session));

        if !anything_writable {
            match tokio::time::timeout(wait, self.connections.recv()).await {
                Ok(Some(event)) => self.track(event, &mut events),
                Ok(None) => return Err(Error::Transport("Websocket server stopped".into())),
                Err(_elapsed) => {}
            }
        }

        while events.len() < MAX_EVENTS_PER_SERVICE {
            match self.connections.try_recv() {
                Ok(event) => self.track(event, &mut events),
                // A disconnected channel is noticed on the next call.
                Err(_) => break,
            }
        }

        self.collect_writable(&mut events);

        if !events.is_empty() {
            trace!("{} event(s)", events.len());
        }

        Ok(events.into())
    }

    fn write(&mut self, session: &Session, message: Bytes) -> Result<(), TransportError> {
        let outbox = self
            .outboxes
            .get(session)
            .ok_or_else(|| TransportError::NoSuchSession(session.to_string()))?;

        outbox.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::NotWritable(session.to_string()),
            TrySendError::Closed(_) => TransportError::NoSuchSession(session.to_string()),
        })
    }

    fn request_writable(&mut self, session: &Session) {
        if self.outboxes.contains_key(session) && !self.wants_writable.contains(session) {
            self.wants_writable.push(session.clone());
        }
    }

    fn close(&mut self, session: &Session) {
        // Dropping the outbox lets the write task finish what is queued,
        // then it closes the socket.
        if self.outboxes.remove(session).is_some() {
            debug!(%session, "Closing");
        }
        self.wants_writable.retain(|waiting| waiting != session);
    }
}

impl Drop for WebsocketTransport {
    fn drop(&mut self) {
        self.server.abort();
    }
}
