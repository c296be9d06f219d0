use std::net::SocketAddr;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        ConnectInfo, WebSocketUpgrade,
    },
    response::IntoResponse,
    Extension, TypedHeader,
};
use bytes::Bytes;
use futures::{sink::Sink, stream::Stream, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, trace, warn, Instrument};

use crate::session::Session;

/// The websocket subprotocol the relay speaks.
pub const PROTOCOL: &str = "serial-protocol";

/// How many messages may wait for a session's socket.
/// A session is writable when there is room here.
pub(crate) const OUTBOX_DEPTH: usize = 1;

/// What connection tasks tell the transport.
#[derive(Debug)]
pub(crate) enum ConnectionEvent {
    /// A websocket was upgraded.
    /// Messages put in the outbox are sent to the peer, dropping it closes the socket.
    Opened {
        session: Session,
        outbox: mpsc::Sender<Bytes>,
    },

    /// The peer sent something.
    Message { session: Session, message: Bytes },

    /// The socket is done.
    Closed { session: Session },
}

pub(crate) type ConnectionSender = mpsc::UnboundedSender<ConnectionEvent>;

pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    user_agent: Option<TypedHeader<headers::UserAgent>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Extension(connections): Extension<ConnectionSender>,
) -> impl IntoResponse {
    if let Some(TypedHeader(user_agent)) = user_agent {
        info!("`{}`@`{addr}` connected", user_agent.as_str());
    } else {
        info!("`{addr}` connected");
    }

    ws.protocols([PROTOCOL]).on_upgrade(move |socket| {
        let session = Session::new(addr);

        let span = info_span!("Session", %session);

        handle_websocket(socket, session, connections).instrument(span)
    })
}

async fn read<S>(mut receiver: S, session: Session, connections: ConnectionSender)
where
    S: Unpin,
    S: Stream<Item = Result<Message, axum::Error>>,
{
    while let Some(Ok(msg)) = receiver.next().await {
        let message = match msg {
            Message::Binary(bytes) => Bytes::from(bytes),
            Message::Text(text) => Bytes::from(text),
            Message::Ping(_) => {
                trace!("socket ping");
                continue;
            }
            Message::Pong(_) => {
                trace!("socket pong");
                continue;
            }
            Message::Close(_) => {
                debug!("client disconnected");
                break;
            }
        };

        trace!("{} byte(s) from client", message.len());

        if connections
            .send(ConnectionEvent::Message {
                session: session.clone(),
                message,
            })
            .is_err()
        {
            debug!("Transport gone");
            break;
        }
    }
}

async fn write(mut sender: impl Sink<Message> + Unpin, mut outbox: mpsc::Receiver<Bytes>) {
    while let Some(message) = outbox.recv().await {
        if sender.send(Message::Binary(message.to_vec())).await.is_err() {
            debug!("client disconnected");
            return;
        }
        trace!("Message flushed");
    }

    debug!("Outbox closed, closing socket");
    if sender.send(Message::Close(None)).await.is_err() {
        debug!("client already gone");
    }
}

pub(crate) async fn handle_websocket(
    websocket: WebSocket,
    session: Session,
    connections: ConnectionSender,
) {
    let (outbox_sender, outbox_receiver) = mpsc::channel::<Bytes>(OUTBOX_DEPTH);

    if connections
        .send(ConnectionEvent::Opened {
            session: session.clone(),
            outbox: outbox_sender,
        })
        .is_err()
    {
        warn!("Transport gone, dropping connection");
        return;
    }

    let (stream_sender, stream_receiver) = websocket.split();

    let mut write_handle = tokio::spawn(
        write(stream_sender, outbox_receiver).instrument(info_span!("Write")),
    );

    tokio::select! {
        _ = read(stream_receiver, session.clone(), connections.clone()).instrument(info_span!("Read")) => {
            debug!("Read side done, aborting write task");
            // This ensures the underlying TCP connection gets closed,
            // which signals the peer that the session is over.
            write_handle.abort();
        }
        _ = &mut write_handle => {
            debug!("Closed from our side");
        }
    }

    // The transport may already be gone if the relay stopped.
    let _ = connections.send(ConnectionEvent::Closed { session });
}
