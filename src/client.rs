use bytes::Bytes;
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};
use tungstenite::{
    client::IntoClientRequest, error::ProtocolError, http::HeaderValue, Message,
};

use crate::websocket::PROTOCOL;

type Stream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Problems a client can run into.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The websocket misbehaved.
    #[error("Websocket issue")]
    Websocket(#[from] tungstenite::Error),
}

/// A websocket session with a running relay.
pub struct Client {
    stream: Stream,
}

impl Client {
    /// Connect to a relay at the given address and port, e.g. `localhost` and `8000`.
    pub async fn connect(address: &str, port: u16) -> Result<Self, ClientError> {
        let mut request = format!("ws://{address}:{port}/").into_client_request()?;
        request
            .headers_mut()
            .insert("Sec-WebSocket-Protocol", HeaderValue::from_static(PROTOCOL));

        let (stream, response) = tokio_tungstenite::connect_async(request).await?;
        debug!(status = %response.status(), "Connected to {address}:{port}");

        Ok(Self { stream })
    }

    /// Send bytes to the serial device.
    pub async fn send<B: Into<Vec<u8>>>(&mut self, bytes: B) -> Result<(), ClientError> {
        send(&mut self.stream, bytes.into()).await
    }

    /// Await the next message from the serial device.
    ///
    /// `None` means the relay closed the session.
    pub async fn next_message(&mut self) -> Result<Option<Bytes>, ClientError> {
        next_message(&mut self.stream).await
    }

    /// Say goodbye.
    pub async fn close(mut self) -> Result<(), ClientError> {
        match self.stream.close(None).await {
            Ok(()) => Ok(()),
            Err(e) if is_closed(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Split into a writing and a reading half, which can be used from separate tasks.
    pub fn split(self) -> (ClientWriter, ClientReader) {
        let (sink, stream) = self.stream.split();

        (ClientWriter(sink), ClientReader(stream))
    }
}

/// The writing half of a [`Client`].
pub struct ClientWriter(SplitSink<Stream, Message>);

impl ClientWriter {
    /// See [`Client::send`].
    pub async fn send<B: Into<Vec<u8>>>(&mut self, bytes: B) -> Result<(), ClientError> {
        send(&mut self.0, bytes.into()).await
    }
}

/// The reading half of a [`Client`].
pub struct ClientReader(SplitStream<Stream>);

impl ClientReader {
    /// See [`Client::next_message`].
    pub async fn next_message(&mut self) -> Result<Option<Bytes>, ClientError> {
        next_message(&mut self.0).await
    }
}

async fn send<S>(sink: &mut S, bytes: Vec<u8>) -> Result<(), ClientError>
where
    S: futures::Sink<Message, Error = tungstenite::Error> + Unpin,
{
    trace!("Sending {} byte(s)", bytes.len());
    sink.send(Message::Binary(bytes)).await?;

    Ok(())
}

async fn next_message<S>(stream: &mut S) -> Result<Option<Bytes>, ClientError>
where
    S: futures::Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Binary(bytes)) => return Ok(Some(bytes.into())),
            Ok(Message::Text(text)) => return Ok(Some(text.into())),
            Ok(Message::Close(frame)) => {
                debug!(?frame, "Closed by relay");
                return Ok(None);
            }
            Ok(_) => continue,
            Err(e) if is_closed(&e) => return Ok(None),
            Err(e) => return Err(e.into()),
        }
    }

    Ok(None)
}

fn is_closed(e: &tungstenite::Error) -> bool {
    match e {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => true,
        tungstenite::Error::Protocol(ProtocolError::ResetWithoutClosingHandshake) => true,
        tungstenite::Error::Io(e) => matches!(
            e.kind(),
            std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::BrokenPipe
        ),
        _ => false,
    }
}
