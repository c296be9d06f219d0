#![allow(dead_code)]

use std::{
    net::{Ipv4Addr, SocketAddr},
    time::Duration,
};

use axum::http::StatusCode;
use bytes::Bytes;
use color_eyre::{eyre::eyre, Result};
use futures::StreamExt;
use serial_relay::{
    buffer::RingBuffer,
    client::Client,
    config::Config,
    relay::Relay,
    serial::mock::MockSerial,
    session::Session,
    transport::{mock::MockTransport, websocket::WebsocketTransport},
};
use tokio::{net::TcpStream, time::timeout};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{info, Level};
use tungstenite::{client::IntoClientRequest, http::HeaderValue, Message};

pub type MockRelay = Relay<MockTransport, MockSerial>;

pub const PATIENCE: Duration = Duration::from_secs(5);

pub async fn init_logging() {
    serial_relay::logging::init(Level::DEBUG, None).await;
}

pub fn session(port: u16) -> Session {
    Session::new(SocketAddr::from(([127, 0, 0, 1], port)))
}

pub fn mock_relay_with_config(config: Config) -> Result<(MockRelay, MockSerial)> {
    let serial = MockSerial::new();
    let inbound = RingBuffer::new(config.inbound_capacity)?;

    let relay = Relay::new(MockTransport::new(), serial.clone(), inbound, &config);

    Ok((relay, serial))
}

pub fn mock_relay() -> Result<(MockRelay, MockSerial)> {
    mock_relay_with_config(Config::default())
}

/// Tick until the serial device has nothing more to say.
pub async fn tick_until_drained(relay: &mut MockRelay, serial: &MockSerial) -> Result<()> {
    while serial.pending_input() > 0 {
        relay.tick().await?;
    }

    Ok(())
}

/// Start a relay on any free port with a mock serial device.
///
/// Must be called from within a [`tokio::task::LocalSet`].
pub async fn start_relay(serial: MockSerial) -> Result<u16> {
    let config = Config::default();

    let transport =
        WebsocketTransport::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0))).await?;
    let port = transport.local_addr().port();
    let inbound = RingBuffer::new(config.inbound_capacity)?;

    let mut relay = Relay::new(transport, serial, inbound, &config);

    tokio::task::spawn_local(async move {
        if let Err(e) = relay.run().await {
            info!("Relay stopped: {e}");
        }
    });

    Ok(port)
}

pub async fn connect_raw(port: u16) -> Result<WebSocketStream<MaybeTlsStream<TcpStream>>> {
    info!("Connecting to relay on port {port}");

    let mut request = format!("ws://127.0.0.1:{port}/").into_client_request()?;
    request.headers_mut().insert(
        "Sec-WebSocket-Protocol",
        HeaderValue::from_static(serial_relay::PROTOCOL),
    );

    let (stream, http_response) = tokio_tungstenite::connect_async(request).await?;

    assert_eq!(http_response.status(), StatusCode::SWITCHING_PROTOCOLS);
    assert_eq!(
        http_response
            .headers()
            .get("Sec-WebSocket-Protocol")
            .map(|value| value.as_bytes()),
        Some(serial_relay::PROTOCOL.as_bytes())
    );

    Ok(stream)
}

/// The next data message, or `None` once the relay closed the socket.
pub async fn receive_raw(
    client: &mut WebSocketStream<MaybeTlsStream<TcpStream>>,
) -> Result<Option<Bytes>> {
    loop {
        let message = match timeout(PATIENCE, client.next()).await? {
            None => return Ok(None),
            Some(Err(tungstenite::Error::ConnectionClosed)) => return Ok(None),
            Some(message) => message?,
        };

        match message {
            Message::Binary(bytes) => return Ok(Some(bytes.into())),
            Message::Text(text) => return Ok(Some(text.into())),
            Message::Close(_) => return Ok(None),
            _ => continue,
        }
    }
}

/// Wait until the serial device has been written something ending with `expected`.
pub async fn wait_for_serial(serial: &MockSerial, expected: &[u8]) -> Result<()> {
    timeout(PATIENCE, async {
        while !serial.written().ends_with(expected) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .map_err(|_| {
        eyre!(
            "Serial never got {:?}, has {:?}",
            String::from_utf8_lossy(expected),
            String::from_utf8_lossy(&serial.written())
        )
    })
}

/// Collect messages until `expected_len` bytes arrived.
pub async fn receive_exactly(client: &mut Client, expected_len: usize) -> Result<Vec<u8>> {
    let mut received = vec![];

    while received.len() < expected_len {
        match timeout(PATIENCE, client.next_message()).await?? {
            Some(message) => received.extend_from_slice(&message),
            None => return Err(eyre!("Closed after {} byte(s)", received.len())),
        }
    }

    Ok(received)
}

/// Connect and make sure the relay made this client the active one.
pub async fn connect_active(port: u16, serial: &MockSerial, probe: &str) -> Result<Client> {
    let mut client = Client::connect("127.0.0.1", port).await?;

    // Only the active session is heard, so the probe reaching serial proves it.
    client.send(probe).await?;
    wait_for_serial(serial, probe.as_bytes()).await?;

    Ok(client)
}
