use std::net::SocketAddr;

use axum::{response::IntoResponse, routing::get, Extension, Router};
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::{
    error::Error,
    websocket::{self, ConnectionSender},
};

/// The default port to run the server on.
pub const DEFAULT_PORT: u16 = 8000;

/// Bind the websocket server and start serving in the background.
///
/// Returns the address actually bound, which matters when asking for port 0.
pub(crate) fn serve(
    addr: SocketAddr,
    connections: ConnectionSender,
) -> Result<(SocketAddr, JoinHandle<()>), Error> {
    let app = Router::new()
        .route("/", get(websocket::ws_handler))
        .route("/version", get(show_version))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                // Each websocket needs to be able to reach the transport
                .layer(Extension(connections)),
        );

    let server = axum::Server::try_bind(&addr)
        .map_err(|e| Error::Transport(format!("Could not listen on {addr}, problem: {e}")))?
        .serve(app.into_make_service_with_connect_info::<SocketAddr>());
    let addr = server.local_addr();

    info!("listening on {}", addr);

    let handle = tokio::spawn(async move {
        if let Err(e) = server.await {
            error!(?e, "Websocket server stopped");
        }
    });

    Ok((addr, handle))
}

async fn show_version() -> impl IntoResponse {
    format!("Serial Relay v{}\n", env!("CARGO_PKG_VERSION"))
}
