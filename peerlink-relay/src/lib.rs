mod relay_service;
mod ws_handler;

pub use relay_service::*;
pub use ws_handler::*;

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;

/// Router serving the relay protocol on `/`.
pub fn router(service: RelayService) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .with_state(service)
}

/// Serves the relay on `listener` until the process stops.
pub async fn serve(listener: TcpListener, service: RelayService) -> std::io::Result<()> {
    axum::serve(listener, router(service)).await
}
