//! WebSocket Server
//!
//! Hosts the synchronization protocol on a single WebSocket route (`/ws`).
//! Everything else about HTTP is out of scope; the router exists to upgrade
//! connections and hand them to [`connection`].

pub mod auth;
mod connection;

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::models::NodeTypeRegistry;
use crate::server::auth::TokenDecoder;
use crate::tree::Container;

/// The container as shared by every connection.
pub type SharedContainer = Arc<RwLock<Container>>;

/// State shared across all connections.
#[derive(Clone)]
pub struct AppState {
    pub container: SharedContainer,
    pub registry: Arc<NodeTypeRegistry>,
    pub decoder: Arc<dyn TokenDecoder>,
}

impl AppState {
    pub fn new(
        container: Container,
        registry: NodeTypeRegistry,
        decoder: Arc<dyn TokenDecoder>,
    ) -> Self {
        AppState {
            container: Arc::new(RwLock::new(container)),
            registry: Arc::new(registry),
            decoder,
        }
    }
}

/// Build the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_upgrade))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| connection::handle_socket(socket, state))
}

/// Bind and serve until the task is cancelled.
pub async fn serve(config: &ServerConfig, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "socket server listening");
    axum::serve(listener, create_router(state)).await?;
    Ok(())
}
