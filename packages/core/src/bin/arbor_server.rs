//! Arbor server binary
//!
//! Loads the snapshot (or seeds a demo tree), serves the WebSocket endpoint
//! and saves the tree back on Ctrl-C.

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use arbor_core::server::auth::{Principal, StaticTokenDecoder, TokenDecoder};
use arbor_core::server::{self, AppState};
use arbor_core::storage::{self, StorageError};
use arbor_core::{Container, NodeTypeRegistry, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();

    let container = match storage::load_snapshot(&config.snapshot_path).await {
        Ok(snapshot) => Container::from_parts(snapshot.root, snapshot.relations)?,
        Err(StorageError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %config.snapshot_path.display(), "no snapshot, seeding demo tree");
            Container::seed()
        }
        Err(err) => return Err(err.into()),
    };

    let decoder: Arc<dyn TokenDecoder> = match &config.admin_token {
        Some(token) => Arc::new(StaticTokenDecoder::new().with_token(
            token.clone(),
            Principal::new("admin", vec!["admin".to_string()]),
        )),
        None => {
            warn!("ARBOR_ADMIN_TOKEN not set; role-gated nodes will not be pushed");
            Arc::new(StaticTokenDecoder::new())
        }
    };

    let state = AppState::new(container, NodeTypeRegistry::builtin(), decoder);

    tokio::select! {
        result = server::serve(&config, state.clone()) => result?,
        _ = tokio::signal::ctrl_c() => info!("shutdown requested"),
    }

    let container = state.container.read().await;
    storage::save_snapshot(&config.snapshot_path, &container).await?;
    Ok(())
}
