//! Snapshot Storage
//!
//! Load the tree at startup, save it on demand. The snapshot is a JSON file
//! holding the root node and the relation set; its exact shape is whatever
//! serde derives, deliberately not a designed format.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::models::Node;
use crate::tree::{Container, Relation};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("snapshot io failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot is not valid: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Everything a container needs to come back.
#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub root: Node,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl Snapshot {
    pub fn of(container: &Container) -> Self {
        Snapshot {
            root: container.root().clone(),
            relations: container.relations().to_vec(),
        }
    }
}

/// Read a snapshot from disk.
pub async fn load_snapshot(path: impl AsRef<Path>) -> Result<Snapshot, StorageError> {
    let bytes = tokio::fs::read(path.as_ref()).await?;
    let snapshot = serde_json::from_slice(&bytes)?;
    info!(path = %path.as_ref().display(), "snapshot loaded");
    Ok(snapshot)
}

/// Write the container's current state to disk.
pub async fn save_snapshot(
    path: impl AsRef<Path>,
    container: &Container,
) -> Result<(), StorageError> {
    let bytes = serde_json::to_vec_pretty(&Snapshot::of(container))?;
    tokio::fs::write(path.as_ref(), bytes).await?;
    info!(path = %path.as_ref().display(), "snapshot saved");
    Ok(())
}
