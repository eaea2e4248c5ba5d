//! Arbor Core
//!
//! The live document-tree synchronization engine: an in-memory node tree
//! with an auxiliary relation graph, a compact textual protocol for mutating
//! the tree over a persistent WebSocket, and a streaming encoder that
//! renders nodes straight to bytes on every mutation.
//!
//! # Modules
//!
//! - [`models`] - Nodes, typed field values, and the node type registry
//! - [`tree`] - The container (tree + relations) and its change events
//! - [`protocol`] - Frame parsing and request dispatch
//! - [`serializer`] - The streaming wire encoder
//! - [`server`] - WebSocket hosting and per-connection handling
//! - [`storage`] - Snapshot load/save
//! - [`config`] - Environment-driven server configuration

pub mod config;
pub mod models;
pub mod protocol;
pub mod serializer;
pub mod server;
pub mod storage;
pub mod tree;

// Re-export commonly used types
pub use config::ServerConfig;
pub use models::{FieldKind, FieldValue, Node, NodeTypeRegistry, NodeTypeSpec};
pub use protocol::{dispatch, ProtocolError, Request, RequestKind};
pub use tree::{ChangeEvent, Container, MoveSpec, Relation};
