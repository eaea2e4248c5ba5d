//! Streaming Encoder
//!
//! Serializes a node (and its bounded children/relations) straight to a byte
//! buffer on every mutation: one forward pass, no intermediate document.
//! See [`node_writer`] for the traversal and [`notation`] for the wire
//! vocabulary, including the non-standard `1`/`0` booleans.

pub mod node_writer;
pub mod notation;

pub use node_writer::NodeWriter;

use crate::models::{Node, NodeTypeRegistry};
use crate::tree::Container;

/// Encode `node` to its wire bytes.
///
/// `None` encodes to `{}` exactly. `fetch_relations` toggles relation
/// expansion for the top-level node; deeper levels follow the writer's own
/// level-based cutoff.
pub fn to_bytes(
    container: &Container,
    registry: &NodeTypeRegistry,
    node: Option<&Node>,
    fetch_relations: bool,
) -> Vec<u8> {
    let mut writer = NodeWriter::new(container, registry);
    writer.write_node(node, fetch_relations);
    writer.into_bytes()
}
