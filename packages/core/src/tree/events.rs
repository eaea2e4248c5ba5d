//! Tree Change Events
//!
//! Every container mutation broadcasts a [`ChangeEvent`] over a tokio
//! broadcast channel. Each connection holds its own receiver and reacts on
//! its own task, so serialization work never runs re-entrantly on the
//! mutator's call stack.
//!
//! The channel is bounded: a subscriber that falls far enough behind loses
//! the oldest events (`RecvError::Lagged`) rather than stalling writers.

use serde::{Deserialize, Serialize};

/// Capacity of the per-container broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A description of one container mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ChangeEvent {
    /// A scalar field changed on some node.
    ValueChanged { node_id: String },

    /// The children of some node changed (add, remove, move).
    ChildrenChanged { parent_id: String },
}

impl ChangeEvent {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::ValueChanged { .. } => "value-changed",
            ChangeEvent::ChildrenChanged { .. } => "children-changed",
        }
    }
}
