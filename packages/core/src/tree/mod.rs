//! Tree Layer
//!
//! - [`container`] - The node tree, the relation set, and the mutation
//!   primitives
//! - [`events`] - Change events broadcast to every connection

pub mod container;
pub mod events;

pub use container::{Container, MoveSpec, Relation, TreeError};
pub use events::{ChangeEvent, EVENT_CHANNEL_CAPACITY};
