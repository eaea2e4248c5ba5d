//! Wire Protocol
//!
//! - [`request`] - Frame grammar and the typed [`Request`](request::Request)
//! - [`dispatch`] - Applies a request to the container
//! - [`error`] - Protocol error types

pub mod dispatch;
pub mod error;
pub mod request;

pub use dispatch::dispatch;
pub use error::ProtocolError;
pub use request::{Request, RequestKind};
