//! Protocol Error Types

use thiserror::Error;

/// Errors raised while decoding an inbound frame.
///
/// A parse error is fatal to that single receive, never to the connection.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frames of a single character carry no data to act on.
    #[error("request '{frame}' too short")]
    MalformedRequest { frame: String },
}

impl ProtocolError {
    pub fn malformed(frame: impl Into<String>) -> Self {
        ProtocolError::MalformedRequest {
            frame: frame.into(),
        }
    }
}
