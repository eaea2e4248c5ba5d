//! Authorization Gate
//!
//! Token issuance and validation live outside this crate; the server only
//! asks a [`TokenDecoder`] "is this token valid, and what roles does it
//! carry". Role-gated nodes (a type-level marker or a node-level
//! `requiredRole` field) are checked right before every push, and an
//! unauthorized push is suppressed for that single node.

use std::collections::HashMap;

use crate::models::{Node, NodeTypeRegistry};

/// The identity a valid token decodes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject: String,
    pub roles: Vec<String>,
}

impl Principal {
    pub fn new(subject: impl Into<String>, roles: impl IntoIterator<Item = String>) -> Self {
        Principal {
            subject: subject.into(),
            roles: roles.into_iter().collect(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// The token oracle consumed by the connection layer.
pub trait TokenDecoder: Send + Sync {
    /// `None` for an invalid, expired or unknown token.
    fn validate_and_decode(&self, token: &str) -> Option<Principal>;
}

/// A fixed token table. The default decoder for development and tests;
/// production hosts plug in their own JWT-backed implementation.
#[derive(Debug, Default)]
pub struct StaticTokenDecoder {
    tokens: HashMap<String, Principal>,
}

impl StaticTokenDecoder {
    /// A decoder that rejects every token.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, principal: Principal) -> Self {
        self.tokens.insert(token.into(), principal);
        self
    }
}

impl TokenDecoder for StaticTokenDecoder {
    fn validate_and_decode(&self, token: &str) -> Option<Principal> {
        self.tokens.get(token).cloned()
    }
}

/// Whether the current session may receive `node`.
///
/// Nodes without a role requirement always pass.
pub fn push_allowed(
    node: &Node,
    registry: &NodeTypeRegistry,
    token: Option<&str>,
    decoder: &dyn TokenDecoder,
) -> bool {
    let Some(required) = node.required_role(registry.spec(&node.node_type)) else {
        return true;
    };
    token
        .and_then(|t| decoder.validate_and_decode(t))
        .map(|principal| principal.has_role(required))
        .unwrap_or(false)
}
