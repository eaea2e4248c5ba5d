//! Server Configuration
//!
//! Read from the environment with sensible defaults:
//!
//! - `ARBOR_ADDR` - bind address, default `127.0.0.1:4600`
//! - `ARBOR_SNAPSHOT` - snapshot file path, default `arbor.json`
//! - `ARBOR_ADMIN_TOKEN` - when set, that token decodes to an `admin`
//!   principal (development convenience; production hosts supply their own
//!   [`TokenDecoder`](crate::server::auth::TokenDecoder))

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub snapshot_path: PathBuf,
    pub admin_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: "127.0.0.1:4600".to_string(),
            snapshot_path: PathBuf::from("arbor.json"),
            admin_token: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        ServerConfig {
            bind_addr: std::env::var("ARBOR_ADDR").unwrap_or(defaults.bind_addr),
            snapshot_path: std::env::var("ARBOR_SNAPSHOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.snapshot_path),
            admin_token: std::env::var("ARBOR_ADMIN_TOKEN").ok().filter(|t| !t.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_local() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:4600");
        assert_eq!(config.snapshot_path, PathBuf::from("arbor.json"));
        assert!(config.admin_token.is_none());
    }
}
