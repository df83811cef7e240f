//! Configuration surface and session identity for the capture sink.
//!
//! These are plain value types; loading them from files, flags, or the
//! environment is the embedding proxy's concern. [`SessionId`] is produced
//! once at process start and threaded explicitly into the sink factory —
//! there is no ambient global.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Proxy-assigned identifier of one inbound request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct RequestId(pub u64);

impl RequestId {
    /// Raw value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Process-wide capture session identity, assigned once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap an externally supplied session string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random session identity.
    #[must_use]
    pub fn generate() -> Self {
        let hi: u64 = rand::random();
        let lo: u64 = rand::random();
        Self(format!("{hi:016x}{lo:016x}"))
    }

    /// String form of the identity.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Static configuration consumed by the sink factory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Datastore host.
    pub store_host: String,
    /// Datastore port.
    pub store_port: u16,
    /// Database (collection namespace) to write capture documents into.
    pub database: String,
    /// Whether shadow traffic is duplicated, and therefore expected.
    pub shadowing: bool,
    /// Persistence worker pool size.
    pub pool_size: usize,
    /// Bound on the persistence queue; enqueue blocks when saturated.
    pub queue_depth: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            store_host: "127.0.0.1".to_owned(),
            store_port: 27017,
            database: "capture".to_owned(),
            shadowing: false,
            pool_size: 2,
            queue_depth: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_session_ids_are_distinct() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn default_config_disables_shadowing() {
        let config = CaptureConfig::default();
        assert!(!config.shadowing);
        assert!(config.pool_size >= 1);
    }
}
