//! RPC transport configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeout, retry and framing limits applied to every remote call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Per-phase timeout (connect, write, read) in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Extra attempts after a transport failure
    pub retries: u32,

    /// Largest accepted frame in bytes
    #[serde(rename = "max-message-bytes")]
    pub max_message_bytes: usize,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            retries: 2,
            max_message_bytes: 256 * 1024 * 1024,
        }
    }
}

impl RpcConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RpcConfig::default();
        assert_eq!(config.timeout_ms, 30_000);
        assert_eq!(config.retries, 2);
        assert_eq!(config.max_message_bytes, 256 * 1024 * 1024);
    }

    #[test]
    fn test_timeout_duration() {
        let config = RpcConfig {
            timeout_ms: 1500,
            ..Default::default()
        };
        assert_eq!(config.timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: RpcConfig = serde_yaml::from_str("retries: 5").unwrap();
        assert_eq!(config.retries, 5);
        assert_eq!(config.timeout_ms, 30_000);
    }
}
