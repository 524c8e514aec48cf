//! Broker configuration

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// What a turn does when a band cannot be computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Any failed band fails the whole turn
    #[default]
    FailFast,
    /// Failed bands keep their input rows and the turn succeeds
    BestEffort,
    /// Re-dispatch a failed band to the next workers, up to `attempts` more times
    Retry { attempts: u32 },
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailFast => write!(f, "fail-fast"),
            Self::BestEffort => write!(f, "best-effort"),
            Self::Retry { attempts } => write!(f, "retry:{}", attempts),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    /// Accepts `fail-fast`, `best-effort` or `retry:N`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail-fast" => Ok(Self::FailFast),
            "best-effort" => Ok(Self::BestEffort),
            other => {
                let attempts = other
                    .strip_prefix("retry:")
                    .ok_or_else(|| format!("unknown failure policy '{}'", other))?;
                let attempts = attempts
                    .parse()
                    .map_err(|_| format!("invalid retry count '{}'", attempts))?;
                Ok(Self::Retry { attempts })
            }
        }
    }
}

/// Broker node configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Address the broker listens on
    pub listen: String,

    /// Worker addresses registered at start-up, in band order
    pub workers: Vec<String>,

    /// Band failure handling
    #[serde(rename = "failure-policy")]
    pub failure_policy: FailurePolicy,

    /// Forward a `Shutdown` request to every registered worker
    #[serde(rename = "forward-shutdown")]
    pub forward_shutdown: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        debug!("BrokerConfig::default: called");
        Self {
            listen: "127.0.0.1:8080".to_string(),
            workers: Vec::new(),
            failure_policy: FailurePolicy::default(),
            forward_shutdown: true,
        }
    }
}
