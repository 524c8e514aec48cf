//! lifebroker configuration types and loading

use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::broker::BrokerConfig;
use crate::controller::ControllerConfig;
use crate::rpc::RpcConfig;

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Timeouts, retries and frame limits shared by every client and server
    pub rpc: RpcConfig,

    pub worker: WorkerConfig,

    pub broker: BrokerConfig,

    pub controller: ControllerConfig,

    /// Default tracing level, overridden by `--log-level`
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

/// Worker node configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Address the worker listens on
    pub listen: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8030".to_string(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    ///
    /// Explicit path, then `./.lifebroker.yml`, then
    /// `<config dir>/lifebroker/lifebroker.yml`, then defaults.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let local_config = PathBuf::from(".lifebroker.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => warn!("Failed to load config from {}: {}", local_config.display(), e),
            }
        }

        if let Some(user_config) = user_config_path()
            && user_config.exists()
        {
            match Self::load_from_file(&user_config) {
                Ok(config) => return Ok(config),
                Err(e) => warn!("Failed to load config from {}: {}", user_config.display(), e),
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only `log-level` from the file `load` would pick
    ///
    /// Runs before logging is set up, so it stays quiet: any problem with
    /// the file is left for `load` to report.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        #[derive(Deserialize)]
        struct LogLevelOnly {
            #[serde(rename = "log-level")]
            log_level: Option<String>,
        }

        let path = match config_path {
            Some(path) => path.clone(),
            None => [Some(PathBuf::from(".lifebroker.yml")), user_config_path()]
                .into_iter()
                .flatten()
                .find(|path| path.exists())?,
        };
        let content = fs::read_to_string(path).ok()?;
        serde_yaml::from_str::<LogLevelOnly>(&content).ok()?.log_level
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("lifebroker").join("lifebroker.yml"))
}

/// Resolve the tracing level: CLI flag, then config file, then `info`
pub fn resolve_log_level(cli_level: Option<&str>, config_level: Option<&str>) -> String {
    cli_level.or(config_level).unwrap_or("info").to_string()
}
