//! `load_config` module: reads the YAML project file and resolves the doc cloud endpoint.
//!
//! The `project` section maps one-to-one onto [`PublishConfig`]; the `publish` section
//! holds host-side settings (endpoint, scratch directory, upload timeout).
//!
//! # Endpoint resolution
//! `DOC_CLOUD_ENDPOINT` in the environment (or a `.env` file loaded by `main`) wins over
//! `publish.endpoint` in the file. The CLI `--endpoint` flag wins over both.
//!
//! # Errors
//! All errors use `anyhow::Error` and surface at the CLI boundary.

use anyhow::{anyhow, Result};
use book_publish_core::config::PublishConfig;
use book_publish_core::uploader::DEFAULT_UPLOAD_TIMEOUT;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

pub const ENDPOINT_ENV: &str = "DOC_CLOUD_ENDPOINT";

const DEFAULT_STORAGE_DIR: &str = ".publish";

#[derive(Debug, Deserialize)]
pub struct CliConfig {
    pub project: PublishConfig,
    #[serde(default)]
    pub publish: PublishSection,
}

#[derive(Debug, Deserialize)]
pub struct PublishSection {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PublishSection {
    fn default() -> Self {
        Self {
            endpoint: None,
            storage_dir: default_storage_dir(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from(DEFAULT_STORAGE_DIR)
}

fn default_timeout_secs() -> u64 {
    DEFAULT_UPLOAD_TIMEOUT.as_secs()
}

impl CliConfig {
    pub fn endpoint(&self) -> Result<&str> {
        self.publish.endpoint.as_deref().ok_or_else(|| {
            error!("No doc cloud endpoint configured");
            anyhow!("No doc cloud endpoint configured: set publish.endpoint or {ENDPOINT_ENV}")
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.publish.timeout_secs)
    }
}

/// Loads the YAML config at `path` and applies the endpoint environment override.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow!("Failed to read config file {:?}: {}", path_ref, e));
        }
    };

    let mut config: CliConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
        if !endpoint.trim().is_empty() {
            info!(endpoint = %endpoint, "{ENDPOINT_ENV} overrides configured endpoint");
            config.publish.endpoint = Some(endpoint);
        }
    }

    Ok(config)
}
