//! Client configuration file.
//!
//! ```toml
//! [settings]
//! model = "sonnet"
//! permission_mode = "accept_edits"
//!
//! [capabilities]
//! models = ["sonnet", "opus"]
//! thinking = false
//!
//! [logging]
//! filter = "parley=debug"
//! file = "/tmp/parley.log"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::settings::{Capabilities, ChatSettings};
use crate::domain::state::SessionState;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub settings: ChatSettings,
    pub capabilities: Capabilities,
    pub logging: LoggingConfig,
}

impl ClientConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// `<config dir>/parley/client.toml` for the current platform.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "parley").map(|d| d.config_dir().join("client.toml"))
    }

    /// Load from [`ClientConfig::default_path`], falling back to defaults
    /// when there is no file.
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                tracing::debug!(target: "parley.config", "No client config found; using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Fresh session state seeded with these settings and capabilities.
    pub fn initial_state(&self) -> SessionState {
        SessionState::with_config(self.settings.clone(), self.capabilities.clone())
    }
}
