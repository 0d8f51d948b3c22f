//! Runtime configuration
//!
//! TOML-backed selection of the point source and its parameters.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Point source selection
    pub source: SourceConfig,
}

/// Point source selection and parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Source kind: "file" or "lidar"
    pub kind: String,
    /// Point log path (file sources)
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Replay speed factor, 0.0 = as fast as possible (file sources)
    #[serde(default)]
    pub speed: f32,
    /// Broadcast code of the unit to claim (lidar sources)
    #[serde(default)]
    pub broadcast_code: Option<String>,
    /// Transport backend (lidar sources)
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Discovery plus handshake deadline in milliseconds (lidar sources)
    #[serde(default = "default_init_timeout_ms")]
    pub init_timeout_ms: u64,
    /// Sampling acknowledgement deadline in milliseconds (lidar sources)
    #[serde(default = "default_ack_timeout_ms")]
    pub ack_timeout_ms: u64,
}

fn default_backend() -> String {
    "mock".to_string()
}

fn default_init_timeout_ms() -> u64 {
    10_000
}

fn default_ack_timeout_ms() -> u64 {
    2_000
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Write configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Defaults for replaying a recorded point log
    pub fn file_defaults(path: impl Into<PathBuf>) -> Self {
        Self {
            source: SourceConfig {
                kind: "file".to_string(),
                path: Some(path.into()),
                speed: 0.0,
                broadcast_code: None,
                backend: default_backend(),
                init_timeout_ms: default_init_timeout_ms(),
                ack_timeout_ms: default_ack_timeout_ms(),
            },
        }
    }

    /// Defaults for a live device claimed by `broadcast_code`
    pub fn lidar_defaults(broadcast_code: &str) -> Self {
        Self {
            source: SourceConfig {
                kind: "lidar".to_string(),
                path: None,
                speed: 0.0,
                broadcast_code: Some(broadcast_code.to_string()),
                backend: default_backend(),
                init_timeout_ms: default_init_timeout_ms(),
                ack_timeout_ms: default_ack_timeout_ms(),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::file_defaults("capture.plog")
    }
}
