//! Pass settings.
//!
//! Every key has a default, so an empty file (or no file at all) gives a
//! usable configuration:
//!
//! ```toml
//! parallel = true
//! worker_threads = 0           # 0 lets rayon pick
//! coincident_node_allowance = 0.001
//! keywords = ["NODE", "EL"]    # empty means every registered type
//! stream_id = "stream-a"
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Decode independent keyword batches on a worker pool.
    #[serde(default = "default_parallel")]
    pub parallel: bool,

    /// Worker pool size; `0` uses rayon's global pool.
    #[serde(default)]
    pub worker_threads: usize,

    /// Distance under which two points resolve to the same node.
    #[serde(default = "default_coincident_node_allowance")]
    pub coincident_node_allowance: f64,

    /// Keywords fetched at pass start.
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Stream tag written into outgoing records.
    #[serde(default)]
    pub stream_id: Option<String>,
}

fn default_parallel() -> bool {
    true
}

fn default_coincident_node_allowance() -> f64 {
    0.001
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
            worker_threads: 0,
            coincident_node_allowance: default_coincident_node_allowance(),
            keywords: Vec::new(),
            stream_id: None,
        }
    }
}

impl SyncSettings {
    /// Single-threaded decoding with otherwise default settings.
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Default::default()
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_toml_str(&raw)?;
        info!(path = %path.display(), parallel = settings.parallel, "loaded sync settings");
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.coincident_node_allowance.is_finite() || self.coincident_node_allowance < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "coincident_node_allowance must be a non-negative number, got {}",
                self.coincident_node_allowance
            )));
        }
        Ok(())
    }
}
