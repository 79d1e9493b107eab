//! TOML configuration.
//!
//! ```toml
//! [dataset]
//! base_name = "report"
//! rebuild_strategy = "swap"   # or "drop_recreate"
//!
//! [sqlite]
//! path = "shards.db"
//! busy_timeout_ms = 5000
//! ```

use std::path::{Path, PathBuf};

use mergeshard_core::DatasetDefinition;
use mergeshard_error::{Result, ShardError};
use mergeshard_types::RebuildStrategy;
use serde::{Deserialize, Serialize};

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShardConfig {
    #[serde(default)]
    pub dataset: DatasetSection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqlite: Option<SqliteSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetSection {
    /// A missing name is reported when the dataset is opened, not at parse
    /// time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_name: Option<String>,
    #[serde(default)]
    pub rebuild_strategy: RebuildStrategy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqliteSection {
    pub path: PathBuf,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

impl ShardConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text)
            .map_err(|e| ShardError::configuration(format!("invalid configuration: {e}")))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ShardError::configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self)
            .map_err(|e| ShardError::configuration(format!("cannot encode configuration: {e}")))
    }
}

impl DatasetDefinition for ShardConfig {
    fn default_template_base_name(&self) -> Option<String> {
        self.dataset.base_name.clone()
    }
}
