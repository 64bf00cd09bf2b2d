//! # Configuration
//!
//! Optional TOML settings for `hkg`. Every key may be omitted; command-line
//! flags take precedence over file values.
//!
//! ```toml
//! store = "graph.json"
//! preserved = ["Person", "knows"]
//! pretty = true
//! log_filter = "hkg=debug,hyperknowledge_core=debug"
//! ```

use hyperknowledge_core::HkError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "hkg.toml";

/// Snapshot file used when neither the config nor `--store` names one.
pub const DEFAULT_STORE_FILE: &str = "hkg.json";

/// Filter installed when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "hkg=info,hyperknowledge_core=warn";

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HkgConfig {
    /// Snapshot file holding the store.
    pub store: PathBuf,
    /// Ids the builder must never auto-create.
    pub preserved: Vec<String>,
    /// Write snapshots indented.
    pub pretty: bool,
    /// `tracing` filter directive.
    pub log_filter: String,
}

impl Default for HkgConfig {
    fn default() -> Self {
        Self {
            store: PathBuf::from(DEFAULT_STORE_FILE),
            preserved: Vec::new(),
            pretty: true,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl HkgConfig {
    /// Parse a config from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, HkError> {
        toml::from_str(text).map_err(|e| HkError::ConfigError(e.to_string()))
    }

    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self, HkError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            HkError::ConfigError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(HkError::ConfigError(format!(
                "Config '{}' is {} bytes, maximum is {}",
                path.display(),
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let text = std::fs::read_to_string(path)
            .map_err(|e| HkError::IoError(format!("Cannot read '{}': {}", path.display(), e)))?;
        Self::from_toml(&text)
    }

    /// Load `explicit` if given, else `hkg.toml` when present, else defaults.
    ///
    /// An explicit path that does not exist is an error.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, HkError> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::load(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Store path after applying a command-line override.
    pub fn store_path(&self, flag: Option<&Path>) -> PathBuf {
        flag.map_or_else(|| self.store.clone(), Path::to_path_buf)
    }
}
