use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Time-related constants
// =============================================================================

/// Default age after which the mirror is rebased, in milliseconds (1 minute)
pub const DEFAULT_EXPIRY_MS: i64 = 60 * 1000;

/// Window in which repeated mirror checks reuse the previous one, in milliseconds (5 minutes)
pub const DEBOUNCE_WINDOW_MS: i64 = 5 * 60 * 1000;

// =============================================================================
// Mirror constants
// =============================================================================

/// Definitions repository cloned into the mirror
pub const REMOTE_REPO_URL: &str = "https://github.com/flow-typed/flow-typed.git";

/// Environment variable overriding the cache directory
pub const CACHE_DIR_ENV: &str = "LIBDEF_CACHE_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub mirror: MirrorConfig,
}

impl Config {
    /// Load configuration from a JSON file; missing fields use defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `path` when given, otherwise use defaults
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}

/// Mirror-related configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct MirrorConfig {
    /// Cache directory; [`cache_dir`] when unset
    pub cache_dir: Option<PathBuf>,
    pub remote_url: String,
    /// Mirror expiry in milliseconds
    pub expiry: i64,
    /// Debounce window in milliseconds
    pub debounce_window: i64,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            remote_url: REMOTE_REPO_URL.to_string(),
            expiry: DEFAULT_EXPIRY_MS,
            debounce_window: DEBOUNCE_WINDOW_MS,
        }
    }
}

impl MirrorConfig {
    pub fn cache_root(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(cache_dir)
    }

    pub fn expiry(&self) -> Duration {
        millis(self.expiry)
    }

    pub fn debounce_window(&self) -> Duration {
        millis(self.debounce_window)
    }
}

/// Negative values count as zero
fn millis(ms: i64) -> Duration {
    Duration::from_millis(ms.max(0) as u64)
}

/// Returns the path to the cache directory for libdef-resolver.
/// Uses $LIBDEF_CACHE_DIR if set,
/// otherwise falls back to ~/.libdef-resolver,
/// or ./.libdef-resolver if no home directory is available.
pub fn cache_dir() -> PathBuf {
    cache_dir_with_env(std::env::var(CACHE_DIR_ENV).ok(), dirs::home_dir())
}

fn cache_dir_with_env(cache_dir_env: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = cache_dir_env.filter(|dir| !dir.is_empty()) {
        return PathBuf::from(dir);
    }

    home_dir
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".libdef-resolver")
}
