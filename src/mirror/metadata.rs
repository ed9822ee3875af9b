//! Definitions repository metadata and the tool compatibility gate

use std::path::{Path, PathBuf};
use std::sync::Arc;

use semver::Version;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::libdef::scanner::METADATA_FILE_NAME;
use crate::version::error::RangeError;
use crate::version::semver::parse_range;

#[derive(Debug, Clone, Error)]
pub enum CompatError {
    #[error(
        "Unable to find the 'compatibleCLIRange' property in {0:?}. \
         You might need to update to a newer version of libdef"
    )]
    MissingRange(PathBuf),

    #[error(
        "Please upgrade libdef! This is version {tool_version}, but the definitions \
         are only compatible with versions {range}"
    )]
    Incompatible { tool_version: Version, range: String },

    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("Invalid metadata in {path:?}: {reason}")]
    Metadata { path: PathBuf, reason: String },

    #[error(transparent)]
    InvalidRange(#[from] RangeError),
}

/// Contents of `.cli-metadata.json`
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct CliMetadata {
    #[serde(rename = "compatibleCLIRange")]
    pub compatible_cli_range: Option<String>,
}

/// Version of this tool as checked against `compatibleCLIRange`
pub fn tool_version() -> Version {
    Version::parse(env!("CARGO_PKG_VERSION")).unwrap_or_else(|_| Version::new(0, 0, 0))
}

pub async fn read_metadata(defs_root: &Path) -> Result<CliMetadata, CompatError> {
    let path = defs_root.join(METADATA_FILE_NAME);
    let raw = tokio::fs::read_to_string(&path)
        .await
        .map_err(|source| CompatError::Io {
            path: path.clone(),
            source: Arc::new(source),
        })?;

    serde_json::from_str(&raw).map_err(|e| CompatError::Metadata {
        path,
        reason: e.to_string(),
    })
}

/// Fail unless `tool_version` satisfies the repository's `compatibleCLIRange`
pub async fn assert_compatibility(defs_root: &Path, tool_version: &Version) -> Result<(), CompatError> {
    let metadata = read_metadata(defs_root).await?;

    let range = metadata
        .compatible_cli_range
        .filter(|range| !range.trim().is_empty())
        .ok_or_else(|| CompatError::MissingRange(defs_root.join(METADATA_FILE_NAME)))?;

    if !parse_range(&range)?.matches(tool_version) {
        return Err(CompatError::Incompatible {
            tool_version: tool_version.clone(),
            range,
        });
    }

    debug!("Tool version {} satisfies '{}'", tool_version, range);
    Ok(())
}
