use std::path::PathBuf;

use thiserror::Error;

use crate::version::error::{RangeError, VersionError};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {message}")]
    Invalid { context: String, message: String },
}

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Invalid libdef version '{0}': it appears to be a non-contiguous range")]
    NonContiguousRange(String),

    #[error("'{0}' is an unexpected filter type! This should never happen!")]
    UnknownFilter(String),

    #[error("Expected '<name>@<version>' but got '{0}'")]
    MissingVersion(String),

    #[error(transparent)]
    Range(#[from] RangeError),

    #[error(transparent)]
    Version(#[from] VersionError),
}
