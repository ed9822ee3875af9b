use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("Ranged checker version has neither a lower nor an upper bound")]
    EmptyRange,

    #[error("Malformed version '{0}'")]
    Malformed(String),

    #[error("Malformed checker version directory name '{name}': {reason}")]
    MalformedDirName { name: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("Invalid version range '{range}': {reason}")]
    Invalid { range: String, reason: String },

    #[error("Version range '{0}' is not a single contiguous interval")]
    NonContiguous(String),
}
