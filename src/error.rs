use thiserror::Error;

use crate::config::ConfigError;
use crate::libdef::error::{MatchError, ScanError};
use crate::mirror::cache::MirrorError;
use crate::mirror::metadata::CompatError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Compat(#[from] CompatError),

    #[error(transparent)]
    Mirror(#[from] MirrorError),
}
