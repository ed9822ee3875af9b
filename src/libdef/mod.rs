//! Library definitions: discovery, validation and matching
//!
//! A library definition ("libdef") is a type-declaration file for one package
//! version range, written for one checker version range. This module finds
//! them in a definitions tree and answers queries against them.
//!
//! # Modules
//!
//! - [`scanner`]: Walks a `definitions/npm` tree and produces [`LibDef`]s
//! - [`validation`]: Sink collecting naming problems found while scanning
//! - [`filter`]: Query matching and ordering
//! - [`error`]: Error types for scanning and matching

pub mod error;
pub mod filter;
pub mod scanner;
pub mod validation;

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::Error;
use crate::mirror::metadata::{assert_compatibility, tool_version};
use crate::version::checker::CheckerVersion;

pub use error::{MatchError, ScanError};
pub use filter::{LibDefFilter, filter_libdefs, libdef_matches_package_version};
pub use scanner::{Scanner, scan_definitions};
pub use validation::ValidationErrors;

/// Relative location of the npm definitions inside a definitions repository
pub const DEFINITIONS_DIR: &str = "definitions/npm";

/// A single definition file found in a definitions tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibDef {
    /// Package name, `@scope/name` for scoped packages
    pub pkg_name: String,
    /// Declared package version, e.g. `1.2.x`
    pub pkg_version_str: String,
    pub checker_version: CheckerVersion,
    /// Checker version directory name, e.g. `v0.25.x-`
    pub checker_version_str: String,
    pub path: PathBuf,
    /// Test files from the package directory and the checker version directory
    pub test_file_paths: Vec<PathBuf>,
}

/// Scan the definitions of a local repository checkout
///
/// The repository's compatibility metadata is checked before scanning.
pub async fn local_libdefs(
    repo_root: &Path,
    errors: Option<&ValidationErrors>,
) -> Result<Vec<LibDef>, Error> {
    let defs_root = repo_root.join(DEFINITIONS_DIR);
    info!("Reading local definitions from {:?}", defs_root);

    assert_compatibility(&defs_root, &tool_version()).await?;
    Ok(scan_definitions(&defs_root, errors).await?)
}
