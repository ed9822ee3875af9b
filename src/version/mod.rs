//! Version model for definitions
//!
//! Definitions are versioned along two axes: the version of the package they
//! describe and the version of the type checker they are written for.
//!
//! ```text
//! ┌──────────────────┐   to_package_version   ┌──────────────────┐
//! │  CheckerVersion  │───────────────────────▶│  PackageVersion  │
//! │ (all/specific/   │                        │ (triple + range) │
//! │  ranged)         │                        └────────┬─────────┘
//! └──────────────────┘                                 │ to_version_req
//!                                                      ▼
//!                                             ┌──────────────────┐
//!                                             │ semver::VersionReq│
//!                                             └──────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`package`]: Package versions with wildcard parts and range chaining
//! - [`checker`]: Checker versions, directory-name encoding, disjointness
//! - [`semver`]: npm range translation and interval arithmetic
//! - [`error`]: Error types for version parsing and conversion

pub mod checker;
pub mod error;
pub mod package;
pub mod semver;

pub use checker::{CheckerVersion, VersionTriple, disjoint_versions_all};
pub use error::{RangeError, VersionError};
pub use package::{PackageVersion, RangeOp, VersionPart, version_to_string};
