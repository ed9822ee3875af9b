//! Resolve versioned library definitions from a definitions repository
//!
//! # Modules
//!
//! - [`version`]: Package and checker version model
//! - [`libdef`]: Definitions tree scanning, validation and matching
//! - [`mirror`]: Local mirror of the remote definitions repository
//! - [`config`]: Configuration and constants
//! - [`error`]: Top-level error type

pub mod config;
pub mod error;
pub mod libdef;
pub mod mirror;
pub mod version;

pub use error::Error;
