//! Shared test utilities

#![allow(dead_code)]

pub mod fixture;
pub mod vcs;

pub use fixture::{DefinitionsTree, write_timestamp};
pub use vcs::CountingVcs;
