//! Local mirror of the remote definitions repository
//!
//! # Modules
//!
//! - [`cache`]: Debounced clone/rebase of the checkout and queries against it
//! - [`metadata`]: Repository metadata and the tool compatibility gate
//! - [`vcs`]: Version control trait and its `git` implementation

pub mod cache;
pub mod metadata;
pub mod vcs;

pub use cache::{MirrorCache, MirrorError, MirrorStatus};
pub use metadata::{CompatError, assert_compatibility, tool_version};
pub use vcs::{GitCli, Vcs, VcsError};
