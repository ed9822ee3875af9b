//! Version control operations needed by the mirror

use std::path::Path;
use std::process::Stdio;

#[cfg(test)]
use mockall::automock;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Clone, Error)]
pub enum VcsError {
    #[error("Failed to run {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("`{command}` failed: {stderr}")]
    Failed { command: String, stderr: String },

    #[error("No commit found for {0}")]
    NoCommit(String),
}

/// Trait for driving a version-controlled checkout
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Vcs: Send + Sync {
    /// Clone `remote` into the existing, empty directory `dest`
    async fn clone_into(&self, remote: &str, dest: &Path) -> Result<(), VcsError>;

    /// Bring the checkout at `repo` up to date with its upstream by rebasing
    async fn rebase_to_upstream(&self, repo: &Path) -> Result<(), VcsError>;

    /// Full hash of the latest commit touching `rel_path` inside `repo`
    async fn latest_commit_hash(&self, repo: &Path, rel_path: &Path) -> Result<String, VcsError>;
}

/// [`Vcs`] backed by the `git` executable
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl GitCli {
    pub fn new() -> Self {
        Self {
            program: "git".to_string(),
        }
    }

    /// Use a specific git executable
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, cwd: &Path, args: &[&str]) -> Result<String, VcsError> {
        let command = format!("{} {}", self.program, args.join(" "));
        debug!("Running `{}` in {:?}", command, cwd);

        let output = Command::new(&self.program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| VcsError::Spawn {
                program: self.program.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(VcsError::Failed {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait::async_trait]
impl Vcs for GitCli {
    async fn clone_into(&self, remote: &str, dest: &Path) -> Result<(), VcsError> {
        let dest_str = dest.to_string_lossy();
        let parent = dest.parent().unwrap_or(dest);
        self.run(parent, &["clone", remote, &*dest_str]).await?;
        Ok(())
    }

    async fn rebase_to_upstream(&self, repo: &Path) -> Result<(), VcsError> {
        self.run(repo, &["pull", "--rebase"]).await?;
        Ok(())
    }

    async fn latest_commit_hash(&self, repo: &Path, rel_path: &Path) -> Result<String, VcsError> {
        let rel_str = rel_path.to_string_lossy();
        let stdout = self
            .run(repo, &["log", "-n", "1", "--pretty=format:%H", "--", &*rel_str])
            .await?;

        let hash = stdout.trim();
        if hash.is_empty() {
            return Err(VcsError::NoCommit(rel_str.into_owned()));
        }
        Ok(hash.to_string())
    }
}
