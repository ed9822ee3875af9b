//! Vcs double counting the operations it performs

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use libdef_resolver::libdef::DEFINITIONS_DIR;
use libdef_resolver::libdef::scanner::METADATA_FILE_NAME;
use libdef_resolver::mirror::{Vcs, VcsError};

use super::fixture::{COMPATIBLE_METADATA, write_files};

#[derive(Default)]
struct Counters {
    clones: AtomicUsize,
    rebases: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fail_rebase: AtomicBool,
}

/// Clones lay out a fixed definitions tree; every operation is counted
#[derive(Clone)]
pub struct CountingVcs {
    files: Vec<String>,
    op_delay: Duration,
    counters: Arc<Counters>,
}

impl CountingVcs {
    pub fn new(files: &[&str]) -> Self {
        Self {
            files: files.iter().map(|f| f.to_string()).collect(),
            op_delay: Duration::ZERO,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Make every operation take `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.op_delay = delay;
        self
    }

    pub fn fail_rebases(&self, fail: bool) {
        self.counters.fail_rebase.store(fail, Ordering::SeqCst);
    }

    pub fn clones(&self) -> usize {
        self.counters.clones.load(Ordering::SeqCst)
    }

    pub fn rebases(&self) -> usize {
        self.counters.rebases.load(Ordering::SeqCst)
    }

    pub fn operations(&self) -> usize {
        self.clones() + self.rebases()
    }

    /// Most operations ever running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.counters.max_in_flight.load(Ordering::SeqCst)
    }

    async fn track<T>(&self, op: impl FnOnce() -> T) -> T {
        let running = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if !self.op_delay.is_zero() {
            tokio::time::sleep(self.op_delay).await;
        }
        let result = op();
        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl Vcs for CountingVcs {
    async fn clone_into(&self, _remote: &str, dest: &Path) -> Result<(), VcsError> {
        self.counters.clones.fetch_add(1, Ordering::SeqCst);
        self.track(|| {
            let defs_dir = dest.join(DEFINITIONS_DIR);
            fs::create_dir_all(dest.join(".git")).unwrap();
            fs::create_dir_all(&defs_dir).unwrap();
            fs::write(defs_dir.join(METADATA_FILE_NAME), COMPATIBLE_METADATA).unwrap();
            let files: Vec<&str> = self.files.iter().map(String::as_str).collect();
            write_files(&defs_dir, &files);
        })
        .await;
        Ok(())
    }

    async fn rebase_to_upstream(&self, _repo: &Path) -> Result<(), VcsError> {
        self.counters.rebases.fetch_add(1, Ordering::SeqCst);
        let fail = self.counters.fail_rebase.load(Ordering::SeqCst);
        self.track(|| {
            if fail {
                Err(VcsError::Failed {
                    command: "git pull --rebase".to_string(),
                    stderr: "could not resolve host".to_string(),
                })
            } else {
                Ok(())
            }
        })
        .await
    }

    async fn latest_commit_hash(&self, _repo: &Path, _rel_path: &Path) -> Result<String, VcsError> {
        Ok("abcdef0123456789abcdef0123456789abcdef01".to_string())
    }
}
