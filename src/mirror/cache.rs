use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use semver::Version;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::MirrorConfig;
use crate::error::Error;
use crate::libdef::validation::ValidationErrors;
use crate::libdef::{DEFINITIONS_DIR, LibDef, scan_definitions};
use crate::mirror::metadata::{assert_compatibility, tool_version};
use crate::mirror::vcs::{Vcs, VcsError};

/// Checkout directory inside the cache root
const REPO_DIR_NAME: &str = "repo";

/// Timestamp file inside the cache root
const LAST_UPDATED_FILE_NAME: &str = "lastUpdated";

/// Length of the commit hash prefix in revision labels
const REVISION_HASH_LEN: usize = 10;

#[derive(Debug, Clone, thiserror::Error)]
pub enum MirrorError {
    #[error("Unable to clone the local mirror: {0}")]
    Clone(#[source] VcsError),

    #[error("Failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error(transparent)]
    Vcs(#[from] VcsError),
}

/// Outcome of a mirror check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorStatus {
    /// Checkout present and recently updated
    Fresh,
    /// Checkout was missing and has been cloned
    Cloned,
    /// Checkout was stale and has been rebased
    Rebased,
    /// Checkout was stale and the rebase failed; the old checkout is kept
    RebaseFailed(String),
}

type PendingRefresh = Shared<BoxFuture<'static, Result<MirrorStatus, MirrorError>>>;

struct MirrorState {
    last_assured_at: Option<Instant>,
    /// Most recently started refresh; later refreshes chain after it
    pending: PendingRefresh,
}

/// Paths and VCS shared with in-flight refreshes
struct MirrorRepo<V> {
    repo_dir: PathBuf,
    last_updated_file: PathBuf,
    remote_url: String,
    vcs: V,
}

/// Local mirror of the remote definitions repository
///
/// Layout under the cache root:
/// - `repo/`: the checkout
/// - `lastUpdated`: last successful clone or rebase, in milliseconds since the epoch
///
/// Checks are debounced: an [`ensure`](MirrorCache::ensure) within the
/// debounce window of the previous one returns that check's outcome. Refreshes
/// run one at a time, each starting after the previous one has settled.
pub struct MirrorCache<V: Vcs + 'static> {
    repo: Arc<MirrorRepo<V>>,
    expiry: Duration,
    debounce_window: Duration,
    tool_version: Version,
    state: Mutex<MirrorState>,
}

impl<V: Vcs + 'static> MirrorCache<V> {
    pub fn new(config: &MirrorConfig, vcs: V) -> Self {
        let cache_root = config.cache_root();
        info!("Using mirror cache at {:?}", cache_root);

        Self {
            repo: Arc::new(MirrorRepo {
                repo_dir: cache_root.join(REPO_DIR_NAME),
                last_updated_file: cache_root.join(LAST_UPDATED_FILE_NAME),
                remote_url: config.remote_url.clone(),
                vcs,
            }),
            expiry: config.expiry(),
            debounce_window: config.debounce_window(),
            tool_version: tool_version(),
            state: Mutex::new(MirrorState {
                last_assured_at: None,
                pending: futures::future::ready(Ok(MirrorStatus::Fresh))
                    .boxed()
                    .shared(),
            }),
        }
    }

    /// Check compatibility against `version` instead of this tool's version
    pub fn with_tool_version(mut self, version: Version) -> Self {
        self.tool_version = version;
        self
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo.repo_dir
    }

    /// `definitions/npm` inside the checkout
    pub fn defs_dir(&self) -> PathBuf {
        self.repo.repo_dir.join(DEFINITIONS_DIR)
    }

    fn lock_state(&self) -> MutexGuard<'_, MirrorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make sure the checkout exists and is no older than `expiry`
    pub async fn ensure(&self, expiry: Duration) -> Result<MirrorStatus, MirrorError> {
        let pending = {
            let mut state = self.lock_state();
            let now = Instant::now();
            let debounced = state
                .last_assured_at
                .is_some_and(|at| now.duration_since(at) <= self.debounce_window);

            if debounced {
                debug!("Mirror checked recently, reusing the previous check");
                state.pending.clone()
            } else {
                state.last_assured_at = Some(now);
                let previous = state.pending.clone();
                let repo = Arc::clone(&self.repo);
                let next = async move {
                    // Only ordering matters here; the previous outcome was
                    // already delivered to its own callers.
                    let _ = previous.await;
                    repo.refresh(expiry).await
                }
                .boxed()
                .shared();
                state.pending = next.clone();
                next
            }
        };

        pending.await
    }

    /// Rebase regardless of age (still debounced)
    pub async fn update(&self) -> Result<MirrorStatus, MirrorError> {
        self.ensure(Duration::ZERO).await
    }

    /// Ensure the mirror, check compatibility, then scan its definitions
    pub async fn libdefs(&self, errors: Option<&ValidationErrors>) -> Result<Vec<LibDef>, Error> {
        self.prepare().await?;
        Ok(scan_definitions(&self.defs_dir(), errors).await?)
    }

    /// Label identifying the revision of `libdef`
    ///
    /// Formatted as `<hash prefix>/<pkgName>_<pkgVersionStr>/checker_<checkerVersionStr>`.
    pub async fn revision_label(&self, libdef: &LibDef) -> Result<String, Error> {
        self.prepare().await?;

        let rel_path = libdef
            .path
            .strip_prefix(&self.repo.repo_dir)
            .unwrap_or(&libdef.path);
        let hash = self
            .repo
            .vcs
            .latest_commit_hash(&self.repo.repo_dir, rel_path)
            .await
            .map_err(MirrorError::from)?;

        let short_hash: String = hash.chars().take(REVISION_HASH_LEN).collect();
        Ok(format!(
            "{}/{}_{}/checker_{}",
            short_hash, libdef.pkg_name, libdef.pkg_version_str, libdef.checker_version_str
        ))
    }

    async fn prepare(&self) -> Result<(), Error> {
        let status = self.ensure(self.expiry).await?;
        debug!("Mirror status: {:?}", status);
        assert_compatibility(&self.defs_dir(), &self.tool_version).await?;
        Ok(())
    }
}

impl<V: Vcs> MirrorRepo<V> {
    async fn refresh(&self, expiry: Duration) -> Result<MirrorStatus, MirrorError> {
        if !self.is_present().await {
            info!("Local mirror not found, cloning {}", self.remote_url);
            self.clone_repo().await?;
            info!("Cloned local mirror into {:?}", self.repo_dir);
            return Ok(MirrorStatus::Cloned);
        }

        let last_updated = self.read_last_updated().await;
        let expiry_ms = i64::try_from(expiry.as_millis()).unwrap_or(i64::MAX);
        if last_updated.saturating_add(expiry_ms) >= now_ms() {
            debug!("Local mirror is fresh (last updated at {})", last_updated);
            return Ok(MirrorStatus::Fresh);
        }

        info!("Rebasing local mirror at {:?}", self.repo_dir);
        match self.vcs.rebase_to_upstream(&self.repo_dir).await {
            Ok(()) => {
                self.stamp().await?;
                Ok(MirrorStatus::Rebased)
            }
            Err(e) => {
                warn!(
                    "Unable to rebase the local mirror: {}. \
                     It will be updated the next time a connection is available.",
                    e
                );
                Ok(MirrorStatus::RebaseFailed(e.to_string()))
            }
        }
    }

    async fn is_present(&self) -> bool {
        let exists = |path: PathBuf| async move { tokio::fs::try_exists(path).await.unwrap_or(false) };
        exists(self.repo_dir.clone()).await && exists(self.repo_dir.join(".git")).await
    }

    async fn clone_repo(&self) -> Result<(), MirrorError> {
        tokio::fs::create_dir_all(&self.repo_dir)
            .await
            .map_err(|source| io_error(&self.repo_dir, source))?;
        self.vcs
            .clone_into(&self.remote_url, &self.repo_dir)
            .await
            .map_err(MirrorError::Clone)?;
        self.stamp().await
    }

    /// Last update time; anything but a plain decimal integer counts as never
    async fn read_last_updated(&self) -> i64 {
        let Ok(raw) = tokio::fs::read_to_string(&self.last_updated_file).await else {
            return 0;
        };
        parse_timestamp(&raw).unwrap_or(0)
    }

    async fn stamp(&self) -> Result<(), MirrorError> {
        tokio::fs::write(&self.last_updated_file, now_ms().to_string())
            .await
            .map_err(|source| io_error(&self.last_updated_file, source))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> MirrorError {
    MirrorError::Io {
        path: path.to_path_buf(),
        source: Arc::new(source),
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Parse a timestamp that must round-trip exactly through its decimal form
fn parse_timestamp(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|n| n.to_string() == raw)
}
