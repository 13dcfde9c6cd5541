//! Concurrent directory-tree search
//!
//! The coordinator spawns one task per directory. Each task acquires a
//! cancellable admission slot, lists its directory over a fresh session,
//! releases the slot, and then either reports a match or spawns tasks for the
//! subdirectories it found.
//!
//! ## Termination
//!
//! Tasks are tracked with a [`TaskTracker`]; the search completes when the
//! tracker drains. A match is stored in a [`OnceLock`], so only the first task
//! to find the file delivers a result. The same task fires the admission
//! controller's cancellation token, which withdraws every queued attempt and
//! makes later attempts fail without connecting. Listings already in flight
//! finish normally and their tasks exit without fanning out.
//!
//! ## Errors
//!
//! A transport failure ends the search of that subtree only. If no match is
//! found anywhere, the first recorded failure is returned in preference to
//! `NotFound`. A missing root directory is reported as `PathNotFound`.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, OnceLock};

use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use ftpseek_common::path::{join_remote_path, normalize_remote_path};
use ftpseek_common::{DirectoryEntry, RemoteEntry, ServerEndpoint};

use crate::admission::{Admission, AdmissionController};
use crate::error::RetrieveError;
use crate::session::OpenSession;
use crate::transport::{Transport, TransportError};

/// Find the entry named `filename` in one listing
///
/// Any kind of entry matches by name, including directories.
pub(crate) fn find_match<'a>(listing: &'a [RemoteEntry], filename: &str) -> Option<&'a RemoteEntry> {
    listing.iter().find(|entry| entry.name == filename)
}

/// Runs searches against one server, sharing one admission controller
///
/// A coordinator is meant to live for a single `get`/`get_meta` call: once a
/// search finds its file the controller stays cancelled.
pub struct SearchCoordinator {
    transport: Arc<dyn Transport>,
    endpoint: Arc<ServerEndpoint>,
    admission: Arc<AdmissionController>,
}

impl SearchCoordinator {
    pub fn new(
        transport: Arc<dyn Transport>,
        endpoint: Arc<ServerEndpoint>,
        admission: Arc<AdmissionController>,
    ) -> Self {
        Self {
            transport,
            endpoint,
            admission,
        }
    }

    /// Search `root` and everything beneath it for `filename`
    ///
    /// # Errors
    ///
    /// - `PathNotFound` if `root` does not exist
    /// - `Transport` with the first listing failure, if nothing matched
    /// - `NotFound` if the subtree was exhausted without a match
    pub async fn search(&self, root: &str, filename: &str) -> Result<DirectoryEntry, RetrieveError> {
        self.run(root, filename, None).await
    }

    /// Like [`search`](Self::search), with the root directory already listed
    ///
    /// `seed` is used as the root's listing instead of listing it again.
    pub async fn search_seeded(
        &self,
        root: &str,
        filename: &str,
        seed: Vec<RemoteEntry>,
    ) -> Result<DirectoryEntry, RetrieveError> {
        self.run(root, filename, Some(seed)).await
    }

    async fn run(
        &self,
        root: &str,
        filename: &str,
        seed: Option<Vec<RemoteEntry>>,
    ) -> Result<DirectoryEntry, RetrieveError> {
        let root = normalize_remote_path(root);
        let state = Arc::new(SearchState {
            filename: filename.to_string(),
            root: root.clone(),
            transport: Arc::clone(&self.transport),
            endpoint: Arc::clone(&self.endpoint),
            admission: Arc::clone(&self.admission),
            tracker: TaskTracker::new(),
            found: OnceLock::new(),
            root_missing: OnceLock::new(),
            first_error: Mutex::new(None),
        });

        debug!(root = %root, filename, "starting search");
        SearchState::spawn_directory(&state, root.clone(), seed);

        // Every task is spawned by a live task, so the tracker can only drain
        // once the whole fan-out has finished.
        state.tracker.close();
        state.tracker.wait().await;

        if let Some(entry) = state.found.get() {
            return Ok(entry.clone());
        }
        if let Some(path) = state.root_missing.get() {
            return Err(RetrieveError::PathNotFound(path.clone()));
        }
        if let Some(error) = state.take_first_error() {
            return Err(RetrieveError::Transport(error));
        }
        Err(RetrieveError::NotFound {
            filename: filename.to_string(),
            root,
        })
    }
}

/// State shared by every task of one search
struct SearchState {
    filename: String,
    root: String,
    transport: Arc<dyn Transport>,
    endpoint: Arc<ServerEndpoint>,
    admission: Arc<AdmissionController>,
    tracker: TaskTracker,
    /// The match; first setter wins
    found: OnceLock<DirectoryEntry>,
    /// Set when the root directory itself does not exist
    root_missing: OnceLock<String>,
    first_error: Mutex<Option<TransportError>>,
}

type SearchTask = Pin<Box<dyn Future<Output = ()> + Send>>;

impl SearchState {
    fn spawn_directory(state: &Arc<Self>, dir: String, seed: Option<Vec<RemoteEntry>>) {
        state
            .tracker
            .spawn(Arc::clone(state).search_directory(dir, seed));
    }

    fn halted(&self) -> bool {
        self.admission.is_cancelled()
    }

    fn search_directory(self: Arc<Self>, dir: String, seed: Option<Vec<RemoteEntry>>) -> SearchTask {
        Box::pin(async move {
            if self.halted() {
                return;
            }

            let listing = match seed {
                Some(listing) => listing,
                None => match self.list(&dir).await {
                    Ok(Some(listing)) => listing,
                    Ok(None) => return,
                    Err(e) => {
                        self.record_failure(&dir, e);
                        return;
                    }
                },
            };

            if let Some(matched) = find_match(&listing, &self.filename) {
                let entry = matched.clone().into_entry(&dir);
                if self.found.set(entry).is_ok() {
                    info!(path = %dir, filename = %self.filename, "found entry");
                }
                self.admission.cancel_pending();
                return;
            }

            for entry in listing {
                if self.halted() {
                    break;
                }
                if !entry.kind.is_directory() || entry.name == "." || entry.name == ".." {
                    continue;
                }
                Self::spawn_directory(&self, join_remote_path(&dir, &entry.name), None);
            }
        })
    }

    /// List one directory over its own session
    ///
    /// Returns `Ok(None)` if the admission attempt was cancelled.
    async fn list(&self, dir: &str) -> Result<Option<Vec<RemoteEntry>>, TransportError> {
        let slot = match self.admission.acquire(Admission::Cancellable).await {
            Ok(slot) => slot,
            Err(e) => {
                debug!(path = %dir, reason = %e, "skipping directory");
                return Ok(None);
            }
        };

        debug!(path = %dir, attempt = slot.id(), "searching remote directory");
        let mut session = OpenSession::open(self.transport.as_ref(), &self.endpoint, slot).await?;
        let result = session.session().list(dir).await;
        session.close().await;
        result.map(Some)
    }

    fn record_failure(&self, dir: &str, error: TransportError) {
        match error {
            TransportError::NoSuchPath(_) if dir == self.root => {
                let _ = self.root_missing.set(dir.to_string());
            }
            TransportError::NoSuchPath(_) => {
                // Removed between the parent's listing and ours
                debug!(path = %dir, "directory vanished during search");
            }
            error => {
                warn!(path = %dir, error = %error, "listing failed");
                let mut first = match self.first_error.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                if first.is_none() {
                    *first = Some(error);
                }
            }
        }
    }

    fn take_first_error(&self) -> Option<TransportError> {
        match self.first_error.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}
