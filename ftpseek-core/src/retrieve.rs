//! Retrieval entry point
//!
//! [`Retriever`] resolves a filename to a location on the server and then
//! transfers it. Resolution tries, in order:
//!
//! 1. A remembered location for the filename, if it lies under the requested
//!    path
//! 2. A direct listing of the requested path, when one was given
//! 3. A concurrent search of the requested subtree
//!
//! Each call owns a fresh [`AdmissionController`], so cancellation fired by
//! one call's search never affects another call.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use ftpseek_common::path::{is_within, normalize_remote_path};
use ftpseek_common::validators::validate_filename;
use ftpseek_common::{DirectoryEntry, RemoteEntry, ServerEndpoint, ValidationError};

use crate::admission::{Admission, AdmissionController};
use crate::cache::LocationCache;
use crate::error::RetrieveError;
use crate::search::{SearchCoordinator, find_match};
use crate::session::OpenSession;
use crate::transport::{Transport, TransportError};

/// Outcome of listing one directory while looking for a file
enum Probe {
    /// The file is there; the session stays open for the transfer
    Found(OpenSession, DirectoryEntry),
    /// The directory exists but does not hold the file
    Absent(Vec<RemoteEntry>),
    /// The directory does not exist
    Missing,
}

/// Where a resolved file lives, and whether a session is already open there
enum Located {
    Open(OpenSession, DirectoryEntry),
    Remote(DirectoryEntry),
}

/// Locates and downloads files from one server
pub struct Retriever {
    endpoint: Arc<ServerEndpoint>,
    transport: Arc<dyn Transport>,
    cache: Mutex<LocationCache>,
}

impl Retriever {
    pub fn new(endpoint: ServerEndpoint, transport: Arc<dyn Transport>) -> Self {
        Self {
            endpoint: Arc::new(endpoint),
            transport,
            cache: Mutex::new(LocationCache::default()),
        }
    }

    /// Remember at most `capacity` file locations
    #[must_use]
    pub fn with_cache_capacity(self, capacity: usize) -> Self {
        Self {
            cache: Mutex::new(LocationCache::new(capacity)),
            ..self
        }
    }

    /// Seed the location cache with `(filename, directory)` pairs
    #[must_use]
    pub fn with_hints<I, K, V>(self, hints: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        {
            let mut cache = self.cache();
            for (filename, directory) in hints {
                cache.insert(filename, normalize_remote_path(directory.as_ref()));
            }
        }
        self
    }

    pub fn endpoint(&self) -> &ServerEndpoint {
        &self.endpoint
    }

    /// Directory `filename` was last found in, if remembered
    pub fn cached_location(&self, filename: &str) -> Option<String> {
        self.cache().get(filename)
    }

    /// Download `filename` from `offset` to the end of the file
    ///
    /// `path` is where the caller expects the file to be. If it is empty, or
    /// the file is not directly inside it, everything beneath `path` (or the
    /// server root) is searched.
    ///
    /// # Errors
    ///
    /// - `Validation` if the filename is malformed; nothing is sent
    /// - `PathNotFound` if `path` does not exist
    /// - `NotFound` if nothing by that name exists beneath `path`
    /// - `Transport` if the server could not be talked to, or the name
    ///   resolved to a directory
    pub async fn get(&self, filename: &str, path: &str, offset: u64) -> Result<Vec<u8>, RetrieveError> {
        let mut data = Vec::new();
        self.get_to_writer(filename, path, offset, &mut data).await?;
        Ok(data)
    }

    /// Like [`get`](Self::get), streaming into `writer`
    ///
    /// Returns the number of bytes written.
    pub async fn get_to_writer<W>(
        &self,
        filename: &str,
        path: &str,
        offset: u64,
        writer: &mut W,
    ) -> Result<u64, RetrieveError>
    where
        W: AsyncWrite + Send + Unpin,
    {
        self.validate(filename)?;
        let admission = self.admission();

        match self.locate(&admission, filename, path).await? {
            Located::Open(session, entry) => transfer(session, &entry, offset, writer).await,
            Located::Remote(entry) => self.fetch(&admission, &entry, offset, writer).await,
        }
    }

    /// Resolve `filename` to its metadata without transferring it
    ///
    /// Resolution is the same as for [`get`](Self::get). Directories match by
    /// name too.
    pub async fn get_meta(&self, filename: &str, path: &str) -> Result<DirectoryEntry, RetrieveError> {
        self.validate(filename)?;
        let admission = self.admission();

        match self.locate(&admission, filename, path).await? {
            Located::Open(session, entry) => {
                session.close().await;
                Ok(entry)
            }
            Located::Remote(entry) => Ok(entry),
        }
    }

    /// Download an already-located entry from `offset`
    ///
    /// The entry's directory is listed first to confirm the file is still
    /// there.
    pub async fn get_file<W>(
        &self,
        entry: &DirectoryEntry,
        offset: u64,
        writer: &mut W,
    ) -> Result<u64, RetrieveError>
    where
        W: AsyncWrite + Send + Unpin,
    {
        self.validate(&entry.name)?;
        let admission = self.admission();
        self.fetch(&admission, entry, offset, writer).await
    }

    fn validate(&self, filename: &str) -> Result<(), ValidationError> {
        validate_filename(filename).map_err(|reason| ValidationError::Filename {
            filename: filename.to_string(),
            reason,
        })
    }

    fn admission(&self) -> Arc<AdmissionController> {
        Arc::new(AdmissionController::new(self.endpoint.max_sessions()))
    }

    fn cache(&self) -> MutexGuard<'_, LocationCache> {
        match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn remember(&self, entry: &DirectoryEntry) {
        self.cache().insert(entry.name.clone(), entry.path.clone());
    }

    fn forget(&self, filename: &str) {
        if self.cache().remove(filename).is_some() {
            debug!(filename, "dropped stale location");
        }
    }

    async fn locate(
        &self,
        admission: &Arc<AdmissionController>,
        filename: &str,
        path: &str,
    ) -> Result<Located, RetrieveError> {
        let root = normalize_remote_path(path);
        let mut seed = None;

        let hint = self.cached_location(filename);
        if let Some(hint) = hint.filter(|hint| is_within(hint, &root)) {
            debug!(filename, path = %hint, "trying remembered location");
            match self.probe(admission, &hint, filename).await {
                Ok(Probe::Found(session, entry)) => return Ok(Located::Open(session, entry)),
                Ok(Probe::Absent(listing)) => {
                    self.forget(filename);
                    if hint == root {
                        seed = Some(listing);
                    }
                }
                Ok(Probe::Missing) => self.forget(filename),
                Err(e) => {
                    debug!(filename, path = %hint, error = %e, "remembered location unreadable");
                    self.forget(filename);
                }
            }
        }

        if !path.trim().is_empty() && seed.is_none() {
            match self.probe(admission, &root, filename).await? {
                Probe::Found(session, entry) => {
                    self.remember(&entry);
                    return Ok(Located::Open(session, entry));
                }
                Probe::Absent(listing) => seed = Some(listing),
                Probe::Missing => return Err(RetrieveError::PathNotFound(root)),
            }
        }

        debug!(filename, root = %root, "searching subtree");
        let coordinator = SearchCoordinator::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.endpoint),
            Arc::clone(admission),
        );
        let entry = match seed {
            Some(listing) => coordinator.search_seeded(&root, filename, listing).await?,
            None => coordinator.search(&root, filename).await?,
        };

        info!(filename, path = %entry.path, "located file");
        self.remember(&entry);
        Ok(Located::Remote(entry))
    }

    /// List `dir` over a non-cancellable session and look for `filename`
    async fn probe(
        &self,
        admission: &AdmissionController,
        dir: &str,
        filename: &str,
    ) -> Result<Probe, RetrieveError> {
        let slot = admission.acquire(Admission::Blocking).await?;
        let mut session = OpenSession::open(self.transport.as_ref(), &self.endpoint, slot).await?;

        let listing = match session.session().list(dir).await {
            Ok(listing) => listing,
            Err(TransportError::NoSuchPath(_)) => {
                session.close().await;
                return Ok(Probe::Missing);
            }
            Err(e) => {
                session.close().await;
                return Err(e.into());
            }
        };

        match find_match(&listing, filename) {
            Some(found) => {
                let entry = found.clone().into_entry(dir);
                Ok(Probe::Found(session, entry))
            }
            None => {
                session.close().await;
                Ok(Probe::Absent(listing))
            }
        }
    }

    /// Confirm `entry` is still in place, then transfer it
    async fn fetch<W>(
        &self,
        admission: &AdmissionController,
        entry: &DirectoryEntry,
        offset: u64,
        writer: &mut W,
    ) -> Result<u64, RetrieveError>
    where
        W: AsyncWrite + Send + Unpin,
    {
        match self.probe(admission, &entry.path, &entry.name).await? {
            Probe::Found(session, confirmed) => transfer(session, &confirmed, offset, writer).await,
            Probe::Absent(_) | Probe::Missing => {
                self.forget(&entry.name);
                Err(RetrieveError::NotFound {
                    filename: entry.name.clone(),
                    root: entry.path.clone(),
                })
            }
        }
    }
}

async fn transfer<W>(
    mut session: OpenSession,
    entry: &DirectoryEntry,
    offset: u64,
    writer: &mut W,
) -> Result<u64, RetrieveError>
where
    W: AsyncWrite + Send + Unpin,
{
    let path = entry.full_path();
    if entry.kind.is_directory() {
        session.close().await;
        return Err(TransportError::NotAFile(path).into());
    }
    debug!(path = %path, offset, "retrieving file");

    let result = session.session().retrieve(&path, offset, writer).await;
    session.close().await;
    let written = result?;

    writer.flush().await.map_err(TransportError::from)?;
    Ok(written)
}
