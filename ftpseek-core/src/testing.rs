//! In-memory transport for tests
//!
//! [`MemoryTransport`] serves a directory tree held in memory and records
//! every call made against it, including how many sessions were open at the
//! same time. Clones share the same tree and counters.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use ftpseek_common::path::normalize_remote_path;
use ftpseek_common::{Credentials, EntryKind, RemoteEntry};

use crate::transport::{Session, Transport, TransportError};

/// One call observed by a [`MemoryTransport`], in the order it completed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryEvent {
    Connect,
    List(String),
    Retrieve(String),
    Close,
}

/// Counters snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub connects: usize,
    pub lists: usize,
    pub retrieves: usize,
    pub closes: usize,
    /// Sessions currently open
    pub open_sessions: usize,
    /// Most sessions ever open at once
    pub peak_sessions: usize,
}

#[derive(Default)]
struct Tree {
    dirs: BTreeMap<String, Vec<RemoteEntry>>,
    contents: HashMap<String, Vec<u8>>,
    /// Listed by their parent but gone when listed themselves
    dangling: HashSet<String>,
    failing: HashSet<String>,
    list_delay: Duration,
    password: Option<String>,
}

impl Tree {
    /// Create `path` and every missing ancestor
    fn ensure_dir(&mut self, path: &str) {
        let path = normalize_remote_path(path);
        if self.dirs.contains_key(&path) {
            return;
        }
        self.dirs.insert(path.clone(), Vec::new());
        if path == "/" {
            return;
        }

        let (parent, name) = split_parent(&path);
        self.ensure_dir(&parent);
        self.add_entry(&parent, name, EntryKind::Directory, 0);
    }

    fn add_entry(&mut self, dir: &str, name: &str, kind: EntryKind, size: u64) {
        let listing = self.dirs.entry(dir.to_string()).or_default();
        listing.retain(|entry| entry.name != name);
        listing.push(RemoteEntry {
            name: name.to_string(),
            kind,
            size,
            modified: None,
        });
    }
}

fn split_parent(path: &str) -> (String, &str) {
    match path.rfind('/') {
        Some(0) => ("/".to_string(), &path[1..]),
        Some(idx) => (path[..idx].to_string(), &path[idx + 1..]),
        None => ("/".to_string(), path),
    }
}

#[derive(Default)]
struct Inner {
    tree: Mutex<Tree>,
    events: Mutex<Vec<MemoryEvent>>,
    connects: AtomicUsize,
    lists: AtomicUsize,
    retrieves: AtomicUsize,
    closes: AtomicUsize,
    open: AtomicUsize,
    peak: AtomicUsize,
}

impl Inner {
    fn tree(&self) -> MutexGuard<'_, Tree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, event: MemoryEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// Transport over an in-memory directory tree
#[derive(Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<Inner>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory, creating its ancestors
    #[must_use]
    pub fn with_dir(self, path: &str) -> Self {
        self.inner.tree().ensure_dir(path);
        self
    }

    /// Add a file, creating its parent directories
    #[must_use]
    pub fn with_file(self, path: &str, data: impl Into<Vec<u8>>) -> Self {
        let path = normalize_remote_path(path);
        let data = data.into();
        {
            let mut tree = self.inner.tree();
            let (parent, name) = split_parent(&path);
            tree.ensure_dir(&parent);
            tree.add_entry(&parent, name, EntryKind::File, data.len() as u64);
            tree.contents.insert(path.clone(), data);
        }
        self
    }

    /// Add a directory that shows up in its parent's listing but no longer
    /// exists when listed itself
    #[must_use]
    pub fn with_dangling_dir(self, path: &str) -> Self {
        let path = normalize_remote_path(path);
        {
            let mut tree = self.inner.tree();
            let (parent, name) = split_parent(&path);
            tree.ensure_dir(&parent);
            tree.add_entry(&parent, name, EntryKind::Directory, 0);
            tree.dangling.insert(path);
        }
        self
    }

    /// Delay every listing by `delay`
    #[must_use]
    pub fn with_list_delay(self, delay: Duration) -> Self {
        self.inner.tree().list_delay = delay;
        self
    }

    /// Make listings of `path` fail with a protocol error
    #[must_use]
    pub fn with_list_failure(self, path: &str) -> Self {
        self.inner.tree().failing.insert(normalize_remote_path(path));
        self
    }

    /// Require this password to log in
    #[must_use]
    pub fn with_password(self, password: &str) -> Self {
        self.inner.tree().password = Some(password.to_string());
        self
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            connects: self.inner.connects.load(Ordering::SeqCst),
            lists: self.inner.lists.load(Ordering::SeqCst),
            retrieves: self.inner.retrieves.load(Ordering::SeqCst),
            closes: self.inner.closes.load(Ordering::SeqCst),
            open_sessions: self.inner.open.load(Ordering::SeqCst),
            peak_sessions: self.inner.peak.load(Ordering::SeqCst),
        }
    }

    pub fn events(&self) -> Vec<MemoryEvent> {
        self.inner
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Total number of calls of any kind
    pub fn total_calls(&self) -> usize {
        self.events().len()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(
        &self,
        _hostname: &str,
        _port: u16,
        _timeout: Duration,
    ) -> Result<Box<dyn Session>, TransportError> {
        self.inner.connects.fetch_add(1, Ordering::SeqCst);
        let open = self.inner.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.peak.fetch_max(open, Ordering::SeqCst);
        self.inner.record(MemoryEvent::Connect);

        Ok(Box::new(MemorySession {
            inner: Arc::clone(&self.inner),
            open: true,
            authenticated: false,
        }))
    }
}

/// Session handed out by [`MemoryTransport`]
pub struct MemorySession {
    inner: Arc<Inner>,
    open: bool,
    authenticated: bool,
}

impl MemorySession {
    fn check_ready(&self) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::Closed);
        }
        if !self.authenticated {
            return Err(TransportError::Protocol("530 Not logged in".to_string()));
        }
        Ok(())
    }

    fn mark_closed(&mut self) {
        if self.open {
            self.open = false;
            self.inner.open.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn authenticate(&mut self, credentials: &Credentials) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::Closed);
        }
        let expected = self.inner.tree().password.clone();
        match expected {
            Some(password) if password != credentials.password => {
                Err(TransportError::Auth("530 Login incorrect".to_string()))
            }
            _ => {
                self.authenticated = true;
                Ok(())
            }
        }
    }

    async fn list(&mut self, path: &str) -> Result<Vec<RemoteEntry>, TransportError> {
        self.check_ready()?;
        let path = normalize_remote_path(path);

        let delay = self.inner.tree().list_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.inner.lists.fetch_add(1, Ordering::SeqCst);
        self.inner.record(MemoryEvent::List(path.clone()));

        let tree = self.inner.tree();
        if tree.failing.contains(&path) {
            return Err(TransportError::Protocol(format!(
                "451 Requested action aborted listing {path}"
            )));
        }
        if tree.dangling.contains(&path) {
            return Err(TransportError::NoSuchPath(path));
        }
        tree.dirs
            .get(&path)
            .cloned()
            .ok_or(TransportError::NoSuchPath(path))
    }

    async fn retrieve(
        &mut self,
        path: &str,
        offset: u64,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64, TransportError> {
        self.check_ready()?;
        let path = normalize_remote_path(path);

        self.inner.retrieves.fetch_add(1, Ordering::SeqCst);
        self.inner.record(MemoryEvent::Retrieve(path.clone()));

        let data = self
            .inner
            .tree()
            .contents
            .get(&path)
            .cloned()
            .ok_or_else(|| TransportError::NoSuchPath(path.clone()))?;

        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
        let suffix = &data[start..];
        sink.write_all(suffix).await?;
        Ok(suffix.len() as u64)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.open {
            self.inner.closes.fetch_add(1, Ordering::SeqCst);
            self.inner.record(MemoryEvent::Close);
        }
        self.mark_closed();
        Ok(())
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.mark_closed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn session(transport: &MemoryTransport) -> Box<dyn Session> {
        let mut session = transport
            .connect("localhost", 21, Duration::from_secs(1))
            .await
            .unwrap();
        session
            .authenticate(&Credentials::new("anonymous", "anonymous"))
            .await
            .unwrap();
        session
    }

    fn names(listing: &[RemoteEntry]) -> Vec<&str> {
        listing.iter().map(|entry| entry.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_tree_building() {
        let transport = MemoryTransport::new()
            .with_file("/a/b/c.txt", "hello")
            .with_dir("/a/empty");
        let mut session = session(&transport).await;

        assert_eq!(names(&session.list("/").await.unwrap()), vec!["a"]);
        assert_eq!(names(&session.list("/a").await.unwrap()), vec!["b", "empty"]);
        assert!(session.list("/a/empty").await.unwrap().is_empty());

        let files = session.list("/a/b").await.unwrap();
        assert_eq!(files[0].kind, EntryKind::File);
        assert_eq!(files[0].size, 5);
    }

    #[tokio::test]
    async fn test_missing_path() {
        let transport = MemoryTransport::new().with_dir("/a");
        let mut session = session(&transport).await;
        assert!(matches!(
            session.list("/nope").await,
            Err(TransportError::NoSuchPath(_))
        ));
    }

    #[tokio::test]
    async fn test_retrieve_with_offset() {
        let transport = MemoryTransport::new().with_file("/f.bin", "0123456789");
        let mut session = session(&transport).await;

        let mut out = Vec::new();
        let written = session.retrieve("/f.bin", 4, &mut out).await.unwrap();
        assert_eq!(written, 6);
        assert_eq!(out, b"456789");

        let mut past_end = Vec::new();
        assert_eq!(session.retrieve("/f.bin", 99, &mut past_end).await.unwrap(), 0);
        assert!(past_end.is_empty());
    }

    #[tokio::test]
    async fn test_session_counting() {
        let transport = MemoryTransport::new();
        let mut first = session(&transport).await;
        let second = session(&transport).await;
        assert_eq!(transport.stats().open_sessions, 2);

        first.close().await.unwrap();
        first.close().await.unwrap();
        drop(second);

        let stats = transport.stats();
        assert_eq!(stats.open_sessions, 0);
        assert_eq!(stats.peak_sessions, 2);
        assert_eq!(stats.connects, 2);
        assert_eq!(stats.closes, 1);
    }

    #[tokio::test]
    async fn test_password_required() {
        let transport = MemoryTransport::new().with_password("secret");
        let mut session = transport
            .connect("localhost", 21, Duration::from_secs(1))
            .await
            .unwrap();

        let result = session
            .authenticate(&Credentials::new("anonymous", "anonymous"))
            .await;
        assert!(matches!(result, Err(TransportError::Auth(_))));
        assert!(session.list("/").await.is_err());
    }

    #[tokio::test]
    async fn test_events_are_recorded() {
        let transport = MemoryTransport::new().with_dir("/pub");
        let mut session = session(&transport).await;
        session.list("/pub/").await.unwrap();
        session.close().await.unwrap();

        assert_eq!(
            transport.events(),
            vec![
                MemoryEvent::Connect,
                MemoryEvent::List("/pub".to_string()),
                MemoryEvent::Close,
            ]
        );
    }
}
