//! Shared helpers for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use ftpseek_common::{Credentials, ServerEndpoint};
use ftpseek_core::testing::{MemoryEvent, MemoryTransport};
use ftpseek_core::{AdmissionController, Retriever, SearchCoordinator};

/// Endpoint pointing at nothing in particular; the memory transport ignores it
pub fn endpoint(max_sessions: usize) -> ServerEndpoint {
    ServerEndpoint::new(
        "ftp.example.org",
        Credentials::new("anonymous", "anonymous"),
        max_sessions,
    )
    .expect("valid endpoint")
}

/// Coordinator over `transport` and the admission controller it uses
pub fn coordinator(
    transport: &MemoryTransport,
    capacity: usize,
) -> (SearchCoordinator, Arc<AdmissionController>) {
    let admission = Arc::new(AdmissionController::new(capacity));
    let coordinator = SearchCoordinator::new(
        Arc::new(transport.clone()),
        Arc::new(endpoint(capacity)),
        Arc::clone(&admission),
    );
    (coordinator, admission)
}

pub fn retriever(transport: &MemoryTransport, max_sessions: usize) -> Retriever {
    Retriever::new(endpoint(max_sessions), Arc::new(transport.clone()))
}

/// Add `width` directories under `root`, each with `children` subdirectories
///
/// Directories are named `d0`, `d1`, ... and subdirectories `s0`, `s1`, ...;
/// every leaf gets a `noise.txt` file so listings are not empty.
pub fn grid(mut transport: MemoryTransport, root: &str, width: usize, children: usize) -> MemoryTransport {
    let root = root.trim_end_matches('/');
    for d in 0..width {
        for s in 0..children {
            transport = transport.with_file(&format!("{root}/d{d}/s{s}/noise.txt"), "noise");
        }
        if children == 0 {
            transport = transport.with_dir(&format!("{root}/d{d}"));
        }
    }
    transport
}

/// Number of `Connect` events recorded after the listing of `path`
pub fn connects_after_list(transport: &MemoryTransport, path: &str) -> Option<usize> {
    let events = transport.events();
    let listed = events
        .iter()
        .position(|event| *event == MemoryEvent::List(path.to_string()))?;
    Some(
        events[listed + 1..]
            .iter()
            .filter(|event| **event == MemoryEvent::Connect)
            .count(),
    )
}

/// How many times `path` was listed
pub fn list_count(transport: &MemoryTransport, path: &str) -> usize {
    transport
        .events()
        .iter()
        .filter(|event| **event == MemoryEvent::List(path.to_string()))
        .count()
}
