//! Connection admission control
//!
//! Bounds how many sessions may be open against a server at once. Each open
//! session holds one [`AdmissionSlot`]; the slot returns its permit when it is
//! released or dropped, so an early return cannot leak capacity.
//!
//! Acquisition can be cancellable: a search that has already found its file
//! fires the controller's cancellation token, and every queued or future
//! cancellable attempt is withdrawn without opening a session.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// How an acquisition reacts to cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Withdraw the attempt if cancellation fires before a slot frees up
    Cancellable,
    /// Wait for a slot regardless of cancellation
    Blocking,
}

/// Error returned when no slot was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    /// Cancellation fired before a slot became available
    #[error("connection attempt #{0} was cancelled")]
    Cancelled(u64),
    /// The underlying semaphore was closed
    #[error("admission controller is closed")]
    Closed,
}

/// Counting semaphore over concurrent sessions, with a cancellable path
#[derive(Debug)]
pub struct AdmissionController {
    /// One permit per session the server will accept
    semaphore: Arc<Semaphore>,
    /// Configured number of permits
    capacity: usize,
    /// Cancellable attempts currently waiting for a permit
    pending: AtomicUsize,
    /// Monotonic counter used to label attempts
    attempts: AtomicU64,
    /// Fired once when queued work should be abandoned
    cancel: CancellationToken,
}

impl AdmissionController {
    /// Create a controller with `capacity` slots
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            pending: AtomicUsize::new(0),
            attempts: AtomicU64::new(0),
            cancel: CancellationToken::new(),
        }
    }

    /// Acquire a slot
    ///
    /// With [`Admission::Cancellable`], the attempt fails immediately if
    /// cancellation has already fired, and otherwise races a free slot against
    /// cancellation; cancellation wins ties. With [`Admission::Blocking`], the
    /// attempt waits for a slot and ignores cancellation.
    ///
    /// # Errors
    ///
    /// Returns `AdmissionError::Cancelled` when a cancellable attempt is
    /// withdrawn, or `AdmissionError::Closed` if the semaphore was closed.
    pub async fn acquire(&self, admission: Admission) -> Result<AdmissionSlot, AdmissionError> {
        let id = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;

        let permit = match admission {
            Admission::Blocking => self
                .semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| AdmissionError::Closed)?,
            Admission::Cancellable => {
                if self.cancel.is_cancelled() {
                    return Err(AdmissionError::Cancelled(id));
                }

                let _pending = PendingGuard::new(&self.pending);
                tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => {
                        trace!(attempt = id, "admission attempt withdrawn");
                        return Err(AdmissionError::Cancelled(id));
                    }
                    permit = self.semaphore.clone().acquire_owned() => {
                        permit.map_err(|_| AdmissionError::Closed)?
                    }
                }
            }
        };

        Ok(AdmissionSlot { id, permit })
    }

    /// Withdraw every queued cancellable attempt and refuse new ones
    ///
    /// Idempotent: firing it again is a no-op. Slots already handed out are
    /// unaffected.
    pub fn cancel_pending(&self) {
        self.cancel.cancel();
    }

    /// Whether [`cancel_pending`](Self::cancel_pending) has fired
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token that fires when pending work is cancelled
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Configured number of slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots not currently held
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Cancellable attempts waiting for a slot
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Total acquisition attempts so far
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

/// Permit for exactly one open session
///
/// Dropping the slot releases it; [`release`](Self::release) does the same
/// explicitly.
#[derive(Debug)]
pub struct AdmissionSlot {
    id: u64,
    permit: OwnedSemaphorePermit,
}

impl AdmissionSlot {
    /// Attempt number this slot was granted to
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Return the slot to the controller
    pub fn release(self) {
        trace!(attempt = self.id, "admission slot released");
        drop(self.permit);
    }
}

/// Keeps the pending counter accurate on every exit path of an acquisition
struct PendingGuard<'a> {
    pending: &'a AtomicUsize,
}

impl<'a> PendingGuard<'a> {
    fn new(pending: &'a AtomicUsize) -> Self {
        pending.fetch_add(1, Ordering::SeqCst);
        Self { pending }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }
}
