//! Per-session mutual exclusion

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{FairMutex, Mutex};
use tracing::debug;

/// One lock per session id, created on first use.
///
/// The table mutex is held only while looking up or inserting a session's
/// lock, never while that lock is held. Session locks are fair: waiters on
/// the same session are served in arrival order. No timeout is applied.
#[derive(Debug, Default)]
pub struct SessionLockTable {
    locks: Mutex<HashMap<String, Arc<FairMutex<()>>>>,
}

impl SessionLockTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, session_id: &str) -> Arc<FairMutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(
            locks
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(FairMutex::new(()))),
        )
    }

    /// Run `f` while holding the session's lock.
    ///
    /// The lock is released on every exit path, including a panic in `f`.
    pub fn run_exclusive<R>(&self, session_id: &str, f: impl FnOnce() -> R) -> R {
        let lock = self.lock_for(session_id);
        debug!(session_id, "Waiting for session lock");
        let _guard = lock.lock();
        debug!(session_id, "Acquired session lock");
        f()
    }

    /// Whether an execution currently holds the session's lock
    pub fn is_locked(&self, session_id: &str) -> bool {
        self.locks
            .lock()
            .get(session_id)
            .is_some_and(|lock| lock.is_locked())
    }

    /// Run `f` under the session's lock, then forget the lock if no other
    /// caller holds a reference to it.
    ///
    /// The entry is dropped while the guard is still held. A caller already
    /// queued on the lock keeps the entry alive, so later arrivals line up
    /// behind it instead of creating a second lock for the same session.
    pub fn run_exclusive_then_retire<R>(&self, session_id: &str, f: impl FnOnce() -> R) -> R {
        let lock = self.lock_for(session_id);
        let _guard = lock.lock();
        let result = f();

        // Clones are only taken under the table mutex, so the count is stable here
        let mut locks = self.locks.lock();
        let idle = locks
            .get(session_id)
            .is_some_and(|entry| Arc::ptr_eq(entry, &lock) && Arc::strong_count(&lock) == 2);
        if idle {
            locks.remove(session_id);
            debug!(session_id, "Retired session lock");
        }
        result
    }

    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
