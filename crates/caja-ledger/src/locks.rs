//! # Per-Session Locks
//!
//! Serializes mutations per session id.
//!
//! ## Why Two Layers of Protection
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  In-process writers:   SessionLocks (this module)                       │
//! │     register expense / close / approve on the SAME session queue up;   │
//! │     the solvency check and the insert it guards happen atomically.     │
//! │                                                                         │
//! │  Out-of-process writers:  version column (caja-db)                      │
//! │     a second process bypasses these locks entirely; the optimistic     │
//! │     version guard catches its writes and the loser retries.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Operations on *different* sessions never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// A keyed set of async mutexes, one per session id.
#[derive(Debug, Default)]
pub struct SessionLocks {
    // std Mutex guards only the map itself; it is never held across await
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl SessionLocks {
    /// Creates an empty lock set.
    pub fn new() -> Self {
        SessionLocks::default()
    }

    /// Acquires the mutation lock for a session, waiting if another task
    /// holds it. The guard releases on drop.
    pub async fn lock(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let entry = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(
                map.entry(session_id.to_string())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };
        entry.lock_owned().await
    }
}
