//! Storage layer for chunkd.
//!
//! SQLite persistence for tasks and chunks.
//!
//! # Example
//!
//! ```ignore
//! use chunkd::store::TaskStore;
//! use chunkd::domain::NewTask;
//!
//! let mut store = TaskStore::open(Path::new("/tmp/chunkd.db"))?;
//! store.create_task(&NewTask::new("Write report", 120).into_task()?)?;
//!
//! let claimed = store.claim_unchunked()?;
//! ```

mod task_store;

pub use task_store::TaskStore;

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{ChunkdError, Result};

/// Store handle shared between request handlers
pub type SharedStore = Arc<Mutex<TaskStore>>;

pub fn shared(store: TaskStore) -> SharedStore {
    Arc::new(Mutex::new(store))
}

/// Lock the shared store. Never hold the guard across an `.await`.
pub fn lock(store: &SharedStore) -> Result<MutexGuard<'_, TaskStore>> {
    store
        .lock()
        .map_err(|_| ChunkdError::Io(std::io::Error::other("task store lock poisoned")))
}
