//! Versioned response cache backing the offline worker.
//!
//! A cache generation is a named snapshot of request/response pairs. The
//! worker writes into exactly one generation (its own version) and evicts
//! the others when it activates.
//! - Keys are GET requests with the URL fragment stripped
//! - Backends: SQLite (persistent), in-memory, or no-op when caching is off

mod key;
mod memory;
mod storage;
mod traits;

pub use key::RequestKey;
pub use memory::MemoryStorage;
pub use storage::{NoopStorage, SqliteStorage};
pub use traits::{CacheSource, CacheStorage};

use color_eyre::Result;
use std::sync::Arc;
use tracing::debug;

use crate::config::{CacheBackend, Config};

/// Open the backend selected by `cache.backend`.
pub fn open_storage(config: &Config) -> Result<Arc<dyn CacheStorage>> {
  let storage: Arc<dyn CacheStorage> = match config.cache.backend {
    CacheBackend::Sqlite => {
      let path = config.shell_cache_path()?;
      debug!(path = %path.display(), "Opening shell cache");
      Arc::new(SqliteStorage::open(&path)?)
    }
    CacheBackend::Memory => Arc::new(MemoryStorage::new()),
    CacheBackend::Disabled => Arc::new(NoopStorage),
  };
  Ok(storage)
}
