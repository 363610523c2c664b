//! Core traits and types for the caching system.

use color_eyre::Result;

use super::key::RequestKey;
use crate::http::Response;

/// Backend holding named cache generations of request/response pairs.
///
/// Generations are created implicitly by `open` or the first `put`. Methods
/// are synchronous; callers in async handlers invoke them directly, the same
/// way the rest of the app talks to SQLite.
pub trait CacheStorage: Send + Sync {
  /// Create the generation if it does not exist yet.
  fn open(&self, generation: &str) -> Result<()>;

  /// Whether a generation with this name exists.
  fn has(&self, generation: &str) -> Result<bool>;

  /// All generation names, oldest first.
  fn keys(&self) -> Result<Vec<String>>;

  /// Drop a generation and everything in it. Returns false if it did not exist.
  fn delete(&self, generation: &str) -> Result<bool>;

  /// Store a response under `key`, replacing any previous entry.
  fn put(&self, generation: &str, key: &RequestKey, response: &Response) -> Result<()>;

  /// Look up a response in one generation.
  fn match_in(&self, generation: &str, key: &RequestKey) -> Result<Option<Response>>;

  /// URLs stored in a generation, in insertion order.
  fn entries(&self, generation: &str) -> Result<Vec<String>>;

  /// Total body bytes stored in a generation.
  fn size(&self, generation: &str) -> Result<u64>;
}

/// Indicates where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh response from the network
  Network,
  /// Network unavailable, served from the active generation
  Cache,
  /// Network unavailable and request not cached, served the offline document
  Fallback,
}

impl CacheSource {
  pub fn label(&self) -> &'static str {
    match self {
      CacheSource::Network => "network",
      CacheSource::Cache => "cache",
      CacheSource::Fallback => "offline fallback",
    }
  }
}
