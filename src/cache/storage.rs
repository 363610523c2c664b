//! Cache storage backends: SQLite and a no-op variant.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::key::RequestKey;
use super::traits::CacheStorage;
use crate::http::{Response, ResponseType};

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn open(&self, _generation: &str) -> Result<()> {
    Ok(())
  }

  fn has(&self, _generation: &str) -> Result<bool> {
    Ok(false)
  }

  fn keys(&self) -> Result<Vec<String>> {
    Ok(Vec::new())
  }

  fn delete(&self, _generation: &str) -> Result<bool> {
    Ok(false)
  }

  fn put(&self, _generation: &str, _key: &RequestKey, _response: &Response) -> Result<()> {
    Ok(()) // Discard
  }

  fn match_in(&self, _generation: &str, _key: &RequestKey) -> Result<Option<Response>> {
    Ok(None) // Always miss
  }

  fn entries(&self, _generation: &str) -> Result<Vec<String>> {
    Ok(Vec::new())
  }

  fn size(&self, _generation: &str) -> Result<u64> {
    Ok(0)
  }
}

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open (or create) the cache database at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// Cache that lives only as long as the process.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    self
      .lock()?
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;
    Ok(())
  }

  fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
    self.conn.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
-- One row per cache generation (version name)
CREATE TABLE IF NOT EXISTS cache_generations (
    name TEXT PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Stored responses, keyed by generation + request hash
CREATE TABLE IF NOT EXISTS cached_assets (
    generation TEXT NOT NULL,
    key_hash TEXT NOT NULL,
    method TEXT NOT NULL,
    url TEXT NOT NULL,
    status INTEGER NOT NULL,
    response_type TEXT NOT NULL,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (generation, key_hash)
);

CREATE INDEX IF NOT EXISTS idx_cached_assets_generation ON cached_assets(generation);
"#;

impl CacheStorage for SqliteStorage {
  fn open(&self, generation: &str) -> Result<()> {
    self
      .lock()?
      .execute(
        "INSERT OR IGNORE INTO cache_generations (name) VALUES (?)",
        params![generation],
      )
      .map_err(|e| eyre!("Failed to open cache generation {}: {}", generation, e))?;
    Ok(())
  }

  fn has(&self, generation: &str) -> Result<bool> {
    let conn = self.lock()?;
    let found: Option<i64> = conn
      .query_row(
        "SELECT 1 FROM cache_generations WHERE name = ?",
        params![generation],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to look up cache generation {}: {}", generation, e))?;
    Ok(found.is_some())
  }

  fn keys(&self) -> Result<Vec<String>> {
    let conn = self.lock()?;
    let mut stmt = conn
      .prepare("SELECT name FROM cache_generations ORDER BY created_at, rowid")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let names = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to list cache generations: {}", e))?
      .collect::<rusqlite::Result<Vec<String>>>()
      .map_err(|e| eyre!("Failed to read cache generation: {}", e))?;

    Ok(names)
  }

  fn delete(&self, generation: &str) -> Result<bool> {
    let mut conn = self.lock()?;
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    tx.execute(
      "DELETE FROM cached_assets WHERE generation = ?",
      params![generation],
    )
    .map_err(|e| eyre!("Failed to delete cached assets: {}", e))?;

    let removed = tx
      .execute(
        "DELETE FROM cache_generations WHERE name = ?",
        params![generation],
      )
      .map_err(|e| eyre!("Failed to delete cache generation: {}", e))?;

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(removed > 0)
  }

  fn put(&self, generation: &str, key: &RequestKey, response: &Response) -> Result<()> {
    let headers = serde_json::to_string(&response.headers)
      .map_err(|e| eyre!("Failed to serialize headers: {}", e))?;

    let mut conn = self.lock()?;
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    tx.execute(
      "INSERT OR IGNORE INTO cache_generations (name) VALUES (?)",
      params![generation],
    )
    .map_err(|e| eyre!("Failed to open cache generation {}: {}", generation, e))?;

    tx.execute(
      "INSERT OR REPLACE INTO cached_assets
         (generation, key_hash, method, url, status, response_type, headers, body, cached_at)
       VALUES (?, ?, ?, ?, ?, ?, ?, ?, datetime('now'))",
      params![
        generation,
        key.cache_hash(),
        key.method().as_str(),
        key.url(),
        response.status,
        response.kind.as_str(),
        headers,
        response.body,
      ],
    )
    .map_err(|e| eyre!("Failed to store {}: {}", key, e))?;

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(())
  }

  fn match_in(&self, generation: &str, key: &RequestKey) -> Result<Option<Response>> {
    let conn = self.lock()?;
    let row: Option<(String, u16, String, String, Vec<u8>)> = conn
      .query_row(
        "SELECT url, status, response_type, headers, body FROM cached_assets
         WHERE generation = ? AND key_hash = ?",
        params![generation, key.cache_hash()],
        |row| {
          Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
          ))
        },
      )
      .optional()
      .map_err(|e| eyre!("Failed to look up {}: {}", key, e))?;

    match row {
      Some((url, status, kind, headers, body)) => {
        let headers: Vec<(String, String)> = serde_json::from_str(&headers)
          .map_err(|e| eyre!("Failed to deserialize headers for {}: {}", url, e))?;
        Ok(Some(Response {
          url,
          status,
          kind: kind.parse::<ResponseType>()?,
          headers,
          body,
        }))
      }
      None => Ok(None),
    }
  }

  fn entries(&self, generation: &str) -> Result<Vec<String>> {
    let conn = self.lock()?;
    let mut stmt = conn
      .prepare("SELECT url FROM cached_assets WHERE generation = ? ORDER BY rowid")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let urls = stmt
      .query_map(params![generation], |row| row.get(0))
      .map_err(|e| eyre!("Failed to list cached assets: {}", e))?
      .collect::<rusqlite::Result<Vec<String>>>()
      .map_err(|e| eyre!("Failed to read cached asset: {}", e))?;

    Ok(urls)
  }

  fn size(&self, generation: &str) -> Result<u64> {
    let conn = self.lock()?;
    let total: i64 = conn
      .query_row(
        "SELECT COALESCE(SUM(LENGTH(body)), 0) FROM cached_assets WHERE generation = ?",
        params![generation],
        |row| row.get(0),
      )
      .map_err(|e| eyre!("Failed to measure cache generation {}: {}", generation, e))?;
    Ok(total.max(0) as u64)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::http::Request;

  fn key(url: &str) -> RequestKey {
    RequestKey::new(&Request::parse_get(url).unwrap()).unwrap()
  }

  fn html(url: &str, body: &str) -> Response {
    Response::new(url, 200, ResponseType::Basic, body.as_bytes().to_vec())
      .with_header("content-type", "text/html")
  }

  #[test]
  fn test_put_and_match() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let k = key("http://localhost:8080/index.html");
    let resp = html("http://localhost:8080/index.html", "<h1>hi</h1>");

    storage.put("v1", &k, &resp).unwrap();

    assert!(storage.has("v1").unwrap());
    assert_eq!(storage.match_in("v1", &k).unwrap(), Some(resp));
    assert_eq!(storage.match_in("v2", &k).unwrap(), None);
  }

  #[test]
  fn test_keys_in_creation_order_and_delete() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage.open("v1").unwrap();
    storage.open("v2").unwrap();
    storage.open("v1").unwrap();

    assert_eq!(storage.keys().unwrap(), vec!["v1", "v2"]);

    assert!(storage.delete("v1").unwrap());
    assert!(!storage.delete("v1").unwrap());
    assert_eq!(storage.keys().unwrap(), vec!["v2"]);
  }

  #[test]
  fn test_delete_drops_assets() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let k = key("http://localhost:8080/app.js");
    storage
      .put("v1", &k, &html("http://localhost:8080/app.js", "x"))
      .unwrap();

    storage.delete("v1").unwrap();
    storage.open("v1").unwrap();

    assert_eq!(storage.match_in("v1", &k).unwrap(), None);
    assert!(storage.entries("v1").unwrap().is_empty());
  }

  #[test]
  fn test_put_replaces_and_sizes() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let k = key("http://localhost:8080/style.css");
    storage
      .put("v1", &k, &html("http://localhost:8080/style.css", "aaaa"))
      .unwrap();
    storage
      .put("v1", &k, &html("http://localhost:8080/style.css", "bb"))
      .unwrap();

    assert_eq!(storage.size("v1").unwrap(), 2);
    assert_eq!(
      storage.entries("v1").unwrap(),
      vec!["http://localhost:8080/style.css"]
    );
  }

  #[test]
  fn test_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("shell-cache.db");
    let k = key("http://localhost:8080/");

    {
      let storage = SqliteStorage::open(&path).unwrap();
      storage
        .put("customer-mgr-v1", &k, &html("http://localhost:8080/", "shell"))
        .unwrap();
    }

    let storage = SqliteStorage::open(&path).unwrap();
    let found = storage.match_in("customer-mgr-v1", &k).unwrap().unwrap();
    assert_eq!(found.body, b"shell");
  }

  #[test]
  fn test_noop_storage_always_misses() {
    let storage = NoopStorage;
    let k = key("http://localhost:8080/");
    storage
      .put("v1", &k, &html("http://localhost:8080/", "x"))
      .unwrap();
    assert_eq!(storage.match_in("v1", &k).unwrap(), None);
    assert!(storage.keys().unwrap().is_empty());
  }
}
