//! Process-local cache storage.

use color_eyre::{eyre::eyre, Result};
use std::sync::{Mutex, MutexGuard};

use super::key::RequestKey;
use super::traits::CacheStorage;
use crate::http::Response;

#[derive(Debug)]
struct Generation {
  name: String,
  entries: Vec<(RequestKey, Response)>,
}

/// In-memory storage, generations kept in creation order.
#[derive(Debug, Default)]
pub struct MemoryStorage {
  generations: Mutex<Vec<Generation>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> Result<MutexGuard<'_, Vec<Generation>>> {
    self
      .generations
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }
}

impl CacheStorage for MemoryStorage {
  fn open(&self, generation: &str) -> Result<()> {
    let mut generations = self.lock()?;
    if !generations.iter().any(|g| g.name == generation) {
      generations.push(Generation {
        name: generation.to_string(),
        entries: Vec::new(),
      });
    }
    Ok(())
  }

  fn has(&self, generation: &str) -> Result<bool> {
    Ok(self.lock()?.iter().any(|g| g.name == generation))
  }

  fn keys(&self) -> Result<Vec<String>> {
    Ok(self.lock()?.iter().map(|g| g.name.clone()).collect())
  }

  fn delete(&self, generation: &str) -> Result<bool> {
    let mut generations = self.lock()?;
    let before = generations.len();
    generations.retain(|g| g.name != generation);
    Ok(generations.len() != before)
  }

  fn put(&self, generation: &str, key: &RequestKey, response: &Response) -> Result<()> {
    self.open(generation)?;

    let mut generations = self.lock()?;
    let target = generations
      .iter_mut()
      .find(|g| g.name == generation)
      .ok_or_else(|| eyre!("Cache generation {} vanished during put", generation))?;

    match target.entries.iter_mut().find(|(k, _)| k == key) {
      Some((_, existing)) => *existing = response.clone(),
      None => target.entries.push((key.clone(), response.clone())),
    }
    Ok(())
  }

  fn match_in(&self, generation: &str, key: &RequestKey) -> Result<Option<Response>> {
    let generations = self.lock()?;
    Ok(
      generations
        .iter()
        .find(|g| g.name == generation)
        .and_then(|g| g.entries.iter().find(|(k, _)| k == key))
        .map(|(_, response)| response.clone()),
    )
  }

  fn entries(&self, generation: &str) -> Result<Vec<String>> {
    let generations = self.lock()?;
    Ok(
      generations
        .iter()
        .find(|g| g.name == generation)
        .map(|g| g.entries.iter().map(|(k, _)| k.url().to_string()).collect())
        .unwrap_or_default(),
    )
  }

  fn size(&self, generation: &str) -> Result<u64> {
    let generations = self.lock()?;
    Ok(
      generations
        .iter()
        .find(|g| g.name == generation)
        .map(|g| g.entries.iter().map(|(_, r)| r.body.len() as u64).sum())
        .unwrap_or(0),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::http::{Request, ResponseType};

  fn key(url: &str) -> RequestKey {
    RequestKey::new(&Request::parse_get(url).unwrap()).unwrap()
  }

  #[test]
  fn test_put_creates_generation() {
    let storage = MemoryStorage::new();
    let k = key("http://localhost:8080/");
    let resp = Response::new("http://localhost:8080/", 200, ResponseType::Basic, b"ok".to_vec());

    storage.put("v1", &k, &resp).unwrap();

    assert_eq!(storage.keys().unwrap(), vec!["v1"]);
    assert_eq!(storage.match_in("v1", &k).unwrap(), Some(resp));
    assert_eq!(storage.size("v1").unwrap(), 2);
  }

  #[test]
  fn test_delete_unknown_generation() {
    let storage = MemoryStorage::new();
    storage.open("v1").unwrap();
    assert!(!storage.delete("v0").unwrap());
    assert!(storage.delete("v1").unwrap());
    assert!(storage.keys().unwrap().is_empty());
  }
}
