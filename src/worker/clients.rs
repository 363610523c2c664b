//! Open app windows the worker can see and control.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use std::sync::{Mutex, MutexGuard};
use tracing::info;

pub type ClientId = u64;

/// A window showing a page within the worker's scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowClient {
  pub id: ClientId,
  pub url: String,
  pub focused: bool,
  /// Cache name of the worker controlling this window, if any
  pub controller: Option<String>,
}

#[async_trait]
pub trait Clients: Send + Sync {
  /// Window clients, optionally including ones no worker controls yet.
  async fn match_all(&self, include_uncontrolled: bool) -> Result<Vec<WindowClient>>;

  async fn focus(&self, id: ClientId) -> Result<()>;

  /// Whether the host can open new windows at all.
  fn can_open_window(&self) -> bool;

  async fn open_window(&self, url: &str) -> Result<WindowClient>;

  /// Make `controller` the controller of every open window. Returns how many
  /// windows changed hands.
  async fn claim(&self, controller: &str) -> Result<usize>;
}

#[derive(Debug, Default)]
struct Windows {
  next_id: ClientId,
  open: Vec<WindowClient>,
}

/// In-process window registry.
#[derive(Debug)]
pub struct ClientRegistry {
  windows: Mutex<Windows>,
  allow_open: bool,
}

impl ClientRegistry {
  pub fn new(allow_open: bool) -> Self {
    Self {
      windows: Mutex::new(Windows::default()),
      allow_open,
    }
  }

  /// Register a page that was opened outside the worker.
  pub fn attach(&self, url: &str) -> Result<ClientId> {
    Ok(self.lock()?.add(url, None).id)
  }

  pub fn get(&self, id: ClientId) -> Result<Option<WindowClient>> {
    Ok(self.lock()?.open.iter().find(|w| w.id == id).cloned())
  }

  fn lock(&self) -> Result<MutexGuard<'_, Windows>> {
    self.windows.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }
}

impl Windows {
  fn add(&mut self, url: &str, controller: Option<String>) -> WindowClient {
    self.next_id += 1;
    let client = WindowClient {
      id: self.next_id,
      url: url.to_string(),
      focused: false,
      controller,
    };
    self.open.push(client.clone());
    client
  }
}

#[async_trait]
impl Clients for ClientRegistry {
  async fn match_all(&self, include_uncontrolled: bool) -> Result<Vec<WindowClient>> {
    Ok(
      self
        .lock()?
        .open
        .iter()
        .filter(|w| include_uncontrolled || w.controller.is_some())
        .cloned()
        .collect(),
    )
  }

  async fn focus(&self, id: ClientId) -> Result<()> {
    let mut windows = self.lock()?;
    if !windows.open.iter().any(|w| w.id == id) {
      return Err(eyre!("No window with id {}", id));
    }
    for window in windows.open.iter_mut() {
      window.focused = window.id == id;
    }
    Ok(())
  }

  fn can_open_window(&self) -> bool {
    self.allow_open
  }

  async fn open_window(&self, url: &str) -> Result<WindowClient> {
    if !self.allow_open {
      return Err(eyre!("Opening windows is not supported here"));
    }
    let mut windows = self.lock()?;
    let mut client = windows.add(url, None);
    for window in windows.open.iter_mut() {
      window.focused = window.id == client.id;
    }
    client.focused = true;
    info!(url = %url, id = client.id, "Opened window");
    Ok(client)
  }

  async fn claim(&self, controller: &str) -> Result<usize> {
    let mut windows = self.lock()?;
    let mut claimed = 0;
    for window in windows.open.iter_mut() {
      if window.controller.as_deref() != Some(controller) {
        window.controller = Some(controller.to_string());
        claimed += 1;
      }
    }
    Ok(claimed)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_claim_takes_over_every_window() {
    let registry = ClientRegistry::new(false);
    registry.attach("http://localhost:8080/").unwrap();
    registry.attach("http://localhost:8080/index.html").unwrap();

    assert!(registry.match_all(false).await.unwrap().is_empty());
    assert_eq!(registry.claim("v1").await.unwrap(), 2);
    assert_eq!(registry.match_all(false).await.unwrap().len(), 2);

    // Already controlled by v1
    assert_eq!(registry.claim("v1").await.unwrap(), 0);
    assert_eq!(registry.claim("v2").await.unwrap(), 2);
  }

  #[tokio::test]
  async fn test_focus() {
    let registry = ClientRegistry::new(false);
    let a = registry.attach("http://localhost:8080/a").unwrap();
    let b = registry.attach("http://localhost:8080/b").unwrap();

    registry.focus(b).await.unwrap();
    assert!(registry.get(b).unwrap().unwrap().focused);
    assert!(!registry.get(a).unwrap().unwrap().focused);

    assert!(registry.focus(99).await.is_err());
  }

  #[tokio::test]
  async fn test_open_window_capability() {
    let closed = ClientRegistry::new(false);
    assert!(!closed.can_open_window());
    assert!(closed.open_window("http://localhost:8080/").await.is_err());

    let open = ClientRegistry::new(true);
    let client = open.open_window("http://localhost:8080/").await.unwrap();
    assert!(client.focused);
    assert_eq!(open.match_all(true).await.unwrap().len(), 1);
  }
}
