//! Offline cache worker.
//!
//! Pre-caches the app shell on install, evicts stale cache generations on
//! activation, serves intercepted GET requests network-first with a cache
//! and offline-document fallback, and relays push messages to notifications.
//! Every I/O failure degrades to a fallback; nothing here is fatal.

mod clients;
mod event;
mod filter;
mod host;
mod lifecycle;
mod network;
mod push;
#[cfg(test)]
pub(crate) mod testing;

pub use clients::{ClientId, ClientRegistry, Clients, WindowClient};
pub use event::ExtendableEvent;
pub use filter::RequestFilter;
pub use host::{Registration, WorkerHost};
pub use lifecycle::WorkerState;
pub use network::{HttpNetwork, Network};
pub use push::{LogNotifier, Notification, Notifier, PushPayload};

use color_eyre::{eyre::eyre, Result};
use futures::future::join_all;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::{open_storage, CacheSource, CacheStorage, RequestKey};
use crate::config::{Config, WorkerConfig};
use crate::http::{Request, Response};

/// Collaborators the worker talks to.
#[derive(Clone)]
pub struct Services {
  pub storage: Arc<dyn CacheStorage>,
  pub network: Arc<dyn Network>,
  pub notifier: Arc<dyn Notifier>,
  pub clients: Arc<dyn Clients>,
}

impl Services {
  /// Real storage and network for `config`, printing notifications to the
  /// terminal.
  pub fn from_config(config: &Config, clients: Arc<dyn Clients>) -> Result<Self> {
    let scope = config.scope()?;
    let timeout = Duration::from_secs(config.worker.request_timeout_secs);
    Ok(Self {
      storage: open_storage(config)?,
      network: Arc::new(HttpNetwork::new(&scope, timeout)?),
      notifier: Arc::new(LogNotifier),
      clients,
    })
  }
}

/// A response produced by the worker, with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
  pub response: Response,
  pub source: CacheSource,
}

/// What the worker did with an intercepted request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchDisposition {
  /// Not intercepted; the page talks to the network directly
  Passthrough,
  Respond(Served),
  /// Offline with neither the request nor the fallback document cached
  Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedAsset {
  pub url: String,
  pub reason: String,
}

/// Outcome of pre-caching the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
  pub cached: Vec<String>,
  pub failed: Vec<FailedAsset>,
}

impl InstallReport {
  pub fn is_complete(&self) -> bool {
    self.failed.is_empty()
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivateReport {
  /// Stale generations that were deleted
  pub evicted: Vec<String>,
  /// Windows taken over by this worker
  pub claimed: usize,
}

/// Result of clicking a notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
  /// Closed without navigating (no target, or no way to open one)
  Closed,
  Focused(ClientId),
  Opened(WindowClient),
}

struct Inner {
  config: WorkerConfig,
  scope: Url,
  filter: RequestFilter,
  services: Services,
  state: Mutex<WorkerState>,
}

/// One version of the offline worker.
///
/// Cheap to clone; clones share state, which lets fetch handlers move a
/// handle into work that outlives the handler.
#[derive(Clone)]
pub struct CacheWorker {
  inner: Arc<Inner>,
}

impl CacheWorker {
  pub fn new(config: WorkerConfig, scope: Url, services: Services) -> Result<Self> {
    let filter = RequestFilter::from_config(&config)?;
    Ok(Self {
      inner: Arc::new(Inner {
        config,
        scope,
        filter,
        services,
        state: Mutex::new(WorkerState::Parsed),
      }),
    })
  }

  /// The configured version over real storage and network.
  pub fn from_config(config: &Config, clients: Arc<dyn Clients>) -> Result<Self> {
    let services = Services::from_config(config, clients)?;
    Self::new(config.worker.clone(), config.scope()?, services)
  }

  /// Name of the cache generation this version owns.
  pub fn cache_name(&self) -> &str {
    &self.inner.config.cache_name
  }

  pub fn scope(&self) -> &Url {
    &self.inner.scope
  }

  pub fn state(&self) -> WorkerState {
    *self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn storage(&self) -> &Arc<dyn CacheStorage> {
    &self.inner.services.storage
  }

  fn transition(&self, next: WorkerState) -> Result<()> {
    self
      .inner
      .state
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .transition(next)
  }

  /// Resolve a manifest path (or absolute URL) against the scope.
  fn resolve(&self, path: &str) -> Result<Url> {
    self
      .inner
      .scope
      .join(path)
      .map_err(|e| eyre!("Invalid asset path '{}': {}", path, e))
  }

  // ==========================================================================
  // Lifecycle
  // ==========================================================================

  /// Pre-cache every manifest entry into this version's generation.
  ///
  /// Individual failures are logged and reported but never fail the install.
  pub async fn install(&self) -> Result<InstallReport> {
    self.transition(WorkerState::Installing)?;

    let cache_name = self.cache_name();
    match self.storage().open(cache_name) {
      Ok(()) => info!(generation = %cache_name, "Opened cache"),
      Err(e) => warn!(generation = %cache_name, error = %e, "Failed to open cache"),
    }

    let mut report = InstallReport::default();
    let mut requests = Vec::new();
    for path in &self.inner.config.manifest {
      match self.resolve(path) {
        Ok(url) => requests.push(Request::get(url)),
        Err(e) => report.failed.push(FailedAsset {
          url: path.clone(),
          reason: e.to_string(),
        }),
      }
    }

    let results = join_all(requests.iter().map(|r| self.precache(r))).await;

    for (request, result) in requests.iter().zip(results) {
      match result {
        Ok(()) => report.cached.push(request.url.to_string()),
        Err(e) => {
          warn!(url = %request.url, error = %e, "Failed to cache app shell asset");
          report.failed.push(FailedAsset {
            url: request.url.to_string(),
            reason: e.to_string(),
          });
        }
      }
    }

    if report.is_complete() {
      info!(cached = report.cached.len(), "All resources cached");
    } else {
      warn!(
        cached = report.cached.len(),
        failed = report.failed.len(),
        "Failed to cache some resources, continuing install"
      );
    }

    self.transition(WorkerState::Installed)?;
    Ok(report)
  }

  async fn precache(&self, request: &Request) -> Result<()> {
    let response = self.inner.services.network.fetch(request).await?;
    if !response.is_cacheable() {
      return Err(eyre!(
        "Refusing to cache {} response ({}) for {}",
        response.status,
        response.kind.as_str(),
        request.url
      ));
    }
    let key = RequestKey::new(request)?;
    self.storage().put(self.cache_name(), &key, &response)
  }

  /// Evict every other generation, then take control of open windows.
  pub async fn activate(&self) -> Result<ActivateReport> {
    self.transition(WorkerState::Activating)?;

    let current = self.cache_name();
    let mut report = ActivateReport::default();

    match self.storage().keys() {
      Ok(names) => {
        for name in names.into_iter().filter(|n| n != current) {
          info!(generation = %name, "Deleting old cache");
          match self.storage().delete(&name) {
            Ok(true) => report.evicted.push(name),
            Ok(false) => {}
            Err(e) => warn!(generation = %name, error = %e, "Failed to delete old cache"),
          }
        }
      }
      Err(e) => warn!(error = %e, "Failed to enumerate cache generations"),
    }

    info!("Claiming clients");
    match self.inner.services.clients.claim(current).await {
      Ok(claimed) => report.claimed = claimed,
      Err(e) => warn!(error = %e, "Failed to claim clients"),
    }

    self.transition(WorkerState::Activated)?;
    Ok(report)
  }

  /// Adopt an existing generation without installing again.
  ///
  /// Returns false when this version's generation is not on disk.
  pub fn restore(&self) -> Result<bool> {
    if !self.storage().has(self.cache_name())? {
      return Ok(false);
    }
    self.transition(WorkerState::Activated)?;
    debug!(generation = %self.cache_name(), "Restored cache worker");
    Ok(true)
  }

  pub(crate) fn retire(&self) {
    if let Err(e) = self.transition(WorkerState::Redundant) {
      debug!(error = %e, "Worker already retired");
    }
  }

  // ==========================================================================
  // Fetch
  // ==========================================================================

  /// Network first; fall back to the active generation, then to the offline
  /// document. Cache writes are attached to `event`.
  pub async fn handle_fetch(&self, request: &Request, event: &ExtendableEvent) -> FetchDisposition {
    if !RequestFilter::is_eligible(request) {
      return FetchDisposition::Passthrough;
    }

    let exclusion = self
      .inner
      .filter
      .exclusion(request.url.as_str())
      .map(|rule| rule.describe());

    let response = match self.inner.services.network.fetch(request).await {
      Ok(response) => response,
      Err(e) => {
        debug!(url = %request.url, error = %e, "Network request failed, trying cache");
        return self.offline_response(request);
      }
    };

    if !response.is_cacheable() {
      debug!(
        url = %request.url,
        status = response.status,
        kind = response.kind.as_str(),
        "Not caching response"
      );
    } else if let Some(rule) = exclusion {
      debug!(url = %request.url, rule = %rule, "Excluded from cache");
    } else {
      let worker = self.clone();
      let request = request.clone();
      let copy = response.clone();
      event.wait_until(async move {
        if let Err(e) = worker.store(&request, &copy) {
          warn!(url = %request.url, error = %e, "Failed to cache");
        }
      });
    }

    FetchDisposition::Respond(Served {
      response,
      source: CacheSource::Network,
    })
  }

  fn store(&self, request: &Request, response: &Response) -> Result<()> {
    let key = RequestKey::new(request)?;

    if let Some(limit) = self.inner.config.max_cache_bytes {
      let replaced = self
        .storage()
        .match_in(self.cache_name(), &key)?
        .map_or(0, |existing| existing.body.len() as u64);
      let used = self.storage().size(self.cache_name())?.saturating_sub(replaced);
      let incoming = response.body.len() as u64;
      if used.saturating_add(incoming) > limit {
        return Err(eyre!(
          "Cache generation {} would exceed {} bytes ({} used, {} incoming)",
          self.cache_name(),
          limit,
          used,
          incoming
        ));
      }
    }

    self.storage().put(self.cache_name(), &key, response)
  }

  fn lookup(&self, request: &Request) -> Option<Response> {
    let key = RequestKey::new(request).ok()?;
    match self.storage().match_in(self.cache_name(), &key) {
      Ok(found) => found,
      Err(e) => {
        warn!(url = %request.url, error = %e, "Cache lookup failed");
        None
      }
    }
  }

  fn offline_response(&self, request: &Request) -> FetchDisposition {
    if let Some(response) = self.lookup(request) {
      return FetchDisposition::Respond(Served {
        response,
        source: CacheSource::Cache,
      });
    }

    let fallback = match self.resolve(&self.inner.config.offline_fallback) {
      Ok(url) => Request::get(url),
      Err(e) => {
        warn!(error = %e, "Offline fallback path is not a valid URL");
        return FetchDisposition::Failed;
      }
    };

    match self.lookup(&fallback) {
      Some(response) => FetchDisposition::Respond(Served {
        response,
        source: CacheSource::Fallback,
      }),
      None => {
        warn!(url = %request.url, "Offline and no cached fallback document");
        FetchDisposition::Failed
      }
    }
  }

  // ==========================================================================
  // Push
  // ==========================================================================

  /// Turn a push message into a displayed notification.
  ///
  /// Messages without data are ignored.
  pub async fn handle_push(&self, data: Option<&[u8]>) -> Option<Notification> {
    let data = data?;
    let defaults = &self.inner.config.notifications;
    let notification = Notification::from_payload(PushPayload::parse(data, defaults), defaults);

    if let Err(e) = self.inner.services.notifier.show(&notification).await {
      warn!(title = %notification.title, error = %e, "Failed to show notification");
    }

    Some(notification)
  }

  /// Close the notification and bring its target page to the front.
  pub async fn handle_notification_click(&self, notification: &Notification) -> ClickOutcome {
    let services = &self.inner.services;

    if let Err(e) = services.notifier.close(notification).await {
      warn!(error = %e, "Failed to close notification");
    }

    let Some(target) = notification.target_url() else {
      return ClickOutcome::Closed;
    };

    let target = match self.resolve(target) {
      Ok(url) => url.to_string(),
      Err(e) => {
        warn!(error = %e, "Notification target is not a valid URL");
        return ClickOutcome::Closed;
      }
    };

    let windows = services.clients.match_all(true).await.unwrap_or_else(|e| {
      warn!(error = %e, "Failed to list windows");
      Vec::new()
    });

    if let Some(window) = windows.iter().find(|w| w.url == target) {
      match services.clients.focus(window.id).await {
        Ok(()) => return ClickOutcome::Focused(window.id),
        Err(e) => warn!(id = window.id, error = %e, "Failed to focus window"),
      }
    }

    if !services.clients.can_open_window() {
      return ClickOutcome::Closed;
    }

    match services.clients.open_window(&target).await {
      Ok(window) => ClickOutcome::Opened(window),
      Err(e) => {
        warn!(url = %target, error = %e, "Failed to open window");
        ClickOutcome::Closed
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::testing::{html, Harness, ResponseExt, SHELL};
  use super::*;
  use crate::http::{Method, ResponseType};

  #[tokio::test]
  async fn test_install_caches_manifest() {
    let h = Harness::new();
    h.serve_shell();

    let worker = h.worker("v1");
    let report = worker.install().await.unwrap();

    assert!(report.is_complete());
    assert_eq!(report.cached.len(), SHELL.len());
    assert_eq!(worker.state(), WorkerState::Installed);
    assert_eq!(h.storage.entries("v1").unwrap().len(), SHELL.len());
  }

  #[tokio::test]
  async fn test_partial_install_still_activates() {
    let h = Harness::new();
    h.serve_shell();
    h.network.remove("/assets/js/db.js");
    h.network
      .route("/assets/css/style.css", html("/assets/css/style.css", "x").with_status(500));

    let worker = h.worker("v1");
    let report = worker.install().await.unwrap();

    assert_eq!(report.cached.len(), SHELL.len() - 2);
    assert_eq!(report.failed.len(), 2);
    assert_eq!(worker.state(), WorkerState::Installed);

    worker.activate().await.unwrap();
    assert_eq!(worker.state(), WorkerState::Activated);
  }

  #[tokio::test]
  async fn test_install_with_network_down() {
    let h = Harness::new();
    h.network.set_offline(true);

    let worker = h.worker("v1");
    let report = worker.install().await.unwrap();

    assert!(report.cached.is_empty());
    assert_eq!(report.failed.len(), SHELL.len());
    worker.activate().await.unwrap();
    assert!(worker.state().is_active());
  }

  #[tokio::test]
  async fn test_activate_evicts_other_generations_and_claims() {
    let h = Harness::new();
    h.serve_shell();
    h.storage.open("customer-mgr-v0").unwrap();
    h.storage.open("scratch").unwrap();
    h.clients.attach("http://localhost:8080/").unwrap();

    let worker = h.worker("v1");
    worker.install().await.unwrap();
    let report = worker.activate().await.unwrap();

    assert_eq!(report.evicted, vec!["customer-mgr-v0", "scratch"]);
    assert_eq!(report.claimed, 1);
    assert_eq!(h.storage.keys().unwrap(), vec!["v1"]);
  }

  #[tokio::test]
  async fn test_fetch_caches_successful_response() {
    let h = Harness::new();
    h.network.route("/customers.json", html("/customers.json", "[1,2,3]"));
    let worker = h.active_worker("v1").await;

    let request = h.request("/customers.json");
    let event = ExtendableEvent::new();
    let disposition = worker.handle_fetch(&request, &event).await;
    event.settled().await;

    let FetchDisposition::Respond(served) = disposition else {
      panic!("expected a response");
    };
    assert_eq!(served.source, CacheSource::Network);

    let key = RequestKey::new(&request).unwrap();
    let stored = h.storage.match_in("v1", &key).unwrap().unwrap();
    assert_eq!(stored.body, served.response.body);
  }

  #[tokio::test]
  async fn test_fetch_skips_excluded_media() {
    let h = Harness::new();
    h.network.route("/photos/ada.jpg", html("/photos/ada.jpg", "jpeg bytes"));
    let worker = h.active_worker("v1").await;

    let request = h.request("/photos/ada.jpg");
    let event = ExtendableEvent::new();
    let disposition = worker.handle_fetch(&request, &event).await;
    assert_eq!(event.pending(), 0);
    event.settled().await;

    assert!(matches!(disposition, FetchDisposition::Respond(_)));
    let key = RequestKey::new(&request).unwrap();
    assert_eq!(h.storage.match_in("v1", &key).unwrap(), None);
  }

  #[tokio::test]
  async fn test_fetch_does_not_cache_errors_or_cross_origin() {
    let h = Harness::new();
    h.network
      .route("/missing.js", html("/missing.js", "nope").with_status(404));
    h.network.route(
      "/cors.js",
      html("/cors.js", "lib").with_kind(ResponseType::Cors),
    );
    let worker = h.active_worker("v1").await;

    for path in ["/missing.js", "/cors.js"] {
      let request = h.request(path);
      let event = ExtendableEvent::new();
      let disposition = worker.handle_fetch(&request, &event).await;
      event.settled().await;

      let FetchDisposition::Respond(served) = disposition else {
        panic!("expected a response for {}", path);
      };
      assert_eq!(served.source, CacheSource::Network);

      let key = RequestKey::new(&request).unwrap();
      assert_eq!(h.storage.match_in("v1", &key).unwrap(), None);
    }
  }

  #[tokio::test]
  async fn test_non_get_and_non_http_pass_through() {
    let h = Harness::new();
    let worker = h.active_worker("v1").await;
    let before = h.network.calls();
    let event = ExtendableEvent::new();

    let post = Request::new(Method::Post, h.request("/api").url);
    assert_eq!(
      worker.handle_fetch(&post, &event).await,
      FetchDisposition::Passthrough
    );

    let data = Request::parse_get("data:text/plain,hi").unwrap();
    assert_eq!(
      worker.handle_fetch(&data, &event).await,
      FetchDisposition::Passthrough
    );
    assert_eq!(h.network.calls(), before);
  }

  #[tokio::test]
  async fn test_offline_serves_cached_copy() {
    let h = Harness::new();
    h.serve_shell();
    let worker = h.active_worker("v1").await;

    h.network.set_offline(true);
    let event = ExtendableEvent::new();
    let disposition = worker
      .handle_fetch(&h.request("/assets/js/app.js"), &event)
      .await;

    let FetchDisposition::Respond(served) = disposition else {
      panic!("expected a cached response");
    };
    assert_eq!(served.source, CacheSource::Cache);
    assert_eq!(served.response.body, b"/assets/js/app.js".to_vec());
  }

  #[tokio::test]
  async fn test_offline_uncached_serves_fallback() {
    let h = Harness::new();
    h.serve_shell();
    let worker = h.active_worker("v1").await;

    h.network.set_offline(true);
    let event = ExtendableEvent::new();
    let disposition = worker
      .handle_fetch(&h.request("/reports/2024"), &event)
      .await;

    let FetchDisposition::Respond(served) = disposition else {
      panic!("expected the fallback document");
    };
    assert_eq!(served.source, CacheSource::Fallback);
    assert_eq!(served.response.body, b"/fallback.html".to_vec());
  }

  #[tokio::test]
  async fn test_offline_without_fallback_fails() {
    let h = Harness::new();
    h.network.set_offline(true);
    let worker = h.active_worker("v1").await;

    let event = ExtendableEvent::new();
    let disposition = worker.handle_fetch(&h.request("/"), &event).await;
    assert_eq!(disposition, FetchDisposition::Failed);
  }

  #[tokio::test]
  async fn test_fetch_write_respects_size_ceiling() {
    let h = Harness::new();
    h.network
      .route("/big.json", html("/big.json", &"x".repeat(64)));
    h.network.route("/small.json", html("/small.json", "{}"));

    let mut config = h.config("v1");
    config.max_cache_bytes = Some(32);
    let worker = h.worker_with(config);
    worker.install().await.unwrap();
    worker.activate().await.unwrap();

    for path in ["/big.json", "/small.json"] {
      let event = ExtendableEvent::new();
      let disposition = worker.handle_fetch(&h.request(path), &event).await;
      assert!(matches!(disposition, FetchDisposition::Respond(_)));
      event.settled().await;
    }

    let entries = h.storage.entries("v1").unwrap();
    assert!(entries.contains(&"http://localhost:8080/small.json".to_string()));
    assert!(!entries.contains(&"http://localhost:8080/big.json".to_string()));
  }

  #[tokio::test]
  async fn test_refreshed_entry_replaces_within_size_ceiling() {
    let h = Harness::new();
    h.network.route("/a.json", html("/a.json", &"x".repeat(20)));

    let mut config = h.config("v1");
    config.max_cache_bytes = Some(32);
    let worker = h.worker_with(config);
    worker.install().await.unwrap();
    worker.activate().await.unwrap();

    let event = ExtendableEvent::new();
    worker.handle_fetch(&h.request("/a.json"), &event).await;
    event.settled().await;

    h.network.route("/a.json", html("/a.json", &"y".repeat(20)));
    let event = ExtendableEvent::new();
    worker.handle_fetch(&h.request("/a.json"), &event).await;
    event.settled().await;

    h.network.set_offline(true);
    let event = ExtendableEvent::new();
    let disposition = worker.handle_fetch(&h.request("/a.json"), &event).await;

    let FetchDisposition::Respond(served) = disposition else {
      panic!("expected a cached response");
    };
    assert_eq!(served.source, CacheSource::Cache);
    assert_eq!(served.response.body, "y".repeat(20).into_bytes());
    assert_eq!(h.storage.size("v1").unwrap(), 20);
  }

  #[tokio::test]
  async fn test_push_shows_notification() {
    let h = Harness::new();
    let worker = h.active_worker("v1").await;

    let shown = worker
      .handle_push(Some(br#"{"title":"Hi","body":"Test"}"#))
      .await
      .unwrap();

    assert_eq!(shown.title, "Hi");
    assert_eq!(shown.body, "Test");
    assert_eq!(shown.icon, "/assets/icons/icon-192x192.png");
    assert_eq!(h.notifier.shown(), vec![shown]);
  }

  #[tokio::test]
  async fn test_push_text_falls_back() {
    let h = Harness::new();
    let worker = h.active_worker("v1").await;

    let shown = worker.handle_push(Some(b"Update ready")).await.unwrap();
    assert_eq!(shown.title, "New Notification");
    assert_eq!(shown.body, "Update ready");
  }

  #[tokio::test]
  async fn test_push_without_data_is_ignored() {
    let h = Harness::new();
    let worker = h.active_worker("v1").await;

    assert!(worker.handle_push(None).await.is_none());
    assert!(h.notifier.shown().is_empty());
  }

  #[tokio::test]
  async fn test_click_focuses_existing_window() {
    let h = Harness::new();
    let existing = h.clients.attach("http://localhost:8080/customers/7").unwrap();
    let worker = h.active_worker("v1").await;

    let notification = worker
      .handle_push(Some(br#"{"title":"t","body":"b","url":"/customers/7"}"#))
      .await
      .unwrap();
    let outcome = worker.handle_notification_click(&notification).await;

    assert_eq!(outcome, ClickOutcome::Focused(existing));
    assert_eq!(h.notifier.closed(), 1);
  }

  #[tokio::test]
  async fn test_click_opens_window_when_none_match() {
    let h = Harness::with_window_opening(true);
    h.clients.attach("http://localhost:8080/").unwrap();
    let worker = h.active_worker("v1").await;

    let notification = worker
      .handle_push(Some(br#"{"title":"t","body":"b","url":"/customers/9"}"#))
      .await
      .unwrap();

    let ClickOutcome::Opened(window) = worker.handle_notification_click(&notification).await else {
      panic!("expected a new window");
    };
    assert_eq!(window.url, "http://localhost:8080/customers/9");
  }

  #[tokio::test]
  async fn test_click_without_window_support_is_noop() {
    let h = Harness::with_window_opening(false);
    let worker = h.active_worker("v1").await;

    let notification = worker
      .handle_push(Some(br#"{"title":"t","body":"b","url":"/customers/9"}"#))
      .await
      .unwrap();

    assert_eq!(
      worker.handle_notification_click(&notification).await,
      ClickOutcome::Closed
    );
    assert!(h.clients.match_all(true).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_click_without_url_only_closes() {
    let h = Harness::with_window_opening(true);
    let worker = h.active_worker("v1").await;

    let notification = worker.handle_push(Some(b"plain")).await.unwrap();
    assert_eq!(
      worker.handle_notification_click(&notification).await,
      ClickOutcome::Closed
    );
    assert_eq!(h.notifier.closed(), 1);
  }

  #[tokio::test]
  async fn test_restore_requires_generation() {
    let h = Harness::new();
    let worker = h.worker("v1");
    assert!(!worker.restore().unwrap());
    assert_eq!(worker.state(), WorkerState::Parsed);

    h.storage.open("v1").unwrap();
    assert!(worker.restore().unwrap());
    assert!(worker.state().is_active());
  }

  #[tokio::test]
  async fn test_install_twice_is_error() {
    let h = Harness::new();
    let worker = h.worker("v1");
    worker.install().await.unwrap();
    assert!(worker.install().await.is_err());
  }

  #[test]
  fn test_bad_exclusion_pattern_rejected() {
    let h = Harness::new();
    let mut config = h.config("v1");
    config.exclude_patterns = vec!["[".to_string()];
    assert!(CacheWorker::new(config, h.scope(), h.services()).is_err());
  }
}
