//! In-memory doubles for exercising the worker without I/O.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

use super::{CacheWorker, ClientRegistry, Network, Notification, Notifier, Services};
use crate::cache::MemoryStorage;
use crate::config::WorkerConfig;
use crate::http::{Request, Response, ResponseType};

pub(crate) const ORIGIN: &str = "http://localhost:8080";

/// The default app shell manifest.
pub(crate) const SHELL: &[&str] = &[
  "/",
  "/index.html",
  "/assets/css/style.css",
  "/assets/js/app.js",
  "/assets/js/db.js",
  "/assets/icons/icon-192x192.png",
  "/assets/icons/icon-512x512.png",
  "/fallback.html",
];

/// Same-origin 200 response for `path`.
pub(crate) fn html(path: &str, body: &str) -> Response {
  Response::new(
    format!("{}{}", ORIGIN, path),
    200,
    ResponseType::Basic,
    body.as_bytes().to_vec(),
  )
  .with_header("content-type", "text/html")
}

pub(crate) trait ResponseExt {
  fn with_status(self, status: u16) -> Self;
  fn with_kind(self, kind: ResponseType) -> Self;
}

impl ResponseExt for Response {
  fn with_status(mut self, status: u16) -> Self {
    self.status = status;
    self
  }

  fn with_kind(mut self, kind: ResponseType) -> Self {
    self.kind = kind;
    self
  }
}

/// Serves canned responses by absolute URL; unknown URLs get a 404.
#[derive(Default)]
pub(crate) struct StaticNetwork {
  routes: Mutex<HashMap<String, Response>>,
  offline: AtomicBool,
  calls: AtomicUsize,
}

impl StaticNetwork {
  pub fn route(&self, path: &str, response: Response) {
    self
      .routes
      .lock()
      .unwrap()
      .insert(format!("{}{}", ORIGIN, path), response);
  }

  pub fn remove(&self, path: &str) {
    self
      .routes
      .lock()
      .unwrap()
      .remove(&format!("{}{}", ORIGIN, path));
  }

  pub fn set_offline(&self, offline: bool) {
    self.offline.store(offline, Ordering::SeqCst);
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl Network for StaticNetwork {
  async fn fetch(&self, request: &Request) -> Result<Response> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if self.offline.load(Ordering::SeqCst) {
      return Err(eyre!("network unreachable"));
    }

    let found = self
      .routes
      .lock()
      .unwrap()
      .get(request.url.as_str())
      .cloned();

    Ok(found.unwrap_or_else(|| {
      Response::new(request.url.as_str(), 404, ResponseType::Basic, Vec::new())
    }))
  }
}

#[derive(Default)]
pub(crate) struct RecordingNotifier {
  shown: Mutex<Vec<Notification>>,
  closed: AtomicUsize,
}

impl RecordingNotifier {
  pub fn shown(&self) -> Vec<Notification> {
    self.shown.lock().unwrap().clone()
  }

  pub fn closed(&self) -> usize {
    self.closed.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl Notifier for RecordingNotifier {
  async fn show(&self, notification: &Notification) -> Result<()> {
    self.shown.lock().unwrap().push(notification.clone());
    Ok(())
  }

  async fn close(&self, _notification: &Notification) -> Result<()> {
    self.closed.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }
}

/// Shared doubles plus helpers for building workers over them.
pub(crate) struct Harness {
  pub storage: Arc<MemoryStorage>,
  pub network: Arc<StaticNetwork>,
  pub notifier: Arc<RecordingNotifier>,
  pub clients: Arc<ClientRegistry>,
}

impl Harness {
  pub fn new() -> Self {
    Self::with_window_opening(false)
  }

  pub fn with_window_opening(allow_open: bool) -> Self {
    Self {
      storage: Arc::new(MemoryStorage::new()),
      network: Arc::new(StaticNetwork::default()),
      notifier: Arc::new(RecordingNotifier::default()),
      clients: Arc::new(ClientRegistry::new(allow_open)),
    }
  }

  pub fn scope(&self) -> Url {
    Url::parse(ORIGIN).unwrap()
  }

  pub fn services(&self) -> Services {
    Services {
      storage: self.storage.clone(),
      network: self.network.clone(),
      notifier: self.notifier.clone(),
      clients: self.clients.clone(),
    }
  }

  pub fn config(&self, cache_name: &str) -> WorkerConfig {
    WorkerConfig {
      cache_name: cache_name.to_string(),
      ..WorkerConfig::default()
    }
  }

  pub fn worker(&self, cache_name: &str) -> CacheWorker {
    self.worker_with(self.config(cache_name))
  }

  pub fn worker_with(&self, config: WorkerConfig) -> CacheWorker {
    CacheWorker::new(config, self.scope(), self.services()).unwrap()
  }

  /// Installed and activated worker.
  pub async fn active_worker(&self, cache_name: &str) -> CacheWorker {
    let worker = self.worker(cache_name);
    worker.install().await.unwrap();
    worker.activate().await.unwrap();
    worker
  }

  pub fn request(&self, path: &str) -> Request {
    Request::get(self.scope().join(path).unwrap())
  }

  /// Route every manifest path, each body being the path itself.
  pub fn serve_shell(&self) {
    for path in SHELL {
      self.network.route(path, html(path, path));
    }
  }
}
