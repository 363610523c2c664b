//! The platform side: registration and event dispatch.
//!
//! The host keeps at most one active worker. A new version installs, skips
//! waiting and activates immediately; the version it replaces becomes
//! redundant. Work a handler extends past its return is held here until
//! `idle` is awaited.

use color_eyre::Result;
use std::sync::{Mutex, PoisonError};
use tokio::task::JoinSet;
use tracing::{debug, info};

use super::{
  ActivateReport, CacheWorker, ClickOutcome, ExtendableEvent, FetchDisposition, InstallReport,
  Notification,
};
use crate::http::Request;

/// What a registration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
  pub cache_name: String,
  pub install: InstallReport,
  pub activate: ActivateReport,
}

#[derive(Default)]
pub struct WorkerHost {
  active: Option<CacheWorker>,
  keep_alive: Mutex<JoinSet<()>>,
}

impl WorkerHost {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn active(&self) -> Option<&CacheWorker> {
    self.active.as_ref()
  }

  /// Install and activate `worker`, replacing the current one.
  ///
  /// Registering the version that is already active does nothing and
  /// returns `None`.
  pub async fn register(&mut self, worker: CacheWorker) -> Result<Option<Registration>> {
    if let Some(current) = &self.active {
      if current.cache_name() == worker.cache_name() {
        debug!(generation = %worker.cache_name(), "Worker already active");
        return Ok(None);
      }
    }

    let install = worker.install().await?;

    // skipWaiting: take over without waiting for pages to close. Extended
    // work from the old worker finishes first.
    self.idle().await;
    if let Some(previous) = self.active.take() {
      info!(
        old = %previous.cache_name(),
        new = %worker.cache_name(),
        "Replacing active worker"
      );
      previous.retire();
    }

    let activate = worker.activate().await?;
    info!(generation = %worker.cache_name(), "Worker activated");

    let registration = Registration {
      cache_name: worker.cache_name().to_string(),
      install,
      activate,
    };
    self.active = Some(worker);
    Ok(Some(registration))
  }

  /// Reuse the worker's generation if it already exists, otherwise register.
  pub async fn resume(&mut self, worker: CacheWorker) -> Result<Option<Registration>> {
    if self.active.is_none() && worker.restore()? {
      info!(generation = %worker.cache_name(), "Resumed cache worker");
      self.active = Some(worker);
      return Ok(None);
    }
    self.register(worker).await
  }

  /// Dispatch a request. Without an active worker every request passes
  /// through.
  pub async fn fetch(&self, request: &Request) -> FetchDisposition {
    let Some(worker) = &self.active else {
      return FetchDisposition::Passthrough;
    };

    let event = ExtendableEvent::new();
    let disposition = worker.handle_fetch(request, &event).await;
    self.keep(event);
    disposition
  }

  pub async fn push(&self, data: Option<&[u8]>) -> Option<Notification> {
    self.active.as_ref()?.handle_push(data).await
  }

  pub async fn notification_click(&self, notification: &Notification) -> ClickOutcome {
    match &self.active {
      Some(worker) => worker.handle_notification_click(notification).await,
      None => ClickOutcome::Closed,
    }
  }

  fn keep(&self, event: ExtendableEvent) {
    if event.pending() == 0 {
      return;
    }
    self
      .keep_alive
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .spawn(event.settled());
  }

  /// Wait until every extended event has settled.
  pub async fn idle(&self) {
    let mut pending = std::mem::take(
      &mut *self
        .keep_alive
        .lock()
        .unwrap_or_else(PoisonError::into_inner),
    );
    while pending.join_next().await.is_some() {}
  }
}
