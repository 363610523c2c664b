//! Event lifetime extension.
//!
//! A handler that starts asynchronous work after producing its result (the
//! cache write behind a fetch response, for example) hands that work to
//! `wait_until`. The host keeps the event alive until `settled` resolves.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use tokio::task::JoinSet;
use tracing::warn;

#[derive(Default)]
pub struct ExtendableEvent {
  pending: Mutex<JoinSet<()>>,
}

impl ExtendableEvent {
  pub fn new() -> Self {
    Self::default()
  }

  /// Extend the event's lifetime until `work` completes.
  pub fn wait_until<F>(&self, work: F)
  where
    F: Future<Output = ()> + Send + 'static,
  {
    self
      .pending
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .spawn(work);
  }

  /// Number of extensions still running
  pub fn pending(&self) -> usize {
    self
      .pending
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .len()
  }

  /// Wait for every extension to finish.
  pub async fn settled(self) {
    let mut pending = self
      .pending
      .into_inner()
      .unwrap_or_else(PoisonError::into_inner);

    while let Some(result) = pending.join_next().await {
      if let Err(e) = result {
        warn!(error = %e, "Extended event work did not complete");
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;
  use std::time::Duration;

  #[tokio::test]
  async fn test_settled_waits_for_all_work() {
    let counter = Arc::new(AtomicU32::new(0));
    let event = ExtendableEvent::new();

    for delay in [20u64, 5, 10] {
      let counter = counter.clone();
      event.wait_until(async move {
        tokio::time::sleep(Duration::from_millis(delay)).await;
        counter.fetch_add(1, Ordering::SeqCst);
      });
    }

    event.settled().await;
    assert_eq!(counter.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn test_panicking_work_is_contained() {
    let event = ExtendableEvent::new();
    event.wait_until(async { panic!("boom") });
    event.wait_until(async {});
    event.settled().await;
  }

  #[tokio::test]
  async fn test_no_work_settles_immediately() {
    let event = ExtendableEvent::new();
    assert_eq!(event.pending(), 0);
    event.settled().await;
  }
}
