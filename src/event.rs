use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::db::Customer;
use crate::worker::Registration;

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Periodic tick for UI refresh
  Tick,
  /// Result of a customer store operation
  Store(StoreEvent),
  /// Progress of the cache worker
  Shell(ShellEvent),
}

#[derive(Debug)]
pub enum StoreEvent {
  Loaded(Vec<Customer>),
  Saved(Customer),
  Deleted(i64),
  Failed(String),
}

/// Summary of one cache generation for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSummary {
  pub name: String,
  pub entries: usize,
  pub bytes: u64,
  pub active: bool,
}

#[derive(Debug)]
pub enum ShellEvent {
  /// Worker is active; `None` when an existing generation was reused
  Ready {
    cache_name: String,
    registration: Option<Registration>,
  },
  Generations(Vec<GenerationSummary>),
  Failed(String),
}

/// Event handler that produces events from terminal input and a tick timer
pub struct EventHandler {
  tx: mpsc::UnboundedSender<Event>,
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler with the given tick rate
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    let input_tx = tx.clone();
    tokio::spawn(async move {
      loop {
        let polled = tokio::task::block_in_place(|| {
          if event::poll(tick_rate).unwrap_or(false) {
            event::read().ok()
          } else {
            None
          }
        });

        let event = match polled {
          // Windows reports releases too
          Some(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => Event::Key(key),
          Some(_) => continue,
          None => Event::Tick,
        };

        if input_tx.send(event).is_err() {
          break;
        }
      }
    });

    Self { tx, rx }
  }

  /// Sender for background tasks to report back on
  pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
    self.tx.clone()
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
