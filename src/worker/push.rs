//! Push payload parsing and notification display.

use async_trait::async_trait;
use color_eyre::Result;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::NotificationConfig;

/// Wire format sent by the push service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushPayload {
  pub title: Option<String>,
  pub body: Option<String>,
  pub icon: Option<String>,
  pub url: Option<String>,
}

impl PushPayload {
  /// Decode a push message, degrading to a text notification when the data
  /// is not a JSON object. Fields of the wrong type count as absent.
  pub fn parse(data: &[u8], defaults: &NotificationConfig) -> Self {
    match serde_json::from_slice::<Value>(data) {
      Ok(Value::Object(fields)) => {
        let field = |name: &str| fields.get(name).and_then(Value::as_str).map(str::to_string);
        PushPayload {
          title: field("title"),
          body: field("body"),
          icon: field("icon"),
          url: field("url"),
        }
      }
      Ok(_) => Self::from_text(data, defaults),
      Err(e) => {
        warn!(error = %e, "Push data not JSON");
        Self::from_text(data, defaults)
      }
    }
  }

  fn from_text(data: &[u8], defaults: &NotificationConfig) -> Self {
    let text = String::from_utf8_lossy(data);
    let body = if text.is_empty() {
      defaults.default_body.clone()
    } else {
      text.into_owned()
    };
    PushPayload {
      title: Some(defaults.default_title.clone()),
      body: Some(body),
      icon: Some(defaults.default_icon.clone()),
      url: None,
    }
  }
}

/// Metadata attached to a notification for click handling
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationData {
  pub url: String,
}

/// A notification ready to be shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
  pub title: String,
  pub body: String,
  pub icon: String,
  pub badge: String,
  pub data: Option<NotificationData>,
}

impl Notification {
  pub fn from_payload(payload: PushPayload, defaults: &NotificationConfig) -> Self {
    Self {
      title: payload
        .title
        .unwrap_or_else(|| defaults.default_title.clone()),
      body: payload
        .body
        .unwrap_or_else(|| defaults.default_body.clone()),
      icon: payload
        .icon
        .filter(|icon| !icon.is_empty())
        .unwrap_or_else(|| defaults.default_icon.clone()),
      badge: defaults.badge.clone(),
      data: payload
        .url
        .filter(|url| !url.is_empty())
        .map(|url| NotificationData { url }),
    }
  }

  pub fn target_url(&self) -> Option<&str> {
    self.data.as_ref().map(|d| d.url.as_str())
  }
}

/// Displays system notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
  async fn show(&self, notification: &Notification) -> Result<()>;

  async fn close(&self, notification: &Notification) -> Result<()>;
}

/// Notifier for terminal use: prints to stdout and logs.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
  async fn show(&self, notification: &Notification) -> Result<()> {
    info!(title = %notification.title, "Showing notification");
    println!("[{}] {}", notification.title, notification.body);
    if let Some(url) = notification.target_url() {
      println!("  -> {}", url);
    }
    Ok(())
  }

  async fn close(&self, notification: &Notification) -> Result<()> {
    info!(title = %notification.title, "Closing notification");
    Ok(())
  }
}
