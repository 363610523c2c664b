use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Origin the app shell is served from (also the worker scope)
  pub origin: String,
  /// Where databases and logs live (defaults to $XDG_DATA_HOME/custmgr)
  pub data_dir: Option<PathBuf>,
  pub cache: CacheConfig,
  pub worker: WorkerConfig,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      origin: "http://localhost:8080".to_string(),
      data_dir: None,
      cache: CacheConfig::default(),
      worker: WorkerConfig::default(),
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  pub backend: CacheBackend,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
  /// Persistent cache in the data directory
  #[default]
  Sqlite,
  /// Cache discarded when the process exits
  Memory,
  /// Caching disabled - every lookup misses
  #[serde(rename = "none")]
  Disabled,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
  /// Name of the cache generation this worker version owns
  pub cache_name: String,
  /// App shell paths pre-cached on install, resolved against the origin
  pub manifest: Vec<String>,
  /// Document served when offline and the request is not cached
  pub offline_fallback: String,
  /// URL suffixes never written to cache at fetch time (case-sensitive)
  pub exclude_suffixes: Vec<String>,
  /// Regexes never written to cache at fetch time, checked after suffixes
  pub exclude_patterns: Vec<String>,
  /// Ceiling for fetch-time cache growth (mobile storage quotas)
  pub max_cache_bytes: Option<u64>,
  pub request_timeout_secs: u64,
  pub notifications: NotificationConfig,
}

/// Large-media formats kept out of the cache.
pub const DEFAULT_EXCLUDED_SUFFIXES: &[&str] = &[
  ".jpg", ".jpeg", ".png", ".gif", ".mp4", ".mov", ".pdf", ".zip", ".rar", ".avi", ".mp3",
];

impl Default for WorkerConfig {
  fn default() -> Self {
    Self {
      cache_name: "customer-mgr-v1".to_string(),
      manifest: [
        "/",
        "/index.html",
        "/assets/css/style.css",
        "/assets/js/app.js",
        "/assets/js/db.js",
        "/assets/icons/icon-192x192.png",
        "/assets/icons/icon-512x512.png",
        "/fallback.html",
      ]
      .iter()
      .map(|s| s.to_string())
      .collect(),
      offline_fallback: "/fallback.html".to_string(),
      exclude_suffixes: DEFAULT_EXCLUDED_SUFFIXES
        .iter()
        .map(|s| s.to_string())
        .collect(),
      exclude_patterns: Vec::new(),
      max_cache_bytes: Some(45 * 1024 * 1024),
      request_timeout_secs: 10,
      notifications: NotificationConfig::default(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
  pub default_title: String,
  pub default_body: String,
  pub default_icon: String,
  pub badge: String,
}

impl Default for NotificationConfig {
  fn default() -> Self {
    Self {
      default_title: "New Notification".to_string(),
      default_body: "You have new updates".to_string(),
      default_icon: "/assets/icons/icon-192x192.png".to_string(),
      badge: "/assets/icons/icon-72x72.png".to_string(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./custmgr.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/custmgr/config.yaml
  ///
  /// Falls back to built-in defaults when no file is found.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };

    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("custmgr.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("custmgr").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))
  }

  /// Check invariants the worker relies on.
  pub fn validate(&self) -> Result<()> {
    let scope = self.scope()?;
    if !matches!(scope.scheme(), "http" | "https") {
      return Err(eyre!("Origin must be an http(s) URL, got {}", self.origin));
    }

    if self.worker.cache_name.trim().is_empty() {
      return Err(eyre!("worker.cache_name must not be empty"));
    }

    if !self
      .worker
      .manifest
      .iter()
      .any(|p| p == &self.worker.offline_fallback)
    {
      return Err(eyre!(
        "worker.manifest must include the offline fallback document {}",
        self.worker.offline_fallback
      ));
    }

    for pattern in &self.worker.exclude_patterns {
      regex::Regex::new(pattern)
        .map_err(|e| eyre!("Invalid exclusion pattern '{}': {}", pattern, e))?;
    }

    Ok(())
  }

  /// The worker scope: the origin as a URL.
  pub fn scope(&self) -> Result<Url> {
    Url::parse(&self.origin).map_err(|e| eyre!("Invalid origin '{}': {}", self.origin, e))
  }

  /// Directory for databases and log files.
  pub fn data_dir(&self) -> Result<PathBuf> {
    if let Some(dir) = &self.data_dir {
      return Ok(dir.clone());
    }

    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("custmgr"))
  }

  pub fn customers_db_path(&self) -> Result<PathBuf> {
    Ok(self.data_dir()?.join("customers.db"))
  }

  pub fn shell_cache_path(&self) -> Result<PathBuf> {
    Ok(self.data_dir()?.join("shell-cache.db"))
  }

  pub fn log_dir(&self) -> Result<PathBuf> {
    Ok(self.data_dir()?.join("logs"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults_are_valid() {
    let config = Config::default();
    config.validate().unwrap();
    assert_eq!(config.worker.cache_name, "customer-mgr-v1");
    assert!(config
      .worker
      .manifest
      .contains(&config.worker.offline_fallback));
    assert_eq!(config.cache.backend, CacheBackend::Sqlite);
  }

  #[test]
  fn test_partial_yaml_keeps_defaults() {
    let config = Config::from_yaml(
      r#"
origin: "https://customers.example.com"
cache:
  backend: none
worker:
  cache_name: customer-mgr-v2
  notifications:
    default_title: "Heads up"
"#,
    )
    .unwrap();

    config.validate().unwrap();
    assert_eq!(config.origin, "https://customers.example.com");
    assert_eq!(config.cache.backend, CacheBackend::Disabled);
    assert_eq!(config.worker.cache_name, "customer-mgr-v2");
    assert_eq!(config.worker.notifications.default_title, "Heads up");
    assert_eq!(
      config.worker.notifications.default_body,
      "You have new updates"
    );
    assert_eq!(config.worker.offline_fallback, "/fallback.html");
  }

  #[test]
  fn test_manifest_must_include_fallback() {
    let config = Config::from_yaml(
      r#"
worker:
  manifest: ["/", "/index.html"]
"#,
    )
    .unwrap();
    assert!(config.validate().is_err());
  }

  #[test]
  fn test_rejects_non_http_origin() {
    let config = Config {
      origin: "file:///srv/app".to_string(),
      ..Config::default()
    };
    assert!(config.validate().is_err());
  }

  #[test]
  fn test_rejects_bad_pattern() {
    let mut config = Config::default();
    config.worker.exclude_patterns = vec!["(unclosed".to_string()];
    assert!(config.validate().is_err());
  }

  #[test]
  fn test_explicit_missing_path_is_error() {
    assert!(Config::load(Some(Path::new("/definitely/not/here.yaml"))).is_err());
  }

  #[test]
  fn test_data_dir_override() {
    let config = Config {
      data_dir: Some(PathBuf::from("/tmp/custmgr-test")),
      ..Config::default()
    };
    assert_eq!(
      config.customers_db_path().unwrap(),
      PathBuf::from("/tmp/custmgr-test/customers.db")
    );
  }
}
