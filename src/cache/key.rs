//! Request keys for cache generations.

use color_eyre::{eyre::eyre, Result};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::http::{Method, Request};

/// Identifies one stored asset: normalized URL plus method (always GET).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
  method: Method,
  url: String,
}

impl RequestKey {
  /// Build the key for a request. Only GET requests can be cached.
  pub fn new(request: &Request) -> Result<Self> {
    if request.method != Method::Get {
      return Err(eyre!(
        "Only GET requests can be cached, got {} {}",
        request.method,
        request.url
      ));
    }

    let mut url = request.url.clone();
    url.set_fragment(None);

    Ok(Self {
      method: request.method,
      url: url.to_string(),
    })
  }

  pub fn url(&self) -> &str {
    &self.url
  }

  pub fn method(&self) -> Method {
    self.method
  }

  /// SHA256 hash for stable, fixed-length storage keys
  pub fn cache_hash(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.method.as_str().as_bytes());
    hasher.update(b" ");
    hasher.update(self.url.as_bytes());
    hex::encode(hasher.finalize())
  }
}

impl fmt::Display for RequestKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.method, self.url)
  }
}
