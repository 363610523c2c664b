//! Minimal request/response model shared by the worker, its network seam and
//! the cache storage backends.

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// HTTP request method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
  Get,
  Head,
  Post,
  Put,
  Patch,
  Delete,
  Options,
}

impl Method {
  pub fn as_str(&self) -> &'static str {
    match self {
      Method::Get => "GET",
      Method::Head => "HEAD",
      Method::Post => "POST",
      Method::Put => "PUT",
      Method::Patch => "PATCH",
      Method::Delete => "DELETE",
      Method::Options => "OPTIONS",
    }
  }
}

impl fmt::Display for Method {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Method {
  type Err = color_eyre::Report;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_ascii_uppercase().as_str() {
      "GET" => Ok(Method::Get),
      "HEAD" => Ok(Method::Head),
      "POST" => Ok(Method::Post),
      "PUT" => Ok(Method::Put),
      "PATCH" => Ok(Method::Patch),
      "DELETE" => Ok(Method::Delete),
      "OPTIONS" => Ok(Method::Options),
      other => Err(eyre!("Unsupported HTTP method: {}", other)),
    }
  }
}

/// An outgoing request as seen by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
  pub method: Method,
  pub url: Url,
}

impl Request {
  pub fn new(method: Method, url: Url) -> Self {
    Self { method, url }
  }

  pub fn get(url: Url) -> Self {
    Self::new(Method::Get, url)
  }

  /// Parse an absolute URL into a GET request.
  pub fn parse_get(url: &str) -> Result<Self> {
    let url = Url::parse(url).map_err(|e| eyre!("Invalid URL '{}': {}", url, e))?;
    Ok(Self::get(url))
  }

  /// Whether the URL uses the http or https scheme.
  pub fn is_http(&self) -> bool {
    matches!(self.url.scheme(), "http" | "https")
  }
}

/// Mirrors the fetch `Response.type` classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
  /// Same-origin response
  Basic,
  /// Cross-origin response readable by the page
  Cors,
  /// Cross-origin response with hidden contents
  Opaque,
  /// Network error placeholder
  Error,
}

impl ResponseType {
  pub fn as_str(&self) -> &'static str {
    match self {
      ResponseType::Basic => "basic",
      ResponseType::Cors => "cors",
      ResponseType::Opaque => "opaque",
      ResponseType::Error => "error",
    }
  }
}

impl FromStr for ResponseType {
  type Err = color_eyre::Report;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "basic" => Ok(ResponseType::Basic),
      "cors" => Ok(ResponseType::Cors),
      "opaque" => Ok(ResponseType::Opaque),
      "error" => Ok(ResponseType::Error),
      other => Err(eyre!("Unknown response type: {}", other)),
    }
  }
}

/// A fully buffered response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
  /// Final URL after redirects
  pub url: String,
  pub status: u16,
  pub kind: ResponseType,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
}

impl Response {
  pub fn new(url: impl Into<String>, status: u16, kind: ResponseType, body: Vec<u8>) -> Self {
    Self {
      url: url.into(),
      status,
      kind,
      headers: Vec::new(),
      body,
    }
  }

  pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.headers.push((name.into(), value.into()));
    self
  }

  /// Only a 200 from the same origin may be written to a cache generation.
  pub fn is_cacheable(&self) -> bool {
    self.status == 200 && self.kind == ResponseType::Basic
  }

  /// Case-insensitive header lookup.
  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(k, _)| k.eq_ignore_ascii_case(name))
      .map(|(_, v)| v.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_method_parse_is_case_insensitive() {
    assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
    assert_eq!("Post".parse::<Method>().unwrap(), Method::Post);
    assert!("BREW".parse::<Method>().is_err());
  }

  #[test]
  fn test_is_http() {
    assert!(Request::parse_get("https://example.com/").unwrap().is_http());
    assert!(Request::parse_get("http://localhost:8080/a").unwrap().is_http());
    assert!(!Request::parse_get("data:text/plain,hi").unwrap().is_http());
    assert!(!Request::parse_get("chrome-extension://abc/x.js")
      .unwrap()
      .is_http());
  }

  #[test]
  fn test_is_cacheable() {
    let ok = Response::new("http://a/", 200, ResponseType::Basic, vec![]);
    assert!(ok.is_cacheable());

    let not_found = Response::new("http://a/", 404, ResponseType::Basic, vec![]);
    assert!(!not_found.is_cacheable());

    let cross = Response::new("http://b/", 200, ResponseType::Cors, vec![]);
    assert!(!cross.is_cacheable());

    let opaque = Response::new("http://b/", 0, ResponseType::Opaque, vec![]);
    assert!(!opaque.is_cacheable());
  }

  #[test]
  fn test_header_lookup() {
    let resp = Response::new("http://a/", 200, ResponseType::Basic, vec![])
      .with_header("Content-Type", "text/html");
    assert_eq!(resp.header("content-type"), Some("text/html"));
    assert_eq!(resp.header("etag"), None);
  }
}
