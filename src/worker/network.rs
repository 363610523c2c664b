use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use std::time::Duration;
use url::{Origin, Url};

use crate::http::{Method, Request, Response, ResponseType};

/// Where the worker sends real requests.
///
/// `Err` means the request never produced a response (offline, DNS failure,
/// timeout). HTTP error statuses come back as `Ok`.
#[async_trait]
pub trait Network: Send + Sync {
  async fn fetch(&self, request: &Request) -> Result<Response>;
}

/// `reqwest`-backed network access.
#[derive(Clone)]
pub struct HttpNetwork {
  client: reqwest::Client,
  scope_origin: Origin,
}

impl HttpNetwork {
  pub fn new(scope: &Url, timeout: Duration) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      client,
      scope_origin: scope.origin(),
    })
  }

  /// Same-origin responses are `basic`; anything else is readable `cors`.
  fn classify(&self, final_url: &Url) -> ResponseType {
    if final_url.origin() == self.scope_origin {
      ResponseType::Basic
    } else {
      ResponseType::Cors
    }
  }
}

fn to_reqwest(method: Method) -> reqwest::Method {
  match method {
    Method::Get => reqwest::Method::GET,
    Method::Head => reqwest::Method::HEAD,
    Method::Post => reqwest::Method::POST,
    Method::Put => reqwest::Method::PUT,
    Method::Patch => reqwest::Method::PATCH,
    Method::Delete => reqwest::Method::DELETE,
    Method::Options => reqwest::Method::OPTIONS,
  }
}

#[async_trait]
impl Network for HttpNetwork {
  async fn fetch(&self, request: &Request) -> Result<Response> {
    let response = self
      .client
      .request(to_reqwest(request.method), request.url.clone())
      .send()
      .await
      .map_err(|e| eyre!("Request to {} failed: {}", request.url, e))?;

    let final_url = response.url().clone();
    let status = response.status().as_u16();
    let headers = response
      .headers()
      .iter()
      .filter_map(|(name, value)| {
        value
          .to_str()
          .ok()
          .map(|v| (name.as_str().to_string(), v.to_string()))
      })
      .collect();

    let body = response
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read body from {}: {}", final_url, e))?;

    Ok(Response {
      kind: self.classify(&final_url),
      url: final_url.to_string(),
      status,
      headers,
      body: body.to_vec(),
    })
  }
}
