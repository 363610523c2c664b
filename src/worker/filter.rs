//! Which requests the worker intercepts, and which responses it may keep.

use color_eyre::{eyre::eyre, Result};
use regex::Regex;

use crate::config::WorkerConfig;
use crate::http::{Method, Request};

/// A single "never cache" rule
#[derive(Debug, Clone)]
pub enum ExclusionRule {
  /// Case-sensitive match on the end of the URL
  Suffix(String),
  /// Regex searched anywhere in the URL
  Pattern(Regex),
}

impl ExclusionRule {
  pub fn matches(&self, url: &str) -> bool {
    match self {
      ExclusionRule::Suffix(suffix) => url.ends_with(suffix.as_str()),
      ExclusionRule::Pattern(re) => re.is_match(url),
    }
  }

  pub fn describe(&self) -> String {
    match self {
      ExclusionRule::Suffix(suffix) => format!("*{}", suffix),
      ExclusionRule::Pattern(re) => format!("/{}/", re.as_str()),
    }
  }
}

/// Ordered rule table, first match wins.
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
  rules: Vec<ExclusionRule>,
}

impl RequestFilter {
  pub fn new(rules: Vec<ExclusionRule>) -> Self {
    Self { rules }
  }

  /// Suffix rules first, then patterns, in configuration order.
  pub fn from_config(config: &WorkerConfig) -> Result<Self> {
    let mut rules: Vec<ExclusionRule> = config
      .exclude_suffixes
      .iter()
      .map(|s| ExclusionRule::Suffix(s.clone()))
      .collect();

    for pattern in &config.exclude_patterns {
      let re = Regex::new(pattern)
        .map_err(|e| eyre!("Invalid exclusion pattern '{}': {}", pattern, e))?;
      rules.push(ExclusionRule::Pattern(re));
    }

    Ok(Self { rules })
  }

  /// Only GET requests over http(s) are intercepted.
  pub fn is_eligible(request: &Request) -> bool {
    request.method == Method::Get && request.is_http()
  }

  /// The first rule matching `url`, if any.
  pub fn exclusion(&self, url: &str) -> Option<&ExclusionRule> {
    self.rules.iter().find(|rule| rule.matches(url))
  }

  pub fn is_excluded(&self, url: &str) -> bool {
    self.exclusion(url).is_some()
  }

  pub fn rules(&self) -> &[ExclusionRule] {
    &self.rules
  }
}
