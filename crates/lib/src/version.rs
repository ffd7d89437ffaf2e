//! Parsed dependency versions.
//!
//! Manifest versions are "semantic-version-like" but not strict SemVer:
//! `1.7` (no patch), `9.1.2.0` (four components), `1.0.0-preview2-003121`
//! and `2.2.0.pre1` all occur. [`Version`] keeps the numeric components and an
//! optional pre-release tag so "latest", "oldest" and family lookups are well
//! defined instead of relying on string comparison.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
  #[error("version '{0}' does not start with a number")]
  Invalid(String),
}

/// A dependency version with defined ordering.
///
/// Equality follows ordering: `1.7` and `1.7.0` are equal.
#[derive(Debug, Clone)]
pub struct Version {
  components: Vec<u64>,
  pre: Option<String>,
  raw: String,
}

impl Version {
  pub fn parse(input: &str) -> Result<Self, VersionError> {
    let trimmed = input.trim();
    let body = trimmed.strip_prefix('v').unwrap_or(trimmed);

    let (numeric, mut pre) = match body.split_once('-') {
      Some((numeric, tag)) => (numeric, Some(tag.to_string())),
      None => (body, None),
    };

    let mut components = Vec::new();
    let mut parts = numeric.split('.');
    while let Some(part) = parts.next() {
      let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
      if digits.len() == part.len() && !digits.is_empty() {
        components.push(digits.parse().map_err(|_| VersionError::Invalid(input.to_string()))?);
        continue;
      }

      // First non-numeric component: it and everything after it form the tag.
      if !digits.is_empty() {
        components.push(digits.parse().map_err(|_| VersionError::Invalid(input.to_string()))?);
      }
      let mut tag: Vec<&str> = vec![&part[digits.len()..]];
      tag.extend(parts.by_ref());
      let tag = tag.join(".");
      let tag = tag.trim_start_matches('.').to_string();
      pre = Some(match pre {
        Some(rest) => format!("{tag}-{rest}"),
        None => tag,
      });
      break;
    }

    if components.is_empty() {
      return Err(VersionError::Invalid(input.to_string()));
    }

    Ok(Self {
      components,
      pre: pre.filter(|p| !p.is_empty()),
      raw: trimmed.to_string(),
    })
  }

  pub fn major(&self) -> u64 {
    self.component(0)
  }

  pub fn minor(&self) -> u64 {
    self.component(1)
  }

  pub fn patch(&self) -> u64 {
    self.component(2)
  }

  pub fn pre(&self) -> Option<&str> {
    self.pre.as_deref()
  }

  pub fn components(&self) -> &[u64] {
    &self.components
  }

  /// The `major.minor` family this version belongs to.
  pub fn family(&self) -> String {
    major_minor(&self.raw)
  }

  /// The version exactly as it appeared in the manifest.
  pub fn as_str(&self) -> &str {
    &self.raw
  }

  fn component(&self, index: usize) -> u64 {
    self.components.get(index).copied().unwrap_or(0)
  }
}

impl Ord for Version {
  fn cmp(&self, other: &Self) -> Ordering {
    let len = self.components.len().max(other.components.len());
    for i in 0..len {
      match self.component(i).cmp(&other.component(i)) {
        Ordering::Equal => {}
        ord => return ord,
      }
    }

    match (&self.pre, &other.pre) {
      (None, None) => Ordering::Equal,
      (None, Some(_)) => Ordering::Greater,
      (Some(_), None) => Ordering::Less,
      (Some(a), Some(b)) => a.cmp(b),
    }
  }
}

impl PartialOrd for Version {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl PartialEq for Version {
  fn eq(&self, other: &Self) -> bool {
    self.cmp(other) == Ordering::Equal
  }
}

impl Eq for Version {}

impl FromStr for Version {
  type Err = VersionError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s)
  }
}

impl fmt::Display for Version {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.raw)
  }
}

/// Truncate a version string to its `major.minor` family.
///
/// Total: `"5.6.40"` -> `"5.6"`, `"v7.1.2"` -> `"7.1"`, a single component is
/// returned as-is and the empty string maps to itself.
pub fn major_minor(version: &str) -> String {
  let trimmed = version.trim();
  let body = trimmed.strip_prefix('v').unwrap_or(trimmed);
  body.split('.').take(2).collect::<Vec<_>>().join(".")
}

/// Deserialize a version scalar that YAML may have typed as a number.
///
/// `version: 1.6` arrives as a float; it is kept in its display form.
pub fn deserialize_version_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
  }

  Ok(match Scalar::deserialize(deserializer)? {
    Scalar::Str(s) => s,
    Scalar::Int(i) => i.to_string(),
    Scalar::Float(f) => f.to_string(),
  })
}
