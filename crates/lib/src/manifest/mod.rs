//! Buildpack dependency manifests.
//!
//! A buildpack's `manifest.yml` lists every dependency artifact it can
//! install, scoped to the stacks it was built for. The harness uses it as the
//! single source of truth for which versions must be tested.
//!
//! - [`DependencyManifest::parse`] turns YAML into entries (manifest order kept).
//! - [`DependencyManifest::filter`] selects versions by dependency name and stack.
//! - [`resolve`] fetches a manifest for a `(buildpack, branch)` pair.

mod resolve;

use serde::Deserialize;
use thiserror::Error;

use crate::version::{Version, deserialize_version_string, major_minor};

pub use resolve::{ManifestResolver, manifest_url};

/// Errors that can occur while fetching or parsing a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
  /// The remote document could not be reached.
  #[error("failed to fetch manifest from {url}: {source}")]
  Network {
    url: String,
    #[source]
    source: reqwest::Error,
  },

  /// The remote answered with a non-success status.
  #[error("manifest request to {url} returned HTTP {status}")]
  Status { url: String, status: u16 },

  /// The document is not valid YAML or does not have the expected shape.
  #[error("failed to parse manifest: {0}")]
  Parse(#[from] serde_yaml::Error),

  /// The document parsed but has no `dependencies` key.
  #[error("manifest has no 'dependencies' key")]
  MissingDependencies,
}

/// End-of-life metadata attached to a dependency line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Deprecation {
  pub name: String,
  #[serde(deserialize_with = "deserialize_version_string")]
  pub version_line: String,
  #[serde(default)]
  pub date: Option<String>,
  #[serde(default)]
  pub link: Option<String>,
}

impl Deprecation {
  /// Whether this deprecation line covers `version`.
  ///
  /// `version_line` is either `2.3.x` style or a plain `major.minor` prefix.
  pub fn covers(&self, version: &str) -> bool {
    let line = self.version_line.trim_end_matches(".x");
    if line.is_empty() {
      return false;
    }
    version == line || version.starts_with(&format!("{line}.")) || major_minor(version) == line
  }
}

/// One installable artifact for one or more stacks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DependencyEntry {
  pub name: String,
  #[serde(deserialize_with = "deserialize_version_string")]
  pub version: String,
  pub cf_stacks: Vec<String>,
  pub uri: String,
  #[serde(default)]
  pub md5: Option<String>,
  #[serde(default)]
  pub sha256: Option<String>,
  #[serde(skip)]
  pub deprecation: Option<Deprecation>,
}

impl DependencyEntry {
  pub fn supports_stack(&self, stack: &str) -> bool {
    self.cf_stacks.iter().any(|s| s == stack)
  }

  /// Parsed form of `version`, if it is numeric enough to order.
  pub fn parsed_version(&self) -> Option<Version> {
    Version::parse(&self.version).ok()
  }
}

#[derive(Debug, Deserialize)]
struct RawManifest {
  #[serde(default)]
  dependencies: Option<Vec<DependencyEntry>>,
  #[serde(default)]
  dependency_deprecation_dates: Vec<Deprecation>,
}

/// The ordered dependency list of one buildpack manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyManifest {
  entries: Vec<DependencyEntry>,
}

impl DependencyManifest {
  pub fn new(entries: Vec<DependencyEntry>) -> Self {
    Self { entries }
  }

  /// Parse a manifest document.
  ///
  /// Keys other than `dependencies` and `dependency_deprecation_dates` are
  /// ignored. Deprecation lines are attached to the entries they cover.
  pub fn parse(document: &str) -> Result<Self, ManifestError> {
    let raw: RawManifest = serde_yaml::from_str(document)?;
    let mut entries = raw.dependencies.ok_or(ManifestError::MissingDependencies)?;

    for entry in &mut entries {
      entry.deprecation = raw
        .dependency_deprecation_dates
        .iter()
        .find(|d| d.name == entry.name && d.covers(&entry.version))
        .cloned();
    }

    Ok(Self { entries })
  }

  pub fn entries(&self) -> &[DependencyEntry] {
    &self.entries
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Versions of `name` available on `stack`, in manifest order.
  ///
  /// No match is an empty result, not an error.
  pub fn filter(&self, name: &str, stack: &str) -> Vec<String> {
    self
      .matching(name, stack)
      .map(|entry| entry.version.clone())
      .collect()
  }

  /// Alias of [`filter`](Self::filter).
  pub fn versions(&self, name: &str, stack: &str) -> Vec<String> {
    self.filter(name, stack)
  }

  /// Entries of `name` available on `stack`, in manifest order.
  pub fn matching<'a>(&'a self, name: &'a str, stack: &'a str) -> impl Iterator<Item = &'a DependencyEntry> + 'a {
    self
      .entries
      .iter()
      .filter(move |entry| entry.name == name && entry.supports_stack(stack))
  }

  /// Every entry available on `stack`, in manifest order.
  pub fn entries_for_stack<'a>(&'a self, stack: &'a str) -> impl Iterator<Item = &'a DependencyEntry> + 'a {
    self.entries.iter().filter(move |entry| entry.supports_stack(stack))
  }

  /// First entry named `name`, on any stack.
  pub fn find(&self, name: &str) -> Option<&DependencyEntry> {
    self.entries.iter().find(|entry| entry.name == name)
  }

  /// Highest version of `name` on `stack`. Unparseable versions are skipped.
  pub fn latest(&self, name: &str, stack: &str) -> Option<String> {
    self
      .matching(name, stack)
      .filter_map(|entry| entry.parsed_version())
      .max()
      .map(|version| version.to_string())
  }

  /// Lowest version of `name` on `stack`. Unparseable versions are skipped.
  pub fn oldest(&self, name: &str, stack: &str) -> Option<String> {
    self
      .matching(name, stack)
      .filter_map(|entry| entry.parsed_version())
      .min()
      .map(|version| version.to_string())
  }
}
