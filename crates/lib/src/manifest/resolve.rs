//! Remote manifest fetching.

use tracing::{debug, info};

use super::{DependencyManifest, ManifestError};
use crate::config::HarnessConfig;

/// URL of the manifest for `buildpack` at `branch` under `base_url`.
pub fn manifest_url(base_url: &str, buildpack: &str, branch: &str) -> String {
  format!("{}/{buildpack}-buildpack/{branch}/manifest.yml", base_url.trim_end_matches('/'))
}

/// Fetches manifests over HTTP.
///
/// Every call re-fetches; nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct ManifestResolver {
  base_url: String,
  client: reqwest::Client,
}

impl ManifestResolver {
  pub fn new(config: &HarnessConfig) -> Self {
    Self::with_base_url(&config.manifest_base_url)
  }

  pub fn with_base_url(base_url: &str) -> Self {
    Self {
      base_url: base_url.to_string(),
      client: reqwest::Client::new(),
    }
  }

  /// Fetch and parse the manifest for `(buildpack, branch)`.
  pub async fn resolve(&self, buildpack: &str, branch: &str) -> Result<DependencyManifest, ManifestError> {
    let url = manifest_url(&self.base_url, buildpack, branch);
    info!(url = %url, "fetching manifest");

    let response = self
      .client
      .get(&url)
      .send()
      .await
      .map_err(|source| ManifestError::Network {
        url: url.clone(),
        source,
      })?;

    let status = response.status();
    if !status.is_success() {
      return Err(ManifestError::Status {
        url,
        status: status.as_u16(),
      });
    }

    let body = response.text().await.map_err(|source| ManifestError::Network {
      url: url.clone(),
      source,
    })?;
    debug!(url = %url, bytes = body.len(), "manifest downloaded");

    let manifest = DependencyManifest::parse(&body)?;
    debug!(entries = manifest.entries().len(), "manifest parsed");
    Ok(manifest)
  }
}
