//! Deployment driver.
//!
//! Packages a buildpack from source, registers it with the platform, pushes
//! generated fixtures against it and tears everything down again. All
//! external work goes through a [`Runner`].
//!
//! Every resource the driver acquires has an explicit release:
//!
//! | Acquired by                     | Released by              |
//! |---------------------------------|--------------------------|
//! | [`Driver::package`]             | [`Driver::cleanup`]      |
//! | [`Driver::deploy`]              | [`Driver::teardown`]     |
//!
//! Both releases are idempotent. A failed deploy deletes whatever it managed
//! to create before returning the error.

mod app;
mod buildpack;

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::HarnessConfig;
use crate::consts::BUILDPACK_SUFFIX;
use crate::exec::{CommandSpec, ExecError, Runner};

pub use app::{DeployOptions, app_name, parse_route, reports_running};
pub use buildpack::{bump_version_string, inject_uri_credentials};

#[derive(Debug, Error)]
pub enum DriverError {
  #[error("failed to clone {buildpack} buildpack: {source}")]
  Clone {
    buildpack: String,
    #[source]
    source: ExecError,
  },

  #[error("failed to package {buildpack} buildpack: {source}")]
  Packaging {
    buildpack: String,
    #[source]
    source: ExecError,
  },

  #[error("no packaged artifact matching {pattern} in {}", dir.display())]
  ArtifactNotFound { dir: PathBuf, pattern: String },

  #[error("failed to register buildpack {name}: {source}")]
  Registration {
    name: String,
    #[source]
    source: ExecError,
  },

  #[error("failed to push {app}: {source}")]
  Push {
    app: String,
    #[source]
    source: ExecError,
  },

  #[error("{app} did not reach a running state within {}s", timeout.as_secs())]
  DeploymentTimeout { app: String, timeout: Duration },

  #[error("failed to fetch logs for {app}: {source}")]
  Logs {
    app: String,
    #[source]
    source: ExecError,
  },

  #[error("failed to delete {resource}: {source}")]
  Teardown {
    resource: String,
    #[source]
    source: ExecError,
  },

  #[error("i/o error at {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to rewrite {}: {message}", path.display())]
  Manifest { path: PathBuf, message: String },
}

/// Whether dependency binaries are bundled into the buildpack artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Caching {
  #[default]
  Cached,
  Uncached,
}

impl Caching {
  pub fn as_str(self) -> &'static str {
    match self {
      Caching::Cached => "cached",
      Caching::Uncached => "uncached",
    }
  }
}

impl std::str::FromStr for Caching {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "cached" => Ok(Caching::Cached),
      "uncached" => Ok(Caching::Uncached),
      other => Err(format!("unknown caching mode '{other}' (expected cached or uncached)")),
    }
  }
}

/// A buildpack built from source and registered with the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedBuildpack {
  /// Source buildpack, e.g. `nodejs`.
  pub buildpack: String,
  /// Registered name, e.g. `nodejs-brat-buildpack`.
  pub name: String,
  pub branch: String,
  pub caching: Caching,
  pub artifact: PathBuf,
  pub clone_dir: PathBuf,
}

/// A live application on the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedApplication {
  pub name: String,
  /// Host (and optional path) the app is routed at, without scheme.
  pub route: String,
  pub fixture_path: PathBuf,
  pub buildpack: String,
  pub stack: String,
  /// Capture log for this app's push, start and recent logs.
  pub log_path: PathBuf,
  /// Name of the bound user-provided service, if any.
  pub service: Option<String>,
  deleted: bool,
}

impl DeployedApplication {
  pub fn new(
    name: impl Into<String>,
    route: impl Into<String>,
    fixture_path: impl Into<PathBuf>,
    buildpack: impl Into<String>,
    stack: impl Into<String>,
    log_path: impl Into<PathBuf>,
  ) -> Self {
    Self {
      name: name.into(),
      route: route.into(),
      fixture_path: fixture_path.into(),
      buildpack: buildpack.into(),
      stack: stack.into(),
      log_path: log_path.into(),
      service: None,
      deleted: false,
    }
  }

  pub fn is_deleted(&self) -> bool {
    self.deleted
  }
}

/// Registered platform name for `buildpack`.
pub fn registered_name(buildpack: &str) -> String {
  format!("{buildpack}-{BUILDPACK_SUFFIX}")
}

/// Drives git, the packager and the platform CLI through a [`Runner`].
#[derive(Debug)]
pub struct Driver<R> {
  config: HarnessConfig,
  runner: R,
}

impl<R: Runner> Driver<R> {
  pub fn new(config: &HarnessConfig, runner: R) -> Self {
    Self {
      config: config.clone(),
      runner,
    }
  }

  pub fn config(&self) -> &HarnessConfig {
    &self.config
  }

  pub fn runner(&self) -> &R {
    &self.runner
  }

  fn cf(&self) -> CommandSpec {
    CommandSpec::new(self.config.cf_bin.as_str())
  }
}

/// Whether a failed delete only reports that the resource is already gone.
fn already_gone(err: &ExecError) -> bool {
  err.output().is_some_and(|output| {
    let output = output.to_lowercase();
    output.contains("not found") || output.contains("does not exist")
  })
}
