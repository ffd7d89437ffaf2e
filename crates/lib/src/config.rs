//! Harness configuration.
//!
//! Everything that used to be ambient process state (branch, stacks, the
//! `cf` binary, working directories) lives in one `HarnessConfig` record that
//! is built once and handed to the resolver, generator, driver and observer.
//! Environment variables are read only by [`HarnessConfig::from_env`].

use std::path::PathBuf;
use std::time::Duration;

use crate::consts::APP_NAME;

pub const ENV_BRANCH: &str = "BRATS_BRANCH";
pub const ENV_STACKS: &str = "BRATS_STACKS";
pub const ENV_MANIFEST_BASE_URL: &str = "BRATS_MANIFEST_BASE_URL";
pub const ENV_GITHUB_BASE_URL: &str = "BRATS_GITHUB_BASE_URL";
pub const ENV_CF_BIN: &str = "BRATS_CF_BIN";
pub const ENV_WORK_DIR: &str = "BRATS_WORK_DIR";
pub const ENV_FIXTURES_DIR: &str = "BRATS_FIXTURES_DIR";
pub const ENV_LOG_DIR: &str = "BRATS_LOG_DIR";

pub const DEFAULT_BRANCH: &str = "master";
pub const DEFAULT_STACK: &str = "cflinuxfs2";
pub const DEFAULT_MANIFEST_BASE_URL: &str = "https://raw.githubusercontent.com/cloudfoundry";
pub const DEFAULT_GITHUB_BASE_URL: &str = "https://github.com/cloudfoundry";

/// Explicit configuration for one harness run.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
  /// Git branch of the buildpack under test (also selects the manifest).
  pub branch: String,
  /// Stacks to run scenarios against.
  pub stacks: Vec<String>,
  /// Base URL under which `{buildpack}-buildpack/{branch}/manifest.yml` lives.
  pub manifest_base_url: String,
  /// Base URL under which `{buildpack}-buildpack` git repositories live.
  pub github_base_url: String,
  /// Platform CLI binary.
  pub cf_bin: String,
  /// Scratch directory for clones and generated fixtures.
  pub work_dir: PathBuf,
  /// Root of the static fixture templates.
  pub fixtures_dir: PathBuf,
  /// Directory for capture logs.
  pub log_dir: PathBuf,
  /// How long a deployment may take to report a running instance.
  pub deploy_timeout: Duration,
  /// Delay between readiness polls.
  pub poll_interval: Duration,
  /// Attempts made by `visit` before a connection failure is reported.
  pub visit_attempts: u32,
  /// Delay between `visit` attempts.
  pub visit_backoff: Duration,
  /// Priority position used when registering the buildpack.
  pub buildpack_position: u32,
  /// Scheme used to reach application routes.
  pub route_scheme: String,
}

impl Default for HarnessConfig {
  fn default() -> Self {
    Self {
      branch: DEFAULT_BRANCH.to_string(),
      stacks: vec![DEFAULT_STACK.to_string()],
      manifest_base_url: DEFAULT_MANIFEST_BASE_URL.to_string(),
      github_base_url: DEFAULT_GITHUB_BASE_URL.to_string(),
      cf_bin: "cf".to_string(),
      work_dir: PathBuf::from("tmp"),
      fixtures_dir: PathBuf::from("fixtures"),
      log_dir: PathBuf::from("log"),
      deploy_timeout: Duration::from_secs(300),
      poll_interval: Duration::from_secs(2),
      visit_attempts: 3,
      visit_backoff: Duration::from_secs(1),
      buildpack_position: 100,
      route_scheme: "http".to_string(),
    }
  }
}

impl HarnessConfig {
  /// Build a configuration from `BRATS_*` environment variables, falling back
  /// to defaults for anything unset or empty.
  pub fn from_env() -> Self {
    let mut config = Self::default();

    if let Some(branch) = env_value(ENV_BRANCH) {
      config.branch = branch;
    }
    if let Some(stacks) = env_value(ENV_STACKS) {
      let parsed = parse_stack_list(&stacks);
      if !parsed.is_empty() {
        config.stacks = parsed;
      }
    }
    if let Some(url) = env_value(ENV_MANIFEST_BASE_URL) {
      config.manifest_base_url = url;
    }
    if let Some(url) = env_value(ENV_GITHUB_BASE_URL) {
      config.github_base_url = url;
    }
    if let Some(bin) = env_value(ENV_CF_BIN) {
      config.cf_bin = bin;
    }
    if let Some(dir) = env_value(ENV_WORK_DIR) {
      config.work_dir = PathBuf::from(dir);
    }
    if let Some(dir) = env_value(ENV_FIXTURES_DIR) {
      config.fixtures_dir = PathBuf::from(dir);
    }
    if let Some(dir) = env_value(ENV_LOG_DIR) {
      config.log_dir = PathBuf::from(dir);
    }

    config
  }

  /// Directory generated fixtures are written under.
  pub fn generated_fixtures_dir(&self) -> PathBuf {
    self.work_dir.join("fixtures")
  }

  /// Directory a buildpack is cloned into.
  pub fn clone_dir(&self, buildpack: &str) -> PathBuf {
    self.work_dir.join(format!("{buildpack}-buildpack"))
  }

  /// The shared capture log for harness-level commands (clone, package, register).
  pub fn harness_log(&self) -> PathBuf {
    self.log_dir.join(format!("{APP_NAME}.log"))
  }

  /// The capture log for a single deployed application.
  pub fn app_log(&self, app_name: &str) -> PathBuf {
    self.log_dir.join(format!("{app_name}.log"))
  }
}

fn env_value(key: &str) -> Option<String> {
  std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Split a comma separated stack list, dropping blanks.
pub fn parse_stack_list(value: &str) -> Vec<String> {
  value
    .split(',')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_string)
    .collect()
}
