//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// The repository's fixture templates.
pub fn templates_dir() -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("..")
    .join("..")
    .join("fixtures")
}

/// Isolated test environment.
///
/// Each test gets its own work and log directories; templates are read from
/// the repository unless a test writes its own.
pub struct TestEnv {
  pub temp: TempDir,
  templates: PathBuf,
}

impl TestEnv {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
      templates: templates_dir(),
    }
  }

  /// Use a private template tree under the temp directory.
  pub fn with_own_templates() -> Self {
    let temp = TempDir::new().unwrap();
    let templates = temp.path().join("templates");
    std::fs::create_dir_all(&templates).unwrap();
    Self { temp, templates }
  }

  /// Write a template file relative to the template root.
  pub fn write_template(&self, relative_path: &str, content: &str) {
    let path = self.templates.join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  /// Work directory (isolated per test).
  pub fn work_path(&self) -> PathBuf {
    let p = self.temp.path().join("work");
    std::fs::create_dir_all(&p).unwrap();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  pub fn log_path(&self) -> PathBuf {
    let p = self.temp.path().join("log");
    std::fs::create_dir_all(&p).unwrap();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  /// Get a pre-configured Command for the brats binary.
  ///
  /// Points every `BRATS_*` directory at the isolated paths and the manifest
  /// base URL at an address nothing listens on, so no test reaches the
  /// network by accident.
  pub fn brats_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("brats");
    cmd.env("BRATS_WORK_DIR", self.work_path());
    cmd.env("BRATS_LOG_DIR", self.log_path());
    cmd.env("BRATS_FIXTURES_DIR", &self.templates);
    cmd.env("BRATS_MANIFEST_BASE_URL", "http://127.0.0.1:9");
    cmd.env("BRATS_CF_BIN", "false");
    cmd.env_remove("BRATS_STACKS");
    cmd.env_remove("BRATS_BRANCH");
    cmd
  }

  /// Generated fixture path, as printed on the command's stdout.
  pub fn generated_path(stdout: &[u8]) -> PathBuf {
    let text = String::from_utf8_lossy(stdout);
    PathBuf::from(text.lines().last().unwrap().trim())
  }
}
