//! Fixture application generation.
//!
//! A fixture is a copy of a static template directory with version-specific
//! files rendered into it:
//!
//! ```text
//! {fixtures_dir}/{runtime}/[src/]{template}              static template
//! {work_dir}/fixtures/{runtime}/{key}/[src/]{template}   generated copy
//! ```
//!
//! The key is derived from every version parameter, so different parameters
//! never share an output directory. Generation of one key is serialized by a
//! file lock and is idempotent: the new tree is rendered into a staging
//! directory and only swapped in when its content hash differs from what is
//! already there.

pub mod descriptor;
pub mod extensions;
pub mod lock;
pub mod params;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::HarnessConfig;
use crate::consts::PROFILE_SCRIPT_MARKER;
use crate::placeholder::{self, PlaceholderError};
use crate::util::fs::{copy_dir, remove_dir_if_exists};
use crate::util::hash::{DirHashError, hash_directory, short_hash};

use self::extensions::{ExtensionTable, ExtensionTableError};
use self::lock::{FixtureLock, FixtureLockError};
pub use self::params::{FixtureParams, PhpVm, Runtime, WebServer};

#[derive(Debug, Error)]
pub enum GenerateError {
  #[error("fixture template '{template}' for {runtime} not found at {}", path.display())]
  TemplateMissing {
    runtime: Runtime,
    template: String,
    path: PathBuf,
  },

  #[error("failed to render {}: {message}", path.display())]
  Render { path: PathBuf, message: String },

  #[error("i/o error at {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error(transparent)]
  Lock(#[from] FixtureLockError),

  #[error(transparent)]
  Hash(#[from] DirHashError),

  #[error(transparent)]
  Extensions(#[from] ExtensionTableError),
}

impl GenerateError {
  fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
    move |source| GenerateError::Io {
      path: path.to_path_buf(),
      source,
    }
  }
}

/// A generated, self-contained fixture directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureTemplate {
  params: FixtureParams,
  template: String,
  path: PathBuf,
}

impl FixtureTemplate {
  pub fn runtime(&self) -> Runtime {
    self.params.runtime()
  }

  pub fn params(&self) -> &FixtureParams {
    &self.params
  }

  pub fn template(&self) -> &str {
    &self.template
  }

  /// Root of the generated app, the directory that gets pushed.
  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Parse the generated descriptor and return the runtime version it pins.
  pub fn pinned_version(&self) -> Result<Option<String>, GenerateError> {
    descriptor::read_pinned_version(&self.path, &self.params)
  }

  /// Add an executable `.profile` that announces itself during startup.
  pub fn add_profile_script(&self) -> Result<PathBuf, GenerateError> {
    let path = self.path.join(".profile");
    let script = format!("#!/usr/bin/env bash\n\necho {PROFILE_SCRIPT_MARKER}\n");
    fs::write(&path, script).map_err(GenerateError::io(&path))?;

    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).map_err(GenerateError::io(&path))?;
    }

    debug!(path = ?path, "added profile script");
    Ok(path)
  }
}

/// Materializes fixtures from static templates.
#[derive(Debug, Clone)]
pub struct Generator {
  fixtures_dir: PathBuf,
  output_root: PathBuf,
  extensions: ExtensionTable,
}

impl Generator {
  /// Generator over the configured directories with the builtin extension table.
  pub fn new(config: &HarnessConfig) -> Result<Self, GenerateError> {
    Ok(Self::with_extensions(config, ExtensionTable::builtin()?))
  }

  pub fn with_extensions(config: &HarnessConfig, extensions: ExtensionTable) -> Self {
    Self {
      fixtures_dir: config.fixtures_dir.clone(),
      output_root: config.generated_fixtures_dir(),
      extensions,
    }
  }

  pub fn extensions(&self) -> &ExtensionTable {
    &self.extensions
  }

  /// Static template directory for `runtime`/`template`.
  pub fn template_dir(&self, runtime: Runtime, template: &str) -> PathBuf {
    let mut dir = self.fixtures_dir.join(runtime.as_str());
    if let Some(prefix) = runtime.template_prefix() {
      dir.push(prefix);
    }
    dir.join(template)
  }

  /// Where `params` renders `template`.
  pub fn output_dir(&self, template: &str, params: &FixtureParams) -> PathBuf {
    let runtime = params.runtime();
    let mut dir = self.output_root.join(runtime.as_str()).join(params.key());
    if let Some(prefix) = runtime.template_prefix() {
      dir.push(prefix);
    }
    dir.join(template)
  }

  /// Generate `template` for `params`.
  ///
  /// Never touches the static template. Regenerating an unchanged key leaves
  /// the existing directory in place; a changed one is replaced wholesale.
  pub fn generate(&self, template: &str, params: &FixtureParams) -> Result<FixtureTemplate, GenerateError> {
    let runtime = params.runtime();
    let source = self.template_dir(runtime, template);
    if !source.is_dir() {
      return Err(GenerateError::TemplateMissing {
        runtime,
        template: template.to_string(),
        path: source,
      });
    }

    let key = params.key();
    let output = self.output_dir(template, params);
    let _lock = self.lock(&format!("{runtime}/{key}/{template}"))?;

    info!(runtime = %runtime, key = %key, "generating fixture");

    let parent = output.parent().unwrap_or(self.output_root.as_path()).to_path_buf();
    fs::create_dir_all(&parent).map_err(GenerateError::io(&parent))?;

    let staging = tempfile::Builder::new()
      .prefix(".staging-")
      .tempdir_in(&parent)
      .map_err(GenerateError::io(&parent))?;
    let staged = staging.path().join(template);

    copy_dir(&source, &staged).map_err(GenerateError::io(&source))?;
    render_tree(&staged, &params.vars())?;

    let extensions = match params {
      FixtureParams::Php {
        vm: PhpVm::Php,
        version,
        ..
      } => self.extensions.extensions_for(version),
      _ => None,
    };
    descriptor::write_descriptors(&staged, params, extensions, self.extensions.zend_extensions())?;

    if output.is_dir() && hash_directory(&output, &[])? == hash_directory(&staged, &[])? {
      debug!(path = ?output, "fixture unchanged, keeping existing copy");
    } else {
      remove_dir_if_exists(&output).map_err(GenerateError::io(&output))?;
      fs::rename(&staged, &output).map_err(GenerateError::io(&output))?;
      debug!(path = ?output, "fixture written");
    }

    Ok(FixtureTemplate {
      params: params.clone(),
      template: template.to_string(),
      path: output,
    })
  }
}

impl Generator {
  /// Take the generation lock for `lock_key`, waiting behind whoever holds it.
  fn lock(&self, lock_key: &str) -> Result<FixtureLock, GenerateError> {
    let lock_dir = self.output_root.join(".locks");
    let lock_name = short_hash(lock_key);

    let lock = match FixtureLock::try_acquire(&lock_dir, &lock_name, lock_key) {
      Ok(lock) => lock,
      Err(FixtureLockError::Contention { pid, .. }) => {
        info!(key = %lock_key, pid, "fixture is being generated elsewhere, waiting");
        FixtureLock::acquire(&lock_dir, &lock_name, lock_key)?
      }
      Err(FixtureLockError::ContentionUnknown { lock_path }) => {
        info!(key = %lock_key, lock = ?lock_path, "fixture lock is held, waiting");
        FixtureLock::acquire(&lock_dir, &lock_name, lock_key)?
      }
      Err(err) => return Err(err.into()),
    };
    debug!(lock = ?lock.lock_path(), "holding fixture lock");
    Ok(lock)
  }
}

/// Substitute placeholders in every UTF-8 file under `root`.
fn render_tree(root: &Path, vars: &placeholder::Vars) -> Result<(), GenerateError> {
  for entry in WalkDir::new(root) {
    let entry = entry.map_err(|e| GenerateError::Render {
      path: root.to_path_buf(),
      message: e.to_string(),
    })?;
    if !entry.file_type().is_file() {
      continue;
    }

    let path = entry.path();
    let bytes = fs::read(path).map_err(GenerateError::io(path))?;
    let Ok(content) = String::from_utf8(bytes) else {
      continue;
    };
    if !placeholder::needs_rendering(&content) {
      continue;
    }

    let rendered = placeholder::substitute(&content, vars).map_err(|e: PlaceholderError| GenerateError::Render {
      path: path.to_path_buf(),
      message: e.to_string(),
    })?;
    fs::write(path, rendered).map_err(GenerateError::io(path))?;
    debug!(path = ?path, "rendered template file");
  }

  Ok(())
}
