//! External command execution.
//!
//! Every interaction with git, bundler, the packager and the platform CLI goes
//! through the [`Runner`] trait so the driver can be exercised against a
//! scripted fake. [`ProcessRunner`] is the real implementation.
//!
//! Commands are spawned directly (program + argument vector), never through a
//! shell. When a [`CommandSpec`] names a capture file, a header line and the
//! command's stdout/stderr are appended to it; those files are what log
//! assertions scan.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ExecError {
  #[error("failed to spawn {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: io::Error,
  },

  #[error("{program} {args} exited with {}:\n{output}", code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()))]
  Failed {
    program: String,
    args: String,
    code: Option<i32>,
    output: String,
  },

  #[error("failed to write capture log {}: {source}", path.display())]
  Capture {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

impl ExecError {
  /// Captured output of a failed command, if any.
  pub fn output(&self) -> Option<&str> {
    match self {
      ExecError::Failed { output, .. } => Some(output),
      _ => None,
    }
  }
}

/// A command to run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
  pub program: String,
  pub args: Vec<String>,
  pub cwd: Option<PathBuf>,
  pub env: Vec<(String, String)>,
  pub capture: Option<PathBuf>,
  /// Indexes into `args` that are never written to logs or errors.
  pub secret: Vec<usize>,
}

impl CommandSpec {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      ..Self::default()
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  /// An argument that is passed to the program but shown as `[REDACTED]`.
  pub fn secret_arg(mut self, arg: impl Into<String>) -> Self {
    self.secret.push(self.args.len());
    self.args.push(arg.into());
    self
  }

  pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.cwd = Some(dir.into());
    self
  }

  pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.env.push((key.into(), value.into()));
    self
  }

  /// Append this command's output to `path`.
  pub fn capture_to(mut self, path: impl Into<PathBuf>) -> Self {
    self.capture = Some(path.into());
    self
  }

  /// `program arg1 arg2 ...`, for logs and error messages.
  pub fn command_line(&self) -> String {
    let mut line = self.program.clone();
    let args = self.shown_args();
    if !args.is_empty() {
      line.push(' ');
      line.push_str(&args);
    }
    line
  }

  /// Arguments joined by spaces, secret ones redacted.
  pub fn shown_args(&self) -> String {
    self
      .args
      .iter()
      .enumerate()
      .map(|(index, arg)| {
        if self.secret.contains(&index) {
          "[REDACTED]"
        } else {
          arg.as_str()
        }
      })
      .collect::<Vec<_>>()
      .join(" ")
  }
}

/// Output of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
  pub code: Option<i32>,
  pub stdout: String,
  pub stderr: String,
}

impl CommandOutput {
  pub fn combined(&self) -> String {
    combine(&self.stdout, &self.stderr)
  }
}

/// Runs external commands.
pub trait Runner: Send + Sync {
  /// Run `cmd` to completion. A non-zero exit is [`ExecError::Failed`].
  fn run(&self, cmd: &CommandSpec) -> impl Future<Output = Result<CommandOutput, ExecError>> + Send;
}

/// Spawns real processes with `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl Runner for ProcessRunner {
  async fn run(&self, cmd: &CommandSpec) -> Result<CommandOutput, ExecError> {
    info!(command = %cmd.command_line(), "running command");

    let mut command = Command::new(&cmd.program);
    command.args(&cmd.args);
    if let Some(dir) = &cmd.cwd {
      command.current_dir(dir);
    }
    for (key, value) in &cmd.env {
      command.env(key, value);
    }

    let output = command.output().await.map_err(|source| ExecError::Spawn {
      program: cmd.program.clone(),
      source,
    })?;

    let result = CommandOutput {
      code: output.status.code(),
      stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
      stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    if let Some(path) = &cmd.capture {
      append_capture(path, cmd, &result.combined()).await?;
    }

    if !output.status.success() {
      debug!(command = %cmd.command_line(), code = ?result.code, "command failed");
      return Err(ExecError::Failed {
        program: cmd.program.clone(),
        args: cmd.shown_args(),
        code: result.code,
        output: result.combined(),
      });
    }

    if !result.stdout.is_empty() {
      debug!(stdout = %result.stdout.trim_end(), "command output");
    }

    Ok(result)
  }
}

/// Append a `$ command` header and `output` to the capture log at `path`.
pub async fn append_capture(path: &Path, cmd: &CommandSpec, output: &str) -> Result<(), ExecError> {
  let wrap = |source| ExecError::Capture {
    path: path.to_path_buf(),
    source,
  };

  if let Some(parent) = path.parent() {
    tokio::fs::create_dir_all(parent).await.map_err(wrap)?;
  }

  let mut file = tokio::fs::OpenOptions::new()
    .create(true)
    .append(true)
    .open(path)
    .await
    .map_err(wrap)?;

  let mut entry = format!("$ {}\n", cmd.command_line());
  entry.push_str(output);
  if !output.is_empty() && !output.ends_with('\n') {
    entry.push('\n');
  }
  file.write_all(entry.as_bytes()).await.map_err(wrap)?;
  file.flush().await.map_err(wrap)?;
  Ok(())
}

fn combine(stdout: &str, stderr: &str) -> String {
  match (stdout.is_empty(), stderr.is_empty()) {
    (_, true) => stdout.to_string(),
    (true, false) => stderr.to_string(),
    (false, false) => {
      let mut out = stdout.to_string();
      if !out.ends_with('\n') {
        out.push('\n');
      }
      out.push_str(stderr);
      out
    }
  }
}
