//! Test helpers for brats-lib.
//!
//! [`ScriptedRunner`] stands in for git, bundler and the platform CLI: tests
//! register canned replies keyed by a substring of the command line, then
//! inspect the calls that were made.

use std::path::PathBuf;
use std::sync::Mutex;

use crate::exec::{CommandOutput, CommandSpec, ExecError, Runner, append_capture};

#[derive(Debug, Clone)]
pub enum Reply {
  /// Exit 0 with this stdout.
  Ok(String),
  /// Exit non-zero with this output.
  Fail { code: i32, output: String },
  /// Write a file (a packaged zip, a cloned manifest), then exit 0.
  Write { path: PathBuf, contents: String },
  /// Never finish, like a platform CLI stuck on a dead API.
  Hang,
}

impl Reply {
  pub fn ok(stdout: &str) -> Self {
    Reply::Ok(stdout.to_string())
  }

  pub fn fail(code: i32, output: &str) -> Self {
    Reply::Fail {
      code,
      output: output.to_string(),
    }
  }

  pub fn touch(path: impl Into<PathBuf>) -> Self {
    Self::write(path, "zip")
  }

  pub fn write(path: impl Into<PathBuf>, contents: &str) -> Self {
    Reply::Write {
      path: path.into(),
      contents: contents.to_string(),
    }
  }
}

#[derive(Debug)]
struct Rule {
  pattern: String,
  reply: Reply,
  once: bool,
}

#[derive(Debug, Default)]
pub struct ScriptedRunner {
  rules: Mutex<Vec<Rule>>,
  calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
  pub fn new() -> Self {
    Self::default()
  }

  /// Reply to every command whose line contains `pattern`.
  pub fn on(&self, pattern: &str, reply: Reply) -> &Self {
    self.push(pattern, reply, false)
  }

  /// Reply to the next matching command only. One-shot replies win over
  /// sticky ones.
  pub fn once(&self, pattern: &str, reply: Reply) -> &Self {
    self.push(pattern, reply, true)
  }

  fn push(&self, pattern: &str, reply: Reply, once: bool) -> &Self {
    self.rules.lock().unwrap().push(Rule {
      pattern: pattern.to_string(),
      reply,
      once,
    });
    self
  }

  /// Every command line run so far, in order.
  pub fn calls(&self) -> Vec<String> {
    self.calls.lock().unwrap().iter().map(CommandSpec::command_line).collect()
  }

  pub fn specs(&self) -> Vec<CommandSpec> {
    self.calls.lock().unwrap().clone()
  }

  pub fn count(&self, pattern: &str) -> usize {
    self.calls().iter().filter(|line| line.contains(pattern)).count()
  }

  pub fn called(&self, pattern: &str) -> bool {
    self.count(pattern) > 0
  }

  fn reply_for(&self, line: &str) -> Reply {
    let mut rules = self.rules.lock().unwrap();
    if let Some(index) = rules.iter().position(|r| r.once && line.contains(&r.pattern)) {
      return rules.remove(index).reply;
    }
    rules
      .iter()
      .find(|r| line.contains(&r.pattern))
      .map(|r| r.reply.clone())
      .unwrap_or_else(|| Reply::ok(""))
  }
}

impl Runner for ScriptedRunner {
  async fn run(&self, cmd: &CommandSpec) -> Result<CommandOutput, ExecError> {
    let line = cmd.command_line();
    self.calls.lock().unwrap().push(cmd.clone());
    let reply = self.reply_for(&line);

    let (code, output) = match reply {
      Reply::Ok(stdout) => (0, stdout),
      Reply::Fail { code, output } => (code, output),
      Reply::Write { path, contents } => {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, contents).unwrap();
        (0, String::new())
      }
      Reply::Hang => return std::future::pending().await,
    };

    if let Some(capture) = &cmd.capture {
      append_capture(capture, cmd, &output).await?;
    }

    if code == 0 {
      Ok(CommandOutput {
        code: Some(0),
        stdout: output,
        stderr: String::new(),
      })
    } else {
      Err(ExecError::Failed {
        program: cmd.program.clone(),
        args: cmd.shown_args(),
        code: Some(code),
        output,
      })
    }
  }
}
