//! Terminal rendering of suite reports and command status.
//!
//! Lines are assembled as plain text and colored only when printed, and only
//! when the stream is a terminal.

use std::time::Duration;

use anyhow::Context;
use owo_colors::{OwoColorize, Stream, Style};

use brats_lib::scenario::{CaseOutcome, CaseResult, SuiteReport};

/// Leading mark of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
  Pass,
  Fail,
  Skip,
  Note,
  Stack,
}

impl Mark {
  pub fn symbol(self) -> &'static str {
    match self {
      Mark::Pass => "✓",
      Mark::Fail => "✗",
      Mark::Skip => "⚠",
      Mark::Note => "•",
      Mark::Stack => "→",
    }
  }

  fn color(self) -> Style {
    match self {
      Mark::Pass => Style::new().green(),
      Mark::Fail => Style::new().red(),
      Mark::Skip => Style::new().yellow(),
      Mark::Note => Style::new().blue(),
      Mark::Stack => Style::new().cyan(),
    }
  }

  pub fn paint(self, stream: Stream) -> String {
    self
      .symbol()
      .if_supports_color(stream, |s| s.style(self.color()))
      .to_string()
  }
}

impl From<&CaseOutcome> for Mark {
  fn from(outcome: &CaseOutcome) -> Self {
    match outcome {
      CaseOutcome::Passed => Mark::Pass,
      CaseOutcome::Failed { .. } => Mark::Fail,
      CaseOutcome::Skipped { .. } => Mark::Skip,
    }
  }
}

/// `nodejs 6.10.0`, with a skip reason in parentheses.
fn case_label(case: &CaseResult) -> String {
  match &case.outcome {
    CaseOutcome::Skipped { reason } => format!("{} ({reason})", case.name),
    _ => case.name.clone(),
  }
}

fn stack_header(report: &SuiteReport) -> String {
  format!("{} on {}", report.buildpack, report.stack)
}

/// Case counts over every report.
fn tally(reports: &[SuiteReport]) -> String {
  let (passed, failed, skipped) = reports.iter().fold((0, 0, 0), |(p, f, s), r| {
    (p + r.passed(), f + r.failed(), s + r.skipped())
  });
  format!("{passed} passed, {failed} failed, {skipped} skipped")
}

fn elapsed(duration: Duration) -> String {
  let secs = duration.as_secs();
  if secs >= 60 {
    format!("{}m {:02}s", secs / 60, secs % 60)
  } else {
    format!("{:.1}s", duration.as_secs_f64())
  }
}

pub fn print_report(report: &SuiteReport) {
  println!();
  println!(
    "{} {}",
    Mark::Stack.paint(Stream::Stdout),
    stack_header(report).if_supports_color(Stream::Stdout, |s| s.bold())
  );

  for case in &report.cases {
    println!("  {} {}", Mark::from(&case.outcome).paint(Stream::Stdout), case_label(case));
    if let CaseOutcome::Failed { reason } = &case.outcome {
      for line in reason.lines() {
        println!("      {}", line.if_supports_color(Stream::Stdout, |s| s.dimmed()));
      }
    }
  }
}

pub fn print_summary(reports: &[SuiteReport], took: Duration) {
  println!();
  println!("{} {} in {}", Mark::Note.paint(Stream::Stdout), tally(reports), elapsed(took));
}

pub fn print_done(message: &str) {
  eprintln!("{} {message}", Mark::Pass.paint(Stream::Stderr));
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    Mark::Fail.paint(Stream::Stderr),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    Mark::Skip.paint(Stream::Stderr),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_note(message: &str) {
  println!("{} {message}", Mark::Note.paint(Stream::Stdout));
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{json}");
  Ok(())
}
