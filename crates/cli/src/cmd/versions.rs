//! Implementation of the `brats versions` command.
//!
//! Fetches a buildpack's manifest and lists the versions of one dependency
//! available on a stack.

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;

use brats_lib::config::{DEFAULT_STACK, HarnessConfig};
use brats_lib::manifest::ManifestResolver;

use crate::output::{Mark, print_json, print_note};

#[derive(Debug, Serialize)]
struct VersionLine {
  version: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  deprecated: Option<String>,
}

/// Execute the versions command.
///
/// Versions are printed in manifest order. With `latest`, only the highest
/// version by version ordering is printed. An empty result is not an error.
pub fn cmd_versions(
  config: &HarnessConfig,
  buildpack: &str,
  dependency: &str,
  stack: Option<&str>,
  latest: bool,
  json: bool,
) -> Result<()> {
  let stack = stack
    .or_else(|| config.stacks.first().map(String::as_str))
    .unwrap_or(DEFAULT_STACK);

  let resolver = ManifestResolver::new(config);
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let manifest = rt
    .block_on(resolver.resolve(buildpack, &config.branch))
    .with_context(|| format!("Failed to resolve manifest for {buildpack} buildpack"))?;

  let highest = manifest.latest(dependency, stack);
  let lines: Vec<VersionLine> = manifest
    .matching(dependency, stack)
    .filter(|entry| !latest || highest.as_deref() == Some(entry.version.as_str()))
    .map(|entry| VersionLine {
      version: entry.version.clone(),
      deprecated: entry
        .deprecation
        .as_ref()
        .map(|d| d.date.clone().unwrap_or_else(|| "deprecated".to_string())),
    })
    .collect();

  if json {
    return print_json(&lines);
  }

  if lines.is_empty() {
    print_note(&format!("No {dependency} versions for {stack} in {buildpack} ({})", config.branch));
    return Ok(());
  }

  for line in &lines {
    match &line.deprecated {
      Some(date) => println!(
        "{} {}",
        line.version,
        format!("(end of life {date})").if_supports_color(Stream::Stdout, |s| s.dimmed())
      ),
      None => println!("{}", line.version),
    }
  }
  if !latest {
    println!();
    println!(
      "{} {} version(s) on {stack}",
      Mark::Note.paint(Stream::Stdout),
      lines.len()
    );
  }

  Ok(())
}
