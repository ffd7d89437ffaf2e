//! Implementation of the `brats run` command.
//!
//! Packages the runtime's buildpack from source, deploys a fixture per
//! selected version on every configured stack, and prints one line per case.

use std::time::Instant;

use anyhow::{Context, Result, bail};

use brats_lib::config::HarnessConfig;
use brats_lib::deploy::Caching;
use brats_lib::exec::ProcessRunner;
use brats_lib::fixture::Runtime;
use brats_lib::scenario::{Harness, Selection, Suite, SuiteOptions, SuiteReport};

use crate::output::{print_json, print_report, print_summary};

/// Flags of the run command.
#[derive(Debug, Clone, Copy)]
pub struct RunArgs {
  pub runtime: Runtime,
  pub latest: bool,
  pub caching: Caching,
  pub service: bool,
  pub profile_script: bool,
  pub uri_credentials: bool,
  pub bump_version: bool,
  pub json: bool,
}

/// Execute the run command.
///
/// # Errors
///
/// Fails when the manifest cannot be resolved, the buildpack cannot be
/// packaged, or any case fails.
pub fn cmd_run(config: &HarnessConfig, args: &RunArgs) -> Result<()> {
  let start = Instant::now();
  let options = SuiteOptions {
    selection: if args.latest { Selection::Latest } else { Selection::All },
    caching: args.caching,
    service: args.service,
    profile_script: args.profile_script,
    uri_credentials: args.uri_credentials,
    bump_version: args.bump_version,
  };
  let suite = Suite::new(args.runtime, options);

  let harness = Harness::new(config, ProcessRunner).context("Failed to set up harness")?;
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let reports = rt
    .block_on(harness.run(&suite))
    .with_context(|| format!("{} suite aborted", args.runtime))?;

  if args.json {
    print_json(&reports)?;
  } else {
    for report in &reports {
      print_report(report);
    }
    print_summary(&reports, start.elapsed());
  }

  let failed: usize = reports.iter().map(SuiteReport::failed).sum();
  if failed > 0 {
    bail!("{failed} case(s) failed, see {}", config.log_dir.display());
  }
  Ok(())
}
