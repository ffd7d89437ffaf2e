//! Implementation of the `brats cleanup` command.

use anyhow::{Context, Result};

use brats_lib::config::HarnessConfig;
use brats_lib::deploy::{Driver, registered_name};
use brats_lib::exec::ProcessRunner;

use crate::output::print_done;

/// Remove the local clone of `buildpack` and unregister it from the platform.
pub fn cmd_cleanup(config: &HarnessConfig, buildpack: &str) -> Result<()> {
  let driver = Driver::new(config, ProcessRunner);
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  rt.block_on(driver.cleanup(buildpack))
    .with_context(|| format!("Failed to clean up {buildpack} buildpack"))?;

  print_done(&format!("Removed {}", registered_name(buildpack)));
  Ok(())
}
