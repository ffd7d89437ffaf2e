//! Implementation of the `brats teardown` command.

use anyhow::{Context, Result};

use brats_lib::config::HarnessConfig;
use brats_lib::deploy::{DeployedApplication, Driver};
use brats_lib::exec::ProcessRunner;

use crate::output::print_done;

/// Delete `app`, and with `service` its `{app}-service` as well. Succeeds
/// when the platform no longer knows the app.
pub fn cmd_teardown(config: &HarnessConfig, app: &str, service: bool) -> Result<()> {
  let mut deployed = DeployedApplication::new(app, "", "", "", "", config.app_log(app));
  if service {
    deployed.service = Some(format!("{app}-service"));
  }

  let driver = Driver::new(config, ProcessRunner);
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  rt.block_on(driver.teardown(&mut deployed))
    .with_context(|| format!("Failed to tear down {app}"))?;

  print_done(&format!("Deleted {app}"));
  Ok(())
}
