//! Implementation of the `brats generate` command.

use anyhow::{Context, Result, anyhow};

use brats_lib::config::HarnessConfig;
use brats_lib::consts::DEFAULT_TEMPLATE;
use brats_lib::fixture::{FixtureParams, Generator, PhpVm, Runtime, WebServer};

use crate::output::print_done;

/// Flags of the generate command.
#[derive(Debug, Clone)]
pub struct GenerateArgs {
  pub runtime: Runtime,
  pub version: Option<String>,
  pub engine_version: Option<String>,
  pub vm: PhpVm,
  pub web_server: WebServer,
  pub web_server_version: Option<String>,
  pub runtime_version: Option<String>,
  pub profile_script: bool,
}

/// Execute the generate command.
///
/// Renders the runtime's template pinned to the given versions and prints the
/// path of the generated app on stdout.
pub fn cmd_generate(config: &HarnessConfig, args: &GenerateArgs) -> Result<()> {
  let params = build_params(args)?;
  let generator = Generator::new(config).context("Failed to load PHP extension table")?;
  let fixture = generator
    .generate(DEFAULT_TEMPLATE, &params)
    .with_context(|| format!("Failed to generate {params} fixture"))?;

  if args.profile_script {
    fixture.add_profile_script().context("Failed to add .profile script")?;
  }

  print_done(&format!("Generated {params}"));
  println!("{}", fixture.path().display());
  Ok(())
}

fn build_params(args: &GenerateArgs) -> Result<FixtureParams> {
  let required = |value: &Option<String>, flag: &str| {
    value
      .clone()
      .ok_or_else(|| anyhow!("--{flag} is required for {}", args.runtime))
  };

  let params = match args.runtime {
    Runtime::Nodejs => FixtureParams::Nodejs {
      version: required(&args.version, "version")?,
    },
    Runtime::Python => FixtureParams::Python {
      version: required(&args.version, "version")?,
    },
    Runtime::Go => FixtureParams::Go {
      version: required(&args.version, "version")?,
    },
    Runtime::Ruby => FixtureParams::Ruby {
      version: required(&args.version, "version")?,
    },
    Runtime::Jruby => FixtureParams::Jruby {
      ruby_version: required(&args.version, "version")?,
      jruby_version: required(&args.engine_version, "engine-version")?,
    },
    Runtime::Php => FixtureParams::Php {
      vm: args.vm,
      version: required(&args.version, "version")?,
      web_server: args.web_server,
      web_server_version: required(&args.web_server_version, "web-server-version")?,
    },
    Runtime::DotnetCore => FixtureParams::DotnetCore {
      sdk_version: required(&args.version, "version")?,
      runtime_version: required(&args.runtime_version, "runtime-version")?,
    },
    Runtime::Staticfile => FixtureParams::Staticfile,
    Runtime::Binary => FixtureParams::Binary,
  };
  Ok(params)
}
