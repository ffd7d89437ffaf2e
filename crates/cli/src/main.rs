//! brats: buildpack acceptance-test runner.

mod cmd;
mod output;

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use brats_lib::config::HarnessConfig;
use brats_lib::deploy::Caching;
use brats_lib::fixture::{PhpVm, Runtime, WebServer};

use crate::cmd::{GenerateArgs, RunArgs};
use crate::output::print_error;

/// Deploy buildpack fixtures to Cloud Foundry and check what comes back
#[derive(Parser)]
#[command(name = "brats")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// List the versions of a dependency a buildpack's manifest ships
  Versions {
    /// Buildpack name, e.g. nodejs
    buildpack: String,

    /// Dependency name, e.g. node
    dependency: String,

    /// Stack to filter on (default: first configured stack)
    #[arg(long)]
    stack: Option<String>,

    /// Buildpack branch to read the manifest from
    #[arg(long)]
    branch: Option<String>,

    /// Only print the highest version
    #[arg(long)]
    latest: bool,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
  },

  /// Generate a fixture app pinned to the given versions
  Generate {
    runtime: Runtime,

    /// Runtime version (ruby version for jruby, SDK version for dotnet-core)
    #[arg(long)]
    version: Option<String>,

    /// JRuby version
    #[arg(long)]
    engine_version: Option<String>,

    /// PHP virtual machine
    #[arg(long, default_value = "php")]
    vm: PhpVm,

    /// PHP web server
    #[arg(long, default_value = "httpd")]
    web_server: WebServer,

    /// PHP web server version
    #[arg(long)]
    web_server_version: Option<String>,

    /// .NET Core runtime version
    #[arg(long)]
    runtime_version: Option<String>,

    /// Add an executable .profile script
    #[arg(long)]
    profile_script: bool,
  },

  /// Package a buildpack and run its suite against every selected version
  Run {
    runtime: Runtime,

    /// Run on this stack only
    #[arg(long)]
    stack: Option<String>,

    /// Buildpack branch to clone and read the manifest from
    #[arg(long)]
    branch: Option<String>,

    /// Only test the highest version of each dependency
    #[arg(long)]
    latest: bool,

    /// Package with or without bundled dependencies
    #[arg(long, default_value = "cached")]
    caching: Caching,

    /// Bind a user-provided service to every app
    #[arg(long)]
    service: bool,

    /// Ship a .profile script with every app
    #[arg(long)]
    profile_script: bool,

    /// Embed credentials in dependency URIs and check they are redacted
    #[arg(long)]
    uri_credentials: bool,

    /// Bump the buildpack version after the first push and re-push
    #[arg(long)]
    bump_version: bool,

    /// How long to wait for an app to start, e.g. 5m
    #[arg(long)]
    timeout: Option<humantime::Duration>,

    /// Print the reports as JSON
    #[arg(long)]
    json: bool,
  },

  /// Delete a deployed app (and its bound test service)
  Teardown {
    app: String,

    /// Also delete the app's `-service` user-provided service
    #[arg(long)]
    service: bool,
  },

  /// Remove a buildpack clone and unregister the buildpack
  Cleanup { buildpack: String },

  /// Print the PHP extensions configured for each version
  Extensions {
    #[arg(required = true)]
    versions: Vec<String>,
  },
}

fn main() {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  if let Err(err) = dispatch(cli.command) {
    print_error(&format!("{err:#}"));
    std::process::exit(1);
  }
}

fn dispatch(command: Commands) -> Result<()> {
  let mut config = HarnessConfig::from_env();

  match command {
    Commands::Versions {
      buildpack,
      dependency,
      stack,
      branch,
      latest,
      json,
    } => {
      if let Some(branch) = branch {
        config.branch = branch;
      }
      cmd::cmd_versions(&config, &buildpack, &dependency, stack.as_deref(), latest, json)
    }
    Commands::Generate {
      runtime,
      version,
      engine_version,
      vm,
      web_server,
      web_server_version,
      runtime_version,
      profile_script,
    } => cmd::cmd_generate(
      &config,
      &GenerateArgs {
        runtime,
        version,
        engine_version,
        vm,
        web_server,
        web_server_version,
        runtime_version,
        profile_script,
      },
    ),
    Commands::Run {
      runtime,
      stack,
      branch,
      latest,
      caching,
      service,
      profile_script,
      uri_credentials,
      bump_version,
      timeout,
      json,
    } => {
      if let Some(stack) = stack {
        config.stacks = vec![stack];
      }
      if let Some(branch) = branch {
        config.branch = branch;
      }
      if let Some(timeout) = timeout {
        config.deploy_timeout = Duration::from(timeout);
      }
      cmd::cmd_run(
        &config,
        &RunArgs {
          runtime,
          latest,
          caching,
          service,
          profile_script,
          uri_credentials,
          bump_version,
          json,
        },
      )
    }
    Commands::Teardown { app, service } => cmd::cmd_teardown(&config, &app, service),
    Commands::Cleanup { buildpack } => cmd::cmd_cleanup(&config, &buildpack),
    Commands::Extensions { versions } => cmd::cmd_extensions(&versions),
  }
}
