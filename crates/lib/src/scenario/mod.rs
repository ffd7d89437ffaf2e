//! Scenario orchestration.
//!
//! A [`Suite`] turns a buildpack manifest into a list of [`Case`]s (one per
//! version to test), then runs them: the buildpack is packaged once, every
//! case generates a fixture, deploys it, evaluates its checks and tears the
//! app down, and the buildpack is cleaned up at the end. Teardown and cleanup
//! happen whether or not the case passed.
//!
//! [`Harness`] bundles the collaborators a suite needs and runs a suite for
//! every configured stack.

pub mod catalog;

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::HarnessConfig;
use crate::consts::{BUMP_WARNING, DEFAULT_TEMPLATE, PROFILE_SCRIPT_MARKER};
use crate::deploy::{Caching, DeployOptions, DeployedApplication, Driver, DriverError, PackagedBuildpack};
use crate::exec::Runner;
use crate::fixture::extensions::{ExtensionTable, ExtensionTableError};
use crate::fixture::{FixtureParams, GenerateError, Generator, PhpVm, Runtime, WebServer};
use crate::manifest::{DependencyManifest, ManifestError, ManifestResolver};
use crate::observe::{Browser, Check, LogPattern, ObserveError, Verdict};

pub use catalog::{Answer, Endpoint, RuntimeProfile, expected_logs, profile};

#[derive(Debug, Error)]
pub enum ScenarioError {
  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error(transparent)]
  Extensions(#[from] ExtensionTableError),

  #[error(transparent)]
  Generate(#[from] GenerateError),

  #[error(transparent)]
  Driver(#[from] DriverError),

  #[error(transparent)]
  Observe(#[from] ObserveError),

  #[error("fixture generation task failed: {0}")]
  Task(#[from] tokio::task::JoinError),
}

/// Which manifest versions become cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
  #[default]
  All,
  /// Only the highest version of each dependency.
  Latest,
}

/// Variations applied to every case of a suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SuiteOptions {
  pub selection: Selection,
  pub caching: Caching,
  /// Bind a user-provided service and check its credentials stay out of
  /// the logs.
  pub service: bool,
  /// Ship an executable `.profile` and check it ran but is not served.
  pub profile_script: bool,
  /// Package with credentials embedded in dependency URIs and check they
  /// are redacted in staging output.
  pub uri_credentials: bool,
  /// After the first checks, bump the buildpack version, re-push and check
  /// for the version-change warning.
  pub bump_version: bool,
}

/// One fixture to deploy and the checks it must pass.
#[derive(Debug, Clone)]
pub struct Case {
  pub name: String,
  pub params: FixtureParams,
  pub checks: Vec<Check>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum CaseOutcome {
  Passed,
  Failed { reason: String },
  Skipped { reason: String },
}

impl CaseOutcome {
  pub fn is_failure(&self) -> bool {
    matches!(self, CaseOutcome::Failed { .. })
  }
}

impl fmt::Display for CaseOutcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CaseOutcome::Passed => write!(f, "passed"),
      CaseOutcome::Failed { reason } => write!(f, "failed: {reason}"),
      CaseOutcome::Skipped { reason } => write!(f, "skipped: {reason}"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseResult {
  pub name: String,
  #[serde(flatten)]
  pub outcome: CaseOutcome,
}

/// Results of one suite on one stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuiteReport {
  pub runtime: Runtime,
  pub buildpack: String,
  pub stack: String,
  pub cases: Vec<CaseResult>,
}

impl SuiteReport {
  fn new(runtime: Runtime, stack: &str) -> Self {
    Self {
      runtime,
      buildpack: runtime.buildpack().to_string(),
      stack: stack.to_string(),
      cases: Vec::new(),
    }
  }

  fn record(&mut self, name: impl Into<String>, outcome: CaseOutcome) {
    self.cases.push(CaseResult {
      name: name.into(),
      outcome,
    });
  }

  pub fn passed(&self) -> usize {
    self.count(|o| matches!(o, CaseOutcome::Passed))
  }

  pub fn failed(&self) -> usize {
    self.count(CaseOutcome::is_failure)
  }

  pub fn skipped(&self) -> usize {
    self.count(|o| matches!(o, CaseOutcome::Skipped { .. }))
  }

  pub fn is_success(&self) -> bool {
    self.failed() == 0
  }

  fn count(&self, predicate: impl Fn(&CaseOutcome) -> bool) -> usize {
    self.cases.iter().filter(|c| predicate(&c.outcome)).count()
  }
}

/// The test suite for one runtime.
#[derive(Debug, Clone)]
pub struct Suite {
  profile: RuntimeProfile,
  options: SuiteOptions,
}

impl Suite {
  pub fn new(runtime: Runtime, options: SuiteOptions) -> Self {
    Self {
      profile: profile(runtime),
      options,
    }
  }

  pub fn runtime(&self) -> Runtime {
    self.profile.runtime
  }

  pub fn buildpack(&self) -> &'static str {
    self.profile.buildpack
  }

  pub fn options(&self) -> &SuiteOptions {
    &self.options
  }

  /// Cases for every selected version on `stack`.
  ///
  /// PHP versions are checked against the extension table first; a version
  /// whose family is missing fails the whole plan before anything is
  /// generated.
  pub fn plan(
    &self,
    manifest: &DependencyManifest,
    stack: &str,
    extensions: &ExtensionTable,
  ) -> Result<Vec<Case>, ScenarioError> {
    let params = match (self.runtime(), self.profile.dependencies) {
      (Runtime::Staticfile, _) => vec![FixtureParams::Staticfile],
      (Runtime::Binary, _) => vec![FixtureParams::Binary],
      (Runtime::Nodejs, [name]) => self.single_version(manifest, name, stack, |version| FixtureParams::Nodejs { version }),
      (Runtime::Python, [name]) => self.single_version(manifest, name, stack, |version| FixtureParams::Python { version }),
      (Runtime::Go, [name]) => self.single_version(manifest, name, stack, |version| FixtureParams::Go { version }),
      (Runtime::Ruby, [name]) => self.single_version(manifest, name, stack, |version| FixtureParams::Ruby { version }),
      (Runtime::Jruby, [name]) => self
        .select(manifest, name, stack)
        .into_iter()
        .filter_map(|version| {
          let params = FixtureParams::jruby_from_manifest(&version);
          if params.is_none() {
            warn!(version = %version, "unrecognized jruby version, skipping");
          }
          params
        })
        .collect(),
      (Runtime::Php, [php, hhvm]) => self.php_params(manifest, stack, extensions, php, hhvm)?,
      (Runtime::DotnetCore, [sdk, framework]) => self.dotnet_params(manifest, stack, sdk, framework),
      (runtime, dependencies) => {
        warn!(runtime = %runtime, ?dependencies, "no cases for this dependency list");
        Vec::new()
      }
    };

    let cases = params
      .into_iter()
      .map(|params| self.case_for(params))
      .collect::<Result<Vec<_>, _>>()?;
    info!(runtime = %self.runtime(), stack = %stack, cases = cases.len(), "planned suite");
    Ok(cases)
  }

  fn select(&self, manifest: &DependencyManifest, name: &str, stack: &str) -> Vec<String> {
    match self.options.selection {
      Selection::All => manifest.versions(name, stack),
      Selection::Latest => manifest.latest(name, stack).into_iter().collect(),
    }
  }

  fn single_version(
    &self,
    manifest: &DependencyManifest,
    name: &str,
    stack: &str,
    build: impl Fn(String) -> FixtureParams,
  ) -> Vec<FixtureParams> {
    self.select(manifest, name, stack).into_iter().map(build).collect()
  }

  fn php_params(
    &self,
    manifest: &DependencyManifest,
    stack: &str,
    extensions: &ExtensionTable,
    php: &str,
    hhvm: &str,
  ) -> Result<Vec<FixtureParams>, ScenarioError> {
    let php_versions = self.select(manifest, php, stack);
    extensions.validate_coverage(&php_versions)?;
    let hhvm_versions = self.select(manifest, hhvm, stack);

    let mut params = Vec::new();
    for web_server in [WebServer::Httpd, WebServer::Nginx] {
      let Some(web_server_version) = manifest.latest(web_server.as_str(), stack) else {
        warn!(web_server = web_server.as_str(), stack = %stack, "web server not in manifest, skipping");
        continue;
      };
      for (vm, versions) in [(PhpVm::Php, &php_versions), (PhpVm::Hhvm, &hhvm_versions)] {
        params.extend(versions.iter().map(|version| FixtureParams::Php {
          vm,
          version: version.clone(),
          web_server,
          web_server_version: web_server_version.clone(),
        }));
      }
    }
    Ok(params)
  }

  fn dotnet_params(&self, manifest: &DependencyManifest, stack: &str, sdk: &str, framework: &str) -> Vec<FixtureParams> {
    let Some(runtime_version) = manifest.latest(framework, stack) else {
      warn!(stack = %stack, framework = %framework, "framework not in manifest, no .NET Core cases");
      return Vec::new();
    };
    self
      .select(manifest, sdk, stack)
      .into_iter()
      .map(|sdk_version| FixtureParams::DotnetCore {
        sdk_version,
        runtime_version: runtime_version.clone(),
      })
      .collect()
  }

  fn case_for(&self, params: FixtureParams) -> Result<Case, ScenarioError> {
    let mut checks: Vec<Check> = expected_logs(&params)?.into_iter().map(Check::Logged).collect();
    checks.extend(self.profile.body_checks()?);

    if self.options.service || self.options.uri_credentials {
      checks.push(Check::CredentialsAbsent);
    }
    if self.options.uri_credentials {
      let redacted = match self.options.caching {
        Caching::Cached => "https___-redacted-_-redacted-@",
        Caching::Uncached => "https://-redacted-:-redacted-@",
      };
      checks.push(Check::logged(redacted));
    }
    if self.options.profile_script {
      checks.push(Check::logged(PROFILE_SCRIPT_MARKER));
      checks.push(Check::BodyLacks {
        path: "/.profile".to_string(),
        text: PROFILE_SCRIPT_MARKER.to_string(),
      });
    }
    if self.options.bump_version {
      checks.push(Check::NotLogged(LogPattern::literal(BUMP_WARNING)));
    }

    Ok(Case {
      name: format!("{} {params}", self.runtime()),
      params,
      checks,
    })
  }

  /// Package the buildpack, run every case and clean up.
  ///
  /// Packaging failures abort the suite. Failures inside a case are recorded
  /// in the report and the next case runs.
  pub async fn run<R: Runner>(
    &self,
    cases: &[Case],
    stack: &str,
    harness: &Harness<R>,
  ) -> Result<SuiteReport, ScenarioError> {
    let mut report = SuiteReport::new(self.runtime(), stack);
    if cases.is_empty() {
      info!(runtime = %self.runtime(), stack = %stack, "no versions to test");
      report.record(
        format!("{} on {stack}", self.runtime()),
        CaseOutcome::Skipped {
          reason: format!("no {} versions for {stack}", self.runtime()),
        },
      );
      return Ok(report);
    }

    let driver = &harness.driver;
    let branch = harness.config.branch.as_str();
    let packaged = if self.options.uri_credentials {
      driver
        .package_with_uri_credentials(self.buildpack(), branch, self.options.caching)
        .await
    } else {
      driver.package(self.buildpack(), branch, self.options.caching).await
    };
    let packaged = match packaged {
      Ok(packaged) => packaged,
      Err(err) => {
        self.cleanup(driver).await;
        return Err(err.into());
      }
    };

    for case in cases {
      info!(case = %case.name, "running case");
      let outcome = match self.run_case(case, &packaged, stack, harness).await {
        Ok(outcome) => outcome,
        Err(err) => CaseOutcome::Failed {
          reason: err.to_string(),
        },
      };
      match &outcome {
        CaseOutcome::Failed { reason } => warn!(case = %case.name, reason = %reason, "case failed"),
        other => info!(case = %case.name, outcome = %other, "case finished"),
      }
      report.record(&case.name, outcome);
    }

    self.cleanup(driver).await;
    Ok(report)
  }

  async fn run_case<R: Runner>(
    &self,
    case: &Case,
    packaged: &PackagedBuildpack,
    stack: &str,
    harness: &Harness<R>,
  ) -> Result<CaseOutcome, ScenarioError> {
    let generator = harness.generator.clone();
    let params = case.params.clone();
    let fixture = tokio::task::spawn_blocking(move || generator.generate(DEFAULT_TEMPLATE, &params)).await??;
    if self.options.profile_script {
      fixture.add_profile_script()?;
    }

    let options = DeployOptions {
      service: self.options.service,
    };
    let mut app = harness.driver.deploy(&fixture, packaged, stack, options).await?;

    let result = self.verify(case, &mut app, packaged, harness).await;
    if let Err(err) = harness.driver.teardown(&mut app).await {
      warn!(app = %app.name, error = %err, "teardown failed");
    }
    result
  }

  async fn verify<R: Runner>(
    &self,
    case: &Case,
    app: &mut DeployedApplication,
    packaged: &PackagedBuildpack,
    harness: &Harness<R>,
  ) -> Result<CaseOutcome, ScenarioError> {
    harness.driver.refresh_logs(app).await?;
    let mut failures = evaluate_all(&case.checks, &harness.browser, app).await?;

    if self.options.bump_version {
      let version = harness.driver.bump_version(packaged).await?;
      debug!(app = %app.name, version = %version, "re-pushing after version bump");
      harness.driver.repush(app).await?;
      harness.driver.refresh_logs(app).await?;
      let after = [Check::Logged(LogPattern::literal(BUMP_WARNING))];
      failures.extend(evaluate_all(&after, &harness.browser, app).await?);
    }

    if failures.is_empty() {
      Ok(CaseOutcome::Passed)
    } else {
      Ok(CaseOutcome::Failed {
        reason: failures.join("; "),
      })
    }
  }

  async fn cleanup<R: Runner>(&self, driver: &Driver<R>) {
    if let Err(err) = driver.cleanup(self.buildpack()).await {
      warn!(buildpack = %self.buildpack(), error = %err, "buildpack cleanup failed");
    }
  }
}

async fn evaluate_all(checks: &[Check], browser: &Browser, app: &DeployedApplication) -> Result<Vec<String>, ObserveError> {
  let mut failures = Vec::new();
  for check in checks {
    if let Verdict::Fail(reason) = check.evaluate(browser, app).await? {
      failures.push(reason);
    }
  }
  Ok(failures)
}

/// Everything a suite run needs, built from one [`HarnessConfig`].
#[derive(Debug)]
pub struct Harness<R> {
  config: HarnessConfig,
  resolver: ManifestResolver,
  generator: Generator,
  driver: Driver<R>,
  browser: Browser,
}

impl<R: Runner> Harness<R> {
  pub fn new(config: &HarnessConfig, runner: R) -> Result<Self, ScenarioError> {
    Ok(Self {
      config: config.clone(),
      resolver: ManifestResolver::new(config),
      generator: Generator::new(config)?,
      driver: Driver::new(config, runner),
      browser: Browser::new(config),
    })
  }

  pub fn config(&self) -> &HarnessConfig {
    &self.config
  }

  pub fn driver(&self) -> &Driver<R> {
    &self.driver
  }

  pub fn generator(&self) -> &Generator {
    &self.generator
  }

  /// Resolve the manifest and run `suite` on every configured stack.
  pub async fn run(&self, suite: &Suite) -> Result<Vec<SuiteReport>, ScenarioError> {
    let manifest = self.resolver.resolve(suite.buildpack(), &self.config.branch).await?;

    let mut reports = Vec::with_capacity(self.config.stacks.len());
    for stack in &self.config.stacks {
      let cases = suite.plan(&manifest, stack, self.generator.extensions())?;
      reports.push(suite.run(&cases, stack, self).await?);
    }
    Ok(reports)
  }
}
