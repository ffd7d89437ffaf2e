//! Application push, readiness polling and teardown.

use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, info, warn};

use super::{DeployedApplication, Driver, DriverError, PackagedBuildpack, already_gone};
use crate::consts::{SERVICE_PASSWORD, SERVICE_USERNAME};
use crate::exec::{ExecError, Runner};
use crate::fixture::{FixtureTemplate, Runtime};
use crate::util::hash::short_hash;

static APP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Extra setup performed between push and start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeployOptions {
  /// Create and bind a user-provided service holding test credentials.
  pub service: bool,
}

impl<R: Runner> Driver<R> {
  /// Push `fixture` against `packaged` on `stack`, start it and wait for a
  /// running instance. Whatever was created is deleted again if any step
  /// fails.
  pub async fn deploy(
    &self,
    fixture: &FixtureTemplate,
    packaged: &PackagedBuildpack,
    stack: &str,
    options: DeployOptions,
  ) -> Result<DeployedApplication, DriverError> {
    let name = app_name(fixture.runtime());
    let mut app = DeployedApplication::new(
      &name,
      "",
      fixture.path(),
      &packaged.name,
      stack,
      self.config.app_log(&name),
    );
    if options.service {
      app.service = Some(format!("{name}-service"));
    }

    info!(app = %name, buildpack = %packaged.name, stack = %stack, "deploying fixture");
    match self.bring_up(&mut app).await {
      Ok(()) => {
        info!(app = %app.name, route = %app.route, "application running");
        Ok(app)
      }
      Err(err) => {
        warn!(app = %app.name, error = %err, "deploy failed, removing partial application");
        if let Err(cleanup) = self.teardown(&mut app).await {
          warn!(app = %app.name, error = %cleanup, "could not remove partial application");
        }
        Err(err)
      }
    }
  }

  /// Push the same fixture again, e.g. after the buildpack was updated in
  /// place, and wait for it to come back up.
  pub async fn repush(&self, app: &mut DeployedApplication) -> Result<(), DriverError> {
    info!(app = %app.name, "re-pushing application");
    let cmd = self
      .cf()
      .args(["push", app.name.as_str(), "-p"])
      .arg(app.fixture_path.to_string_lossy())
      .args(["-b", app.buildpack.as_str(), "-s", app.stack.as_str()])
      .capture_to(&app.log_path);
    let deadline = Instant::now() + self.config.deploy_timeout;
    self
      .before(deadline, &app.name, self.runner.run(&cmd))
      .await?
      .map_err(|source| DriverError::Push {
        app: app.name.clone(),
        source,
      })?;

    let status = self.wait_until_running(&app.name, deadline).await?;
    if let Some(route) = parse_route(&status) {
      app.route = route;
    }
    Ok(())
  }

  /// Append the platform's recent log lines for `app` to its capture log.
  pub async fn refresh_logs(&self, app: &DeployedApplication) -> Result<(), DriverError> {
    let cmd = self
      .cf()
      .args(["logs", app.name.as_str(), "--recent"])
      .capture_to(&app.log_path);
    self.runner.run(&cmd).await.map_err(|source| DriverError::Logs {
      app: app.name.clone(),
      source,
    })?;
    debug!(app = %app.name, log = ?app.log_path, "refreshed recent logs");
    Ok(())
  }

  /// Delete the application and its service. Calling it again, or on an app
  /// the platform no longer knows, succeeds.
  pub async fn teardown(&self, app: &mut DeployedApplication) -> Result<(), DriverError> {
    if app.deleted {
      debug!(app = %app.name, "application already torn down");
      return Ok(());
    }

    let delete_app = self
      .cf()
      .args(["delete", app.name.as_str(), "-f", "-r"])
      .capture_to(&app.log_path);
    let app_deleted = self.delete_quietly(&app.name, self.runner.run(&delete_app).await);

    // The service is released even when the app delete failed.
    let service_deleted = match &app.service {
      Some(service) => {
        let delete_service = self
          .cf()
          .args(["delete-service", service.as_str(), "-f"])
          .capture_to(&app.log_path);
        self.delete_quietly(service, self.runner.run(&delete_service).await)
      }
      None => Ok(()),
    };
    app_deleted.and(service_deleted)?;

    app.deleted = true;
    info!(app = %app.name, "application torn down");
    Ok(())
  }

  async fn bring_up(&self, app: &mut DeployedApplication) -> Result<(), DriverError> {
    let push_error = |source| DriverError::Push {
      app: app.name.clone(),
      source,
    };

    let push = self
      .cf()
      .args(["push", app.name.as_str(), "-p"])
      .arg(app.fixture_path.to_string_lossy())
      .args(["-b", app.buildpack.as_str(), "-s", app.stack.as_str(), "--no-start"])
      .capture_to(&app.log_path);
    self.runner.run(&push).await.map_err(push_error)?;

    if let Some(service) = &app.service {
      let credentials = serde_json::json!({
        "username": SERVICE_USERNAME,
        "password": SERVICE_PASSWORD,
      });
      let create = self
        .cf()
        .args(["create-user-provided-service", service.as_str(), "-p"])
        .secret_arg(credentials.to_string());
      self.runner.run(&create).await.map_err(push_error)?;

      let bind = self
        .cf()
        .args(["bind-service", app.name.as_str(), service.as_str()])
        .capture_to(&app.log_path);
      self.runner.run(&bind).await.map_err(push_error)?;
      debug!(app = %app.name, service = %service, "bound user-provided service");
    }

    let deadline = Instant::now() + self.config.deploy_timeout;
    let start = self
      .cf()
      .args(["start", app.name.as_str()])
      .capture_to(&app.log_path);
    self
      .before(deadline, &app.name, self.runner.run(&start))
      .await?
      .map_err(push_error)?;

    let status = self.wait_until_running(&app.name, deadline).await?;
    app.route = parse_route(&status).unwrap_or_else(|| {
      warn!(app = %app.name, "no route in app status, using app name");
      app.name.clone()
    });
    Ok(())
  }

  /// Poll `cf app` until an instance reports running or `deadline` passes.
  /// Returns the last status output.
  async fn wait_until_running(&self, name: &str, deadline: Instant) -> Result<String, DriverError> {
    let status = self.cf().args(["app", name]);

    loop {
      match self.before(deadline, name, self.runner.run(&status)).await? {
        Ok(output) if reports_running(&output.stdout) => return Ok(output.stdout),
        Ok(_) => debug!(app = %name, "no running instance yet"),
        Err(err) => debug!(app = %name, error = %err, "app status unavailable"),
      }

      if Instant::now() >= deadline {
        return Err(self.deployment_timeout(name));
      }
      sleep(self.config.poll_interval).await;
    }
  }

  /// Await `command`, giving up with `DeploymentTimeout` at `deadline`.
  async fn before<T>(&self, deadline: Instant, name: &str, command: impl Future<Output = T>) -> Result<T, DriverError> {
    timeout_at(deadline, command).await.map_err(|_| {
      warn!(app = %name, "platform command still running at the deploy deadline");
      self.deployment_timeout(name)
    })
  }

  fn deployment_timeout(&self, name: &str) -> DriverError {
    DriverError::DeploymentTimeout {
      app: name.to_string(),
      timeout: self.config.deploy_timeout,
    }
  }

  fn delete_quietly(&self, resource: &str, result: Result<impl Sized, ExecError>) -> Result<(), DriverError> {
    match result {
      Ok(_) => Ok(()),
      Err(err) if already_gone(&err) => {
        warn!(resource = %resource, "already deleted on the platform");
        Ok(())
      }
      Err(source) => Err(DriverError::Teardown {
        resource: resource.to_string(),
        source,
      }),
    }
  }
}

/// A fresh application name: `simple-{runtime}-{unix seconds}-{4 hex}`.
pub fn app_name(runtime: Runtime) -> String {
  let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
  let seed = format!(
    "{}-{}-{}",
    now.as_nanos(),
    process::id(),
    APP_COUNTER.fetch_add(1, Ordering::Relaxed)
  );
  let suffix: String = short_hash(&seed).chars().take(4).collect();
  format!("simple-{}-{}-{suffix}", runtime.as_str(), now.as_secs())
}

/// First route from `cf app` output, read from its `routes:` or `urls:` line.
pub fn parse_route(status: &str) -> Option<String> {
  status.lines().find_map(|line| {
    let (key, value) = line.trim_start().split_once(':')?;
    if key != "routes" && key != "urls" {
      return None;
    }
    value
      .split(',')
      .map(str::trim)
      .find(|route| !route.is_empty())
      .map(str::to_string)
  })
}

/// Whether `cf app` output lists at least one instance in the running state.
pub fn reports_running(status: &str) -> bool {
  status.lines().any(|line| {
    let mut fields = line.split_whitespace();
    let index = fields.next().unwrap_or_default();
    index.len() > 1
      && index.starts_with('#')
      && index[1..].bytes().all(|b| b.is_ascii_digit())
      && fields.next().is_some_and(|state| state.eq_ignore_ascii_case("running"))
  })
}
