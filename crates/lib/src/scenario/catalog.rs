//! Per-runtime expectations.

use crate::fixture::{FixtureParams, PhpVm, Runtime};
use crate::observe::{Check, LogPattern, ObserveError};

/// Shape of a bcrypt hash as produced by the fixtures' `/bcrypt` routes.
const BCRYPT_HASH: &str = r"^\$2[aby]?\$\d{2}\$[./A-Za-z0-9]{53}$";

/// What a runtime's buildpack is and what a healthy deploy of it looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeProfile {
  pub runtime: Runtime,
  /// Source buildpack the fixture is pushed against.
  pub buildpack: &'static str,
  /// Manifest dependency names the versions come from, empty for runtimes
  /// without a pinned version.
  pub dependencies: &'static [&'static str],
  /// Text the fixture's `/` answers with.
  pub body: &'static str,
  /// Extra routes exercising native extensions and database drivers.
  pub endpoints: &'static [Endpoint],
}

/// A fixture route beyond `/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
  pub path: &'static str,
  pub answer: Answer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
  /// The body contains this text.
  Text(&'static str),
  /// The body is a freshly computed bcrypt hash.
  BcryptHash,
}

impl Endpoint {
  const fn text(path: &'static str, text: &'static str) -> Self {
    Self {
      path,
      answer: Answer::Text(text),
    }
  }

  const fn bcrypt() -> Self {
    Self {
      path: "/bcrypt",
      answer: Answer::BcryptHash,
    }
  }

  pub fn check(&self) -> Result<Check, ObserveError> {
    Ok(match self.answer {
      Answer::Text(text) => Check::body(self.path, text),
      Answer::BcryptHash => Check::BodyMatches {
        path: self.path.to_string(),
        pattern: LogPattern::regex(BCRYPT_HASH)?,
      },
    })
  }
}

const PYTHON_ENDPOINTS: &[Endpoint] = &[
  Endpoint::bcrypt(),
  Endpoint::text("/pg", "could not connect to server: No such file or directory"),
  Endpoint::text(
    "/mysql",
    "Can't connect to local MySQL server through socket '/var/run/mysqld/mysqld.sock'",
  ),
  Endpoint::text("/redis", "Hello"),
];

const RUBY_ENDPOINTS: &[Endpoint] = &[
  Endpoint::text("/nokogiri", "Hello, World"),
  Endpoint::text("/em", "Hello, EventMachine"),
  Endpoint::bcrypt(),
  Endpoint::text("/bson", "00040000"),
  Endpoint::text("/pg", "could not connect to server: No such file or directory"),
  Endpoint::text("/mysql", "Can't connect to local MySQL server through socket"),
];

// JDBC drivers report connection failures in their own words.
const JRUBY_ENDPOINTS: &[Endpoint] = &[
  Endpoint::text("/nokogiri", "Hello, World"),
  Endpoint::text("/em", "Hello, EventMachine"),
  Endpoint::bcrypt(),
  Endpoint::text("/bson", "00040000"),
  Endpoint::text("/pg", "The connection attempt failed."),
  Endpoint::text("/mysql", "Communications link failure"),
];

pub fn profile(runtime: Runtime) -> RuntimeProfile {
  let (dependencies, body, endpoints): (&'static [&'static str], &'static str, &'static [Endpoint]) = match runtime {
    Runtime::Nodejs => (&["node"], "Hello World!", &[]),
    Runtime::Python => (&["python"], "Hello, World", PYTHON_ENDPOINTS),
    Runtime::Go => (&["go"], "Hello, World", &[]),
    Runtime::Ruby => (&["ruby"], "Hello, World", RUBY_ENDPOINTS),
    Runtime::Jruby => (&["jruby"], "Hello, World", JRUBY_ENDPOINTS),
    Runtime::Php => (&["php", "hhvm"], "Hello World!", &[]),
    // SDK versions become cases, the newest framework is shared by all.
    Runtime::DotnetCore => (&["dotnet", "dotnet-framework"], "Hello World!", &[]),
    Runtime::Staticfile | Runtime::Binary => (&[], "Hello World!", &[]),
  };

  RuntimeProfile {
    runtime,
    buildpack: runtime.buildpack(),
    dependencies,
    body,
    endpoints,
  }
}

impl RuntimeProfile {
  /// Body checks for `/` and every extra endpoint.
  pub fn body_checks(&self) -> Result<Vec<Check>, ObserveError> {
    let mut checks = vec![Check::body("/", self.body)];
    for endpoint in self.endpoints {
      checks.push(endpoint.check()?);
    }
    Ok(checks)
  }
}

/// Staging output proving the buildpack installed the pinned version.
pub fn expected_logs(params: &FixtureParams) -> Result<Vec<LogPattern>, ObserveError> {
  let patterns = match params {
    FixtureParams::Nodejs { version } => vec![LogPattern::literal(format!("Downloading and installing node {version}"))],
    FixtureParams::Python { version } => {
      vec![LogPattern::regex(&format!("Installing.*python-{}", regex::escape(version)))?]
    }
    FixtureParams::Go { version } => vec![LogPattern::literal(format!("Installing go{version}"))],
    FixtureParams::Ruby { version } => vec![LogPattern::literal(format!("Using Ruby version: ruby-{version}"))],
    FixtureParams::Jruby {
      ruby_version,
      jruby_version,
    } => vec![LogPattern::literal(format!(
      "Using Ruby version: ruby-{ruby_version}-jruby-{jruby_version}"
    ))],
    FixtureParams::Php { vm, version, .. } => {
      let label = match vm {
        PhpVm::Php => "PHP",
        PhpVm::Hhvm => "HHVM",
      };
      vec![
        LogPattern::literal(format!("Installing {label}")),
        LogPattern::literal(format!("{label} {version}")),
      ]
    }
    FixtureParams::DotnetCore { sdk_version, .. } => vec![LogPattern::literal(format!("dotnet version: {sdk_version}"))],
    FixtureParams::Staticfile | FixtureParams::Binary => Vec::new(),
  };
  Ok(patterns)
}
