//! Runtimes and the version parameters each one is generated from.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::placeholder::Vars;

/// A runtime with a fixture template under `fixtures/<runtime>/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Runtime {
  Nodejs,
  Python,
  Go,
  Ruby,
  Jruby,
  Php,
  DotnetCore,
  Staticfile,
  Binary,
}

impl Runtime {
  pub const ALL: [Runtime; 9] = [
    Runtime::Nodejs,
    Runtime::Python,
    Runtime::Go,
    Runtime::Ruby,
    Runtime::Jruby,
    Runtime::Php,
    Runtime::DotnetCore,
    Runtime::Staticfile,
    Runtime::Binary,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Runtime::Nodejs => "nodejs",
      Runtime::Python => "python",
      Runtime::Go => "go",
      Runtime::Ruby => "ruby",
      Runtime::Jruby => "jruby",
      Runtime::Php => "php",
      Runtime::DotnetCore => "dotnet-core",
      Runtime::Staticfile => "staticfile",
      Runtime::Binary => "binary",
    }
  }

  /// Buildpack that stages this runtime.
  pub fn buildpack(self) -> &'static str {
    match self {
      Runtime::Jruby => "ruby",
      other => other.as_str(),
    }
  }

  /// Directory between the runtime root and the template name.
  ///
  /// Go apps must sit under a `src/` tree.
  pub fn template_prefix(self) -> Option<&'static str> {
    match self {
      Runtime::Go => Some("src"),
      _ => None,
    }
  }
}

impl fmt::Display for Runtime {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Runtime {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Runtime::ALL
      .into_iter()
      .find(|r| r.as_str() == s)
      .ok_or_else(|| format!("unknown runtime '{s}'"))
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhpVm {
  Php,
  Hhvm,
}

impl PhpVm {
  pub fn as_str(self) -> &'static str {
    match self {
      PhpVm::Php => "php",
      PhpVm::Hhvm => "hhvm",
    }
  }
}

impl FromStr for PhpVm {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "php" => Ok(PhpVm::Php),
      "hhvm" => Ok(PhpVm::Hhvm),
      other => Err(format!("unknown PHP VM '{other}' (expected php or hhvm)")),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebServer {
  Httpd,
  Nginx,
}

impl WebServer {
  pub const ALL: [WebServer; 2] = [WebServer::Httpd, WebServer::Nginx];

  pub fn as_str(self) -> &'static str {
    match self {
      WebServer::Httpd => "httpd",
      WebServer::Nginx => "nginx",
    }
  }

  /// Key of the version entry in `options.json`.
  pub fn version_key(self) -> String {
    format!("{}_VERSION", self.as_str().to_uppercase())
  }
}

impl FromStr for WebServer {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "httpd" => Ok(WebServer::Httpd),
      "nginx" => Ok(WebServer::Nginx),
      other => Err(format!("unknown web server '{other}' (expected httpd or nginx)")),
    }
  }
}

/// Version parameters for one fixture generation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "runtime", rename_all = "kebab-case")]
pub enum FixtureParams {
  Nodejs {
    version: String,
  },
  Python {
    version: String,
  },
  Go {
    version: String,
  },
  Ruby {
    version: String,
  },
  Jruby {
    ruby_version: String,
    jruby_version: String,
  },
  Php {
    vm: PhpVm,
    version: String,
    web_server: WebServer,
    web_server_version: String,
  },
  DotnetCore {
    sdk_version: String,
    runtime_version: String,
  },
  Staticfile,
  Binary,
}

impl FixtureParams {
  pub fn runtime(&self) -> Runtime {
    match self {
      FixtureParams::Nodejs { .. } => Runtime::Nodejs,
      FixtureParams::Python { .. } => Runtime::Python,
      FixtureParams::Go { .. } => Runtime::Go,
      FixtureParams::Ruby { .. } => Runtime::Ruby,
      FixtureParams::Jruby { .. } => Runtime::Jruby,
      FixtureParams::Php { .. } => Runtime::Php,
      FixtureParams::DotnetCore { .. } => Runtime::DotnetCore,
      FixtureParams::Staticfile => Runtime::Staticfile,
      FixtureParams::Binary => Runtime::Binary,
    }
  }

  /// Build JRuby parameters from a manifest version such as
  /// `ruby-2.3.1-jruby-9.1.5.0`.
  pub fn jruby_from_manifest(version: &str) -> Option<Self> {
    let pattern = Regex::new(r"^ruby-(.+?)-jruby-(.+)$").ok()?;
    let captures = pattern.captures(version)?;
    Some(FixtureParams::Jruby {
      ruby_version: captures[1].to_string(),
      jruby_version: captures[2].to_string(),
    })
  }

  /// The version a generated fixture pins, in the form the manifest and the
  /// buildpack's staging output use. `None` for version-less runtimes.
  pub fn primary_version(&self) -> Option<String> {
    match self {
      FixtureParams::Nodejs { version }
      | FixtureParams::Python { version }
      | FixtureParams::Go { version }
      | FixtureParams::Ruby { version }
      | FixtureParams::Php { version, .. } => Some(version.clone()),
      FixtureParams::Jruby {
        ruby_version,
        jruby_version,
      } => Some(format!("ruby-{ruby_version}-jruby-{jruby_version}")),
      FixtureParams::DotnetCore { sdk_version, .. } => Some(sdk_version.clone()),
      FixtureParams::Staticfile | FixtureParams::Binary => None,
    }
  }

  fn key_parts(&self) -> Vec<&str> {
    match self {
      FixtureParams::Nodejs { version }
      | FixtureParams::Python { version }
      | FixtureParams::Go { version }
      | FixtureParams::Ruby { version } => vec![version.as_str()],
      FixtureParams::Jruby {
        ruby_version,
        jruby_version,
      } => vec![ruby_version.as_str(), jruby_version.as_str()],
      FixtureParams::Php {
        vm,
        version,
        web_server,
        web_server_version,
      } => vec![vm.as_str(), version.as_str(), web_server.as_str(), web_server_version.as_str()],
      FixtureParams::DotnetCore {
        sdk_version,
        runtime_version,
      } => vec![sdk_version.as_str(), runtime_version.as_str()],
      FixtureParams::Staticfile | FixtureParams::Binary => vec!["default"],
    }
  }

  /// Directory name derived from every parameter.
  ///
  /// Parts are joined with `_`; any character outside `[A-Za-z0-9.-]`
  /// (including `_` itself) and a dot at either end of a part is written as
  /// `~XX`, so distinct parameters never map to the same key and a key is
  /// always a single plain directory name.
  pub fn key(&self) -> String {
    self
      .key_parts()
      .into_iter()
      .map(escape_key_part)
      .collect::<Vec<_>>()
      .join("_")
  }

  /// Placeholder bindings used when rendering the template files.
  pub fn vars(&self) -> Vars {
    match self {
      FixtureParams::Nodejs { version } => Vars::new().with("node_version", version.as_str()),
      FixtureParams::Python { version } => Vars::new().with("python_version", version.as_str()),
      FixtureParams::Go { version } => Vars::new().with("go_version", version.as_str()),
      FixtureParams::Ruby { version } => Vars::new()
        .with("ruby_version", version.as_str())
        .with("engine", "ruby")
        .with("engine_version", version.as_str()),
      FixtureParams::Jruby {
        ruby_version,
        jruby_version,
      } => Vars::new()
        .with("ruby_version", ruby_version.as_str())
        .with("engine", "jruby")
        .with("engine_version", jruby_version.as_str())
        .with("jruby_version", jruby_version.as_str()),
      FixtureParams::Php {
        vm,
        version,
        web_server,
        web_server_version,
      } => Vars::new()
        .with("php_vm", vm.as_str())
        .with("php_version", version.as_str())
        .with("web_server", web_server.as_str())
        .with("web_server_version", web_server_version.as_str()),
      FixtureParams::DotnetCore {
        sdk_version,
        runtime_version,
      } => Vars::new()
        .with("sdk_version", sdk_version.as_str())
        .with("runtime_version", runtime_version.as_str()),
      FixtureParams::Staticfile | FixtureParams::Binary => Vars::new(),
    }
  }
}

impl fmt::Display for FixtureParams {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FixtureParams::Php {
        vm,
        version,
        web_server,
        web_server_version,
      } => write!(f, "{}-{version} with {}-{web_server_version}", vm.as_str(), web_server.as_str()),
      FixtureParams::DotnetCore {
        sdk_version,
        runtime_version,
      } => write!(f, "dotnet-core sdk {sdk_version} runtime {runtime_version}"),
      other => match other.primary_version() {
        Some(version) => write!(f, "{} {version}", other.runtime()),
        None => write!(f, "{}", other.runtime()),
      },
    }
  }
}

fn escape_key_part(part: &str) -> String {
  let mut escaped = String::with_capacity(part.len());
  for (index, byte) in part.bytes().enumerate() {
    // edge dots are escaped: `.` and `..` must not act as path components,
    // and Windows drops a trailing dot from directory names
    let keep_dot = byte == b'.' && index > 0 && index + 1 < part.len();
    if byte.is_ascii_alphanumeric() || keep_dot || byte == b'-' {
      escaped.push(byte as char);
    } else {
      escaped.push_str(&format!("~{byte:02X}"));
    }
  }
  if escaped.is_empty() { "~".to_string() } else { escaped }
}
