//! Generated descriptor files.
//!
//! These are written as compact JSON with a fixed key order because the
//! buildpacks under test read them verbatim. Each writer has a matching
//! reader used to recover the pinned runtime version.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::GenerateError;
use super::params::{FixtureParams, PhpVm, WebServer};

pub const PACKAGE_JSON: &str = "package.json";
pub const OPTIONS_JSON: &str = ".bp-config/options.json";
pub const PROJECT_JSON: &str = "project.json";
pub const GLOBAL_JSON: &str = "global.json";
pub const RUNTIME_TXT: &str = "runtime.txt";
pub const GODEPS_JSON: &str = "Godeps/Godeps.json";
pub const GEMFILE: &str = "Gemfile";

// ============================================================================
// nodejs
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct PackageJson {
  pub name: String,
  pub version: String,
  pub description: String,
  pub main: String,
  pub engines: Engines,
  #[serde(default)]
  pub dependencies: NodeDependencies,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Engines {
  pub node: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NodeDependencies {
  pub bcrypt: String,
  #[serde(rename = "bson-ext")]
  pub bson_ext: String,
}

impl PackageJson {
  pub fn for_node(version: &str) -> Self {
    Self {
      name: "node_web_app".to_string(),
      version: "0.0.0".to_string(),
      description: "hello, world".to_string(),
      main: "server.js".to_string(),
      engines: Engines {
        node: version.to_string(),
      },
      dependencies: NodeDependencies {
        bcrypt: "0.8.6".to_string(),
        bson_ext: "0.1.13".to_string(),
      },
    }
  }
}

// ============================================================================
// php
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct PhpOptions {
  #[serde(rename = "PHP_VM")]
  pub php_vm: String,
  #[serde(rename = "PHP_VERSION", default, skip_serializing_if = "Option::is_none")]
  pub php_version: Option<String>,
  #[serde(rename = "HHVM_VERSION", default, skip_serializing_if = "Option::is_none")]
  pub hhvm_version: Option<String>,
  #[serde(rename = "WEB_SERVER")]
  pub web_server: String,
  #[serde(rename = "PHP_EXTENSIONS", default, skip_serializing_if = "Option::is_none")]
  pub php_extensions: Option<Vec<String>>,
  #[serde(rename = "ZEND_EXTENSIONS", default, skip_serializing_if = "Option::is_none")]
  pub zend_extensions: Option<Vec<String>>,
  /// `<WEBSERVER>_VERSION`
  #[serde(flatten)]
  pub web_server_version: BTreeMap<String, String>,
}

impl PhpOptions {
  pub fn new(
    vm: PhpVm,
    version: &str,
    web_server: WebServer,
    web_server_version: &str,
    extensions: Option<&[String]>,
    zend_extensions: &[String],
  ) -> Self {
    let (php_version, hhvm_version, php_extensions, zend_extensions) = match vm {
      PhpVm::Php => (
        Some(version.to_string()),
        None,
        extensions.map(<[String]>::to_vec),
        Some(zend_extensions.to_vec()),
      ),
      PhpVm::Hhvm => (None, Some(version.to_string()), None, None),
    };

    Self {
      php_vm: vm.as_str().to_string(),
      php_version,
      hhvm_version,
      web_server: web_server.as_str().to_string(),
      php_extensions,
      zend_extensions,
      web_server_version: BTreeMap::from([(web_server.version_key(), web_server_version.to_string())]),
    }
  }

  pub fn runtime_version(&self) -> Option<&str> {
    self.php_version.as_deref().or(self.hhvm_version.as_deref())
  }
}

// ============================================================================
// dotnet-core
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectJson {
  #[serde(rename = "buildOptions")]
  pub build_options: BuildOptions,
  pub dependencies: DotnetDependencies,
  pub frameworks: Frameworks,
  pub tools: Tools,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BuildOptions {
  #[serde(rename = "emitEntryPoint")]
  pub emit_entry_point: bool,
  #[serde(rename = "debugType")]
  pub debug_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DotnetDependencies {
  #[serde(rename = "Microsoft.AspNetCore.Server.IISIntegration")]
  pub iis_integration: String,
  #[serde(rename = "Microsoft.AspNetCore.Server.Kestrel")]
  pub kestrel: String,
  #[serde(rename = "Microsoft.NETCore.App")]
  pub netcore_app: PlatformDependency,
  #[serde(rename = "Microsoft.Extensions.Configuration.CommandLine")]
  pub command_line: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlatformDependency {
  #[serde(rename = "type")]
  pub kind: String,
  pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Frameworks {
  #[serde(rename = "netcoreapp1.0")]
  pub netcoreapp: Empty,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Empty {}

#[derive(Debug, Serialize, Deserialize)]
pub struct Tools {
  #[serde(rename = "Microsoft.AspNetCore.Server.IISIntegration.Tools")]
  pub iis_integration_tools: ToolReference,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolReference {
  pub version: String,
  pub imports: String,
}

impl ProjectJson {
  pub fn new(sdk_version: &str, runtime_version: &str) -> Self {
    Self {
      build_options: BuildOptions {
        emit_entry_point: true,
        debug_type: "portable".to_string(),
      },
      dependencies: DotnetDependencies {
        iis_integration: "1.*".to_string(),
        kestrel: "1.*".to_string(),
        netcore_app: PlatformDependency {
          kind: "platform".to_string(),
          version: runtime_version.to_string(),
        },
        command_line: "1.*".to_string(),
      },
      frameworks: Frameworks { netcoreapp: Empty {} },
      tools: Tools {
        iis_integration_tools: ToolReference {
          version: sdk_version.to_string(),
          imports: "portable-net45+wp80+win8+wpa81+dnxcore50".to_string(),
        },
      },
    }
  }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GlobalJson {
  pub projects: Vec<String>,
  pub sdk: Sdk,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Sdk {
  pub version: String,
}

impl GlobalJson {
  pub fn new(sdk_version: &str) -> Self {
    Self {
      projects: vec!["src".to_string(), "test".to_string()],
      sdk: Sdk {
        version: sdk_version.to_string(),
      },
    }
  }
}

#[derive(Debug, Deserialize)]
struct Godeps {
  #[serde(rename = "GoVersion")]
  go_version: String,
}

// ============================================================================
// Writing and reading
// ============================================================================

/// Write the generated descriptors for `params` into `dir`.
pub fn write_descriptors(
  dir: &Path,
  params: &FixtureParams,
  extensions: Option<&[String]>,
  zend_extensions: &[String],
) -> Result<(), GenerateError> {
  match params {
    FixtureParams::Nodejs { version } => write_json(&dir.join(PACKAGE_JSON), &PackageJson::for_node(version)),
    FixtureParams::Php {
      vm,
      version,
      web_server,
      web_server_version,
    } => {
      let options = PhpOptions::new(*vm, version, *web_server, web_server_version, extensions, zend_extensions);
      write_json(&dir.join(OPTIONS_JSON), &options)
    }
    FixtureParams::DotnetCore {
      sdk_version,
      runtime_version,
    } => {
      write_json(&dir.join(PROJECT_JSON), &ProjectJson::new(sdk_version, runtime_version))?;
      write_json(&dir.join(GLOBAL_JSON), &GlobalJson::new(sdk_version))
    }
    _ => Ok(()),
  }
}

/// Read back the runtime version a generated fixture pins.
pub fn read_pinned_version(dir: &Path, params: &FixtureParams) -> Result<Option<String>, GenerateError> {
  let version = match params {
    FixtureParams::Nodejs { .. } => {
      let package: PackageJson = read_json(&dir.join(PACKAGE_JSON))?;
      package.engines.node
    }
    FixtureParams::Python { .. } => {
      let path = dir.join(RUNTIME_TXT);
      let content = read_text(&path)?;
      content
        .trim()
        .strip_prefix("python-")
        .map(str::to_string)
        .ok_or_else(|| render_error(&path, "runtime.txt does not start with 'python-'"))?
    }
    FixtureParams::Go { .. } => {
      let path = dir.join(GODEPS_JSON);
      let godeps: Godeps = read_json(&path)?;
      godeps
        .go_version
        .strip_prefix("go")
        .map(str::to_string)
        .ok_or_else(|| render_error(&path, "GoVersion does not start with 'go'"))?
    }
    FixtureParams::Ruby { .. } => {
      let path = dir.join(GEMFILE);
      let (ruby, _) = gemfile_ruby(&path)?;
      ruby
    }
    FixtureParams::Jruby { .. } => {
      let path = dir.join(GEMFILE);
      let (ruby, engine) = gemfile_ruby(&path)?;
      let engine = engine.ok_or_else(|| render_error(&path, "Gemfile has no engine_version"))?;
      format!("ruby-{ruby}-jruby-{engine}")
    }
    FixtureParams::Php { .. } => {
      let path = dir.join(OPTIONS_JSON);
      let options: PhpOptions = read_json(&path)?;
      options
        .runtime_version()
        .map(str::to_string)
        .ok_or_else(|| render_error(&path, "options.json has no runtime version"))?
    }
    FixtureParams::DotnetCore { .. } => {
      let global: GlobalJson = read_json(&dir.join(GLOBAL_JSON))?;
      global.sdk.version
    }
    FixtureParams::Staticfile | FixtureParams::Binary => return Ok(None),
  };

  Ok(Some(version))
}

/// `(ruby_version, engine_version)` from a Gemfile `ruby` directive.
fn gemfile_ruby(path: &Path) -> Result<(String, Option<String>), GenerateError> {
  let content = read_text(path)?;
  let pattern = Regex::new(r#"(?m)^\s*ruby\s+['"]([^'"]+)['"](?:.*engine_version:\s*['"]([^'"]+)['"])?"#)
    .map_err(|e| render_error(path, &e.to_string()))?;
  let captures = pattern
    .captures(&content)
    .ok_or_else(|| render_error(path, "Gemfile has no ruby directive"))?;
  Ok((
    captures[1].to_string(),
    captures.get(2).map(|m| m.as_str().to_string()),
  ))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), GenerateError> {
  let json = serde_json::to_string(value).map_err(|e| render_error(path, &e.to_string()))?;
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).map_err(|source| GenerateError::Io {
      path: parent.to_path_buf(),
      source,
    })?;
  }
  fs::write(path, json).map_err(|source| GenerateError::Io {
    path: path.to_path_buf(),
    source,
  })
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, GenerateError> {
  let content = read_text(path)?;
  serde_json::from_str(&content).map_err(|e| render_error(path, &e.to_string()))
}

fn read_text(path: &Path) -> Result<String, GenerateError> {
  fs::read_to_string(path).map_err(|source| GenerateError::Io {
    path: path.to_path_buf(),
    source,
  })
}

fn render_error(path: &Path, message: &str) -> GenerateError {
  GenerateError::Render {
    path: PathBuf::from(path),
    message: message.to_string(),
  }
}
