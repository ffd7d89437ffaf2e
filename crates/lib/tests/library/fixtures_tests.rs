use std::fs;
use std::path::PathBuf;

use brats_lib::config::HarnessConfig;
use brats_lib::consts::DEFAULT_TEMPLATE;
use brats_lib::fixture::{FixtureParams, Generator, PhpVm, WebServer};
use tempfile::TempDir;
use walkdir::WalkDir;

fn generator(work: &TempDir) -> Generator {
  let config = HarnessConfig {
    work_dir: work.path().to_path_buf(),
    fixtures_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../fixtures"),
    ..HarnessConfig::default()
  };
  Generator::new(&config).unwrap()
}

fn every_runtime() -> Vec<FixtureParams> {
  vec![
    FixtureParams::Nodejs {
      version: "6.10.0".to_string(),
    },
    FixtureParams::Python {
      version: "3.6.0".to_string(),
    },
    FixtureParams::Go {
      version: "1.8".to_string(),
    },
    FixtureParams::Ruby {
      version: "2.4.0".to_string(),
    },
    FixtureParams::Jruby {
      ruby_version: "2.3.1".to_string(),
      jruby_version: "9.1.7.0".to_string(),
    },
    FixtureParams::Php {
      vm: PhpVm::Php,
      version: "5.6.30".to_string(),
      web_server: WebServer::Httpd,
      web_server_version: "2.4.25".to_string(),
    },
    FixtureParams::Php {
      vm: PhpVm::Hhvm,
      version: "3.18.1".to_string(),
      web_server: WebServer::Nginx,
      web_server_version: "1.11.10".to_string(),
    },
    FixtureParams::DotnetCore {
      sdk_version: "1.0.0-preview2-003156".to_string(),
      runtime_version: "1.0.3".to_string(),
    },
    FixtureParams::Staticfile,
    FixtureParams::Binary,
  ]
}

// =============================================================================
// Templates
// =============================================================================

#[test]
fn every_template_pins_the_requested_version() {
  let work = TempDir::new().unwrap();
  let generator = generator(&work);

  for params in every_runtime() {
    let fixture = generator.generate(DEFAULT_TEMPLATE, &params).unwrap();
    assert_eq!(
      fixture.pinned_version().unwrap(),
      params.primary_version(),
      "pinned version of {params}"
    );
  }
}

#[test]
fn rendered_files_have_no_placeholders_left() {
  let work = TempDir::new().unwrap();
  let generator = generator(&work);

  for params in every_runtime() {
    let fixture = generator.generate(DEFAULT_TEMPLATE, &params).unwrap();
    for entry in WalkDir::new(fixture.path()).into_iter().map(Result::unwrap) {
      if !entry.file_type().is_file() {
        continue;
      }
      let content = fs::read_to_string(entry.path()).unwrap_or_default();
      assert!(!content.contains("$${"), "{} still has a placeholder", entry.path().display());
    }
  }
}

#[test]
fn jruby_gemfile_names_the_engine() {
  let work = TempDir::new().unwrap();
  let fixture = generator(&work)
    .generate(
      DEFAULT_TEMPLATE,
      &FixtureParams::Jruby {
        ruby_version: "2.3.1".to_string(),
        jruby_version: "9.1.7.0".to_string(),
      },
    )
    .unwrap();

  let gemfile = fs::read_to_string(fixture.path().join("Gemfile")).unwrap();
  assert!(gemfile.contains("ruby '2.3.1', engine: 'jruby', engine_version: '9.1.7.0'"));
  assert!(fixture.path().join(".jrubyrc").exists());
}

#[test]
fn static_templates_are_untouched() {
  let work = TempDir::new().unwrap();
  generator(&work)
    .generate(
      DEFAULT_TEMPLATE,
      &FixtureParams::Python {
        version: "2.7.13".to_string(),
      },
    )
    .unwrap();

  let template = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/python/simple_brats/runtime.txt");
  assert_eq!(fs::read_to_string(template).unwrap().trim(), "python-$${var:python_version}");
}
