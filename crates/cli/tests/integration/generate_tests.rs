use std::fs;

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn generates_node_fixture_with_pinned_engine() {
  let env = TestEnv::new();

  let output = env
    .brats_cmd()
    .args(["generate", "nodejs", "--version", "6.10.0"])
    .assert()
    .success()
    .get_output()
    .stdout
    .clone();

  let path = TestEnv::generated_path(&output);
  assert!(path.starts_with(env.work_path()));
  assert!(path.ends_with("fixtures/nodejs/6.10.0/simple_brats"));

  let package: serde_json::Value = serde_json::from_str(&fs::read_to_string(path.join("package.json")).unwrap()).unwrap();
  assert_eq!(package["engines"]["node"], "6.10.0");
  assert!(path.join("server.js").exists());
}

#[test]
fn generates_python_runtime_file() {
  let env = TestEnv::new();

  let output = env
    .brats_cmd()
    .args(["generate", "python", "--version", "3.5.2"])
    .assert()
    .success()
    .get_output()
    .stdout
    .clone();

  let path = TestEnv::generated_path(&output);
  let runtime = fs::read_to_string(path.join("runtime.txt")).unwrap();
  assert_eq!(runtime.trim(), "python-3.5.2");
}

#[test]
fn generates_go_fixture_under_src() {
  let env = TestEnv::new();

  let output = env
    .brats_cmd()
    .args(["generate", "go", "--version", "1.8"])
    .assert()
    .success()
    .get_output()
    .stdout
    .clone();

  let path = TestEnv::generated_path(&output);
  assert!(path.ends_with("src/simple_brats"));
  let godeps = fs::read_to_string(path.join("Godeps/Godeps.json")).unwrap();
  assert!(godeps.contains("\"GoVersion\": \"go1.8\""));
}

#[test]
fn generates_php_options() {
  let env = TestEnv::new();

  let output = env
    .brats_cmd()
    .args([
      "generate",
      "php",
      "--version",
      "7.0.16",
      "--web-server",
      "nginx",
      "--web-server-version",
      "1.11.10",
    ])
    .assert()
    .success()
    .get_output()
    .stdout
    .clone();

  let path = TestEnv::generated_path(&output);
  let options: serde_json::Value =
    serde_json::from_str(&fs::read_to_string(path.join(".bp-config/options.json")).unwrap()).unwrap();
  assert_eq!(options["PHP_VERSION"], "7.0.16");
  assert_eq!(options["WEB_SERVER"], "nginx");
  assert_eq!(options["NGINX_VERSION"], "1.11.10");
  assert!(
    options["PHP_EXTENSIONS"]
      .as_array()
      .unwrap()
      .iter()
      .any(|e| e == "mongodb")
  );
}

#[test]
fn profile_script_is_added() {
  let env = TestEnv::new();

  let output = env
    .brats_cmd()
    .args(["generate", "staticfile", "--profile-script"])
    .assert()
    .success()
    .get_output()
    .stdout
    .clone();

  let path = TestEnv::generated_path(&output);
  let profile = fs::read_to_string(path.join(".profile")).unwrap();
  assert!(profile.contains("PROFILE_SCRIPT_IS_PRESENT_AND_RAN"));
}

#[test]
fn regenerating_is_idempotent() {
  let env = TestEnv::new();

  let first = env
    .brats_cmd()
    .args(["generate", "ruby", "--version", "2.3.3"])
    .assert()
    .success()
    .get_output()
    .stdout
    .clone();
  let second = env
    .brats_cmd()
    .args(["generate", "ruby", "--version", "2.3.3"])
    .assert()
    .success()
    .get_output()
    .stdout
    .clone();

  assert_eq!(TestEnv::generated_path(&first), TestEnv::generated_path(&second));
}

#[test]
fn missing_template_is_reported() {
  let env = TestEnv::with_own_templates();
  env.write_template("nodejs/simple_brats/server.js", "// hi\n");

  env
    .brats_cmd()
    .args(["generate", "binary"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("template"));
}

#[test]
fn unknown_placeholder_fails_generation() {
  let env = TestEnv::with_own_templates();
  env.write_template("python/simple_brats/runtime.txt", "python-$${var:pyhton_version}\n");

  env
    .brats_cmd()
    .args(["generate", "python", "--version", "2.7.13"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("pyhton_version"));
}
