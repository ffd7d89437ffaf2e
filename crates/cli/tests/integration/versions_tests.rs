use predicates::prelude::*;

use super::common::TestEnv;

const MANIFEST: &str = r#"---
language: nodejs
dependency_deprecation_dates:
  - name: node
    version_line: 4.x
    date: 2018-04-30
    link: https://github.com/nodejs/LTS
dependencies:
  - name: node
    version: 4.8.0
    uri: https://buildpacks.example.com/node-4.8.0.tgz
    cf_stacks: [cflinuxfs2]
  - name: node
    version: 6.10.0
    uri: https://buildpacks.example.com/node-6.10.0.tgz
    cf_stacks: [cflinuxfs2]
  - name: node
    version: 7.7.1
    uri: https://buildpacks.example.com/node-7.7.1.tgz
    cf_stacks: [other-stack]
  - name: yarn
    version: 0.21.3
    uri: https://buildpacks.example.com/yarn-0.21.3.tgz
    cf_stacks: [cflinuxfs2]
"#;

fn serve_manifest(server: &mut mockito::Server, branch: &str) -> mockito::Mock {
  server
    .mock("GET", format!("/nodejs-buildpack/{branch}/manifest.yml").as_str())
    .with_status(200)
    .with_body(MANIFEST)
    .create()
}

#[test]
fn lists_versions_for_the_stack() {
  let mut server = mockito::Server::new();
  let mock = serve_manifest(&mut server, "master");
  let env = TestEnv::new();

  env
    .brats_cmd()
    .env("BRATS_MANIFEST_BASE_URL", server.url())
    .args(["versions", "nodejs", "node"])
    .assert()
    .success()
    .stdout(predicate::str::contains("4.8.0"))
    .stdout(predicate::str::contains("6.10.0"))
    .stdout(predicate::str::contains("7.7.1").not())
    .stdout(predicate::str::contains("end of life 2018-04-30"));
  mock.assert();
}

#[test]
fn latest_prints_one_version() {
  let mut server = mockito::Server::new();
  serve_manifest(&mut server, "develop");
  let env = TestEnv::new();

  env
    .brats_cmd()
    .env("BRATS_MANIFEST_BASE_URL", server.url())
    .args(["versions", "nodejs", "node", "--branch", "develop", "--latest"])
    .assert()
    .success()
    .stdout(predicate::str::diff("6.10.0\n"));
}

#[test]
fn json_output_is_valid() {
  let mut server = mockito::Server::new();
  serve_manifest(&mut server, "master");
  let env = TestEnv::new();

  let output = env
    .brats_cmd()
    .env("BRATS_MANIFEST_BASE_URL", server.url())
    .args(["versions", "nodejs", "node", "--stack", "other-stack", "--json"])
    .assert()
    .success()
    .get_output()
    .stdout
    .clone();

  let versions: serde_json::Value = serde_json::from_slice(&output).unwrap();
  assert_eq!(versions, serde_json::json!([{ "version": "7.7.1" }]));
}

#[test]
fn unknown_dependency_is_empty_not_an_error() {
  let mut server = mockito::Server::new();
  serve_manifest(&mut server, "master");
  let env = TestEnv::new();

  env
    .brats_cmd()
    .env("BRATS_MANIFEST_BASE_URL", server.url())
    .args(["versions", "nodejs", "iojs"])
    .assert()
    .success()
    .stdout(predicate::str::contains("No iojs versions"));
}

#[test]
fn missing_manifest_fails() {
  let mut server = mockito::Server::new();
  server
    .mock("GET", "/nodejs-buildpack/master/manifest.yml")
    .with_status(404)
    .create();
  let env = TestEnv::new();

  env
    .brats_cmd()
    .env("BRATS_MANIFEST_BASE_URL", server.url())
    .args(["versions", "nodejs", "node"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("404"));
}

#[test]
fn unreachable_manifest_host_fails() {
  let env = TestEnv::new();

  env
    .brats_cmd()
    .args(["versions", "nodejs", "node"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to resolve manifest"));
}
