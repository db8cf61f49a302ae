use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn purge_removes_images_and_state() {
  let env = TestEnv::new();
  env.run().assert().success();
  assert!(env.state().is_some());

  env
    .rbuild_cmd()
    .arg("purge")
    .arg(&env.compose_path)
    .assert()
    .success()
    .stdout(predicate::str::contains("Purged demo"));

  assert!(env.state().is_none());
  let calls = env.docker_calls();
  assert_eq!(calls.last().map(String::as_str), Some("image rm sha256:old"));
}

#[test]
fn run_after_purge_rebuilds() {
  let env = TestEnv::new();
  env.run().assert().success();
  env.rbuild_cmd().arg("purge").arg(&env.compose_path).assert().success();

  env
    .run()
    .assert()
    .success()
    .stdout(predicate::str::contains("Rebuilt demo"));
}

#[test]
fn purge_json_output_is_valid() {
  let env = TestEnv::new();

  let output = env
    .rbuild_cmd()
    .args(["purge", "-o", "json"])
    .arg(&env.compose_path)
    .output()
    .unwrap();

  assert!(output.status.success());
  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["project"], "demo");
  assert_eq!(report["images_removed"], 1);
  assert_eq!(report["state_cleared"], false);
}

#[test]
fn purge_failure_keeps_state() {
  let env = TestEnv::new();
  env.run().assert().success();

  env
    .rbuild_cmd()
    .arg("purge")
    .arg(&env.compose_path)
    .env("FAKE_DOCKER_FAIL", "image-rm")
    .assert()
    .code(1)
    .stderr(predicate::str::contains("[purge]"));

  assert!(env.state().is_some());
}
