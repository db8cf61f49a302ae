use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn status_before_first_run() {
  let env = TestEnv::new();

  env
    .rbuild_cmd()
    .arg("status")
    .arg(&env.compose_path)
    .assert()
    .success()
    .stdout(predicate::str::contains("Rebuild due"))
    .stdout(predicate::str::contains("never"));

  assert!(env.docker_calls().is_empty());
  assert!(env.state_files().is_empty());
}

#[test]
fn status_after_run_is_up_to_date() {
  let env = TestEnv::new();
  env.run().assert().success();
  let calls = env.docker_calls().len();

  env
    .rbuild_cmd()
    .arg("status")
    .arg(&env.compose_path)
    .assert()
    .success()
    .stdout(predicate::str::contains("Up to date"))
    .stdout(predicate::str::contains("Next due"));

  assert_eq!(env.docker_calls().len(), calls);
}

#[test]
fn status_json_output_is_valid() {
  let env = TestEnv::new();
  env.run().assert().success();

  let output = env
    .rbuild_cmd()
    .args(["status", "-o", "json"])
    .arg(&env.compose_path)
    .output()
    .unwrap();

  assert!(output.status.success());
  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["decision"]["due"], false);
  assert_eq!(report["decision"]["reason"], "NOT_DUE");
  assert_eq!(report["state"]["config_fingerprint"], report["current_fingerprint"]);
  assert!(report["next_due_at"].as_u64().is_some());
}

#[test]
fn status_sees_changed_file() {
  let env = TestEnv::new();
  env.run().assert().success();
  env.write_file("compose.yml", "services:\n  web:\n    build: ./other\n");

  env
    .rbuild_cmd()
    .args(["status", "-o", "json"])
    .arg(&env.compose_path)
    .assert()
    .success()
    .stdout(predicate::str::contains("CONFIG_CHANGED"));
}

#[test]
fn status_with_unbounded_build_period_succeeds() {
  let env = TestEnv::new();
  env.run().assert().success();

  env
    .rbuild_cmd()
    .args(["status", "--build-period", "18446744073709551615"])
    .arg(&env.compose_path)
    .assert()
    .success()
    .stdout(predicate::str::contains("Up to date"))
    .stdout(predicate::str::contains("never"));
}

#[test]
fn status_treats_malformed_fingerprint_as_missing_state() {
  let env = TestEnv::new();
  env.run().assert().success();
  let record = env.state_files().remove(0);
  std::fs::write(
    &record,
    r#"{"version":1,"last_build_timestamp":1,"config_fingerprint":"aééééééééé"}"#,
  )
  .unwrap();

  env
    .rbuild_cmd()
    .arg("status")
    .arg(&env.compose_path)
    .assert()
    .success()
    .stdout(predicate::str::contains("Rebuild due"))
    .stdout(predicate::str::contains("never"));
}
