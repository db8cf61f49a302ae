use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn first_run_rebuilds_and_records_state() {
  let env = TestEnv::new();

  env
    .run()
    .assert()
    .success()
    .stdout(predicate::str::contains("Rebuilt demo"))
    .stdout(predicate::str::contains("configuration changed"));

  let calls = env.docker_calls();
  assert!(calls[0].ends_with("config --format json"), "{:?}", calls);
  assert!(calls[1].ends_with("pull --ignore-buildable"), "{:?}", calls);
  assert!(calls[2].ends_with("build --no-cache --pull"), "{:?}", calls);
  assert!(calls[3].contains(" up --detach --remove-orphans --wait"), "{:?}", calls);
  assert!(calls[4].starts_with("image ls --filter label=rbuild.compose_name=demo"), "{:?}", calls);
  assert_eq!(calls[5], "image rm sha256:old");
  assert_eq!(calls.len(), 6);

  let state = env.state().unwrap();
  assert_eq!(state["version"], 1);
  assert_eq!(state["config_fingerprint"].as_str().unwrap().len(), 64);
  assert!(state["last_build_timestamp"].as_u64().unwrap() > 0);
}

#[test]
fn later_stages_use_the_stamped_generation() {
  let env = TestEnv::new();

  env.run().assert().success();

  let calls = env.docker_calls();
  let compose = env.compose_path.to_string_lossy().to_string();
  assert!(calls[0].contains(&compose));
  for call in &calls[1..4] {
    assert!(!call.contains(&compose), "{}", call);
    assert!(call.contains(".json"), "{}", call);
  }
}

#[test]
fn second_run_within_period_is_skipped() {
  let env = TestEnv::new();
  env.run().assert().success();
  let state_before = env.state();
  let calls_before = env.docker_calls().len();

  env
    .run()
    .assert()
    .success()
    .stdout(predicate::str::contains("Rebuild not due"));

  assert_eq!(env.docker_calls().len(), calls_before);
  assert_eq!(env.state(), state_before);
}

#[test]
fn changed_compose_file_triggers_rebuild() {
  let env = TestEnv::new();
  env.run().assert().success();
  let fingerprint_before = env.state().unwrap()["config_fingerprint"].clone();

  env.write_file("compose.yml", "services:\n  web:\n    build: ./v2\n");

  env
    .run()
    .assert()
    .success()
    .stdout(predicate::str::contains("configuration changed"));

  assert_ne!(env.state().unwrap()["config_fingerprint"], fingerprint_before);
}

#[test]
fn zero_build_period_always_rebuilds() {
  let env = TestEnv::new();
  env.run().assert().success();

  env
    .run()
    .env("BUILD_PERIOD", "0")
    .assert()
    .success()
    .stdout(predicate::str::contains("build period expired"));
}

#[test]
fn force_rebuild_ignores_fresh_state() {
  let env = TestEnv::new();
  env.run().assert().success();

  env
    .run()
    .arg("--force-rebuild")
    .assert()
    .success()
    .stdout(predicate::str::contains("forced"));
}

#[test]
fn build_failure_exits_with_build_code_and_keeps_state() {
  let env = TestEnv::new();

  env
    .run()
    .env("FAKE_DOCKER_FAIL", "build")
    .assert()
    .code(5)
    .stderr(predicate::str::contains("[build]"));

  assert!(env.state().is_none());
  assert!(!env.docker_calls().iter().any(|call| call.contains(" up ")));
}

#[test]
fn pull_failure_exits_with_cache_invalidate_code() {
  let env = TestEnv::new();

  env
    .run()
    .env("FAKE_DOCKER_FAIL", "pull")
    .assert()
    .code(4)
    .stderr(predicate::str::contains("[cache-invalidate]"));

  assert!(env.state().is_none());
}

#[test]
fn render_failure_exits_with_cache_invalidate_code() {
  let env = TestEnv::new();

  env
    .run()
    .env("FAKE_DOCKER_FAIL", "config")
    .assert()
    .code(4)
    .stderr(predicate::str::contains("invalid compose file"));

  assert_eq!(env.docker_calls().len(), 1);
}

#[test]
fn up_failure_exits_with_up_code() {
  let env = TestEnv::new();

  env
    .run()
    .env("FAKE_DOCKER_FAIL", "up")
    .assert()
    .code(6)
    .stderr(predicate::str::contains("[up]"));

  assert!(env.state().is_none());
}

#[test]
fn hanging_up_is_killed_after_timeout() {
  let env = TestEnv::new();
  let started = std::time::Instant::now();

  env
    .run()
    .args(["--up-timeout-period", "1"])
    .env("FAKE_DOCKER_FAIL", "up-hang")
    .assert()
    .code(6)
    .stderr(predicate::str::contains("timed out"));

  assert!(started.elapsed() < std::time::Duration::from_secs(20));
  assert!(env.state().is_none());
}

#[test]
fn failed_rebuild_is_retried_next_run() {
  let env = TestEnv::new();
  env.run().env("FAKE_DOCKER_FAIL", "build").assert().code(5);

  env
    .run()
    .assert()
    .success()
    .stdout(predicate::str::contains("Rebuilt demo"));

  assert!(env.state().is_some());
}

#[test]
fn cleanup_failure_is_a_warning() {
  let env = TestEnv::new();

  env
    .run()
    .env("FAKE_DOCKER_FAIL", "image-rm")
    .assert()
    .success()
    .stderr(predicate::str::contains("Cleanup"));

  assert!(env.state().is_some());
}

#[test]
fn optional_prunes_run_when_requested() {
  let env = TestEnv::new();

  env
    .run()
    .args(["--remove-images", "--prune-build-cache"])
    .assert()
    .success();

  let calls = env.docker_calls();
  assert!(calls.contains(&"image prune --force --all".to_string()), "{:?}", calls);
  assert!(calls.contains(&"buildx prune --force".to_string()), "{:?}", calls);
}

#[test]
fn corrupt_state_is_rebuilt_over() {
  let env = TestEnv::new();
  env.run().assert().success();
  let record = env.state_files().remove(0);
  std::fs::write(&record, "{ not json").unwrap();

  env
    .run()
    .assert()
    .success()
    .stdout(predicate::str::contains("Rebuilt demo"));

  assert!(env.state().is_some());
}

#[test]
fn unwritable_state_dir_exits_with_state_code() {
  let env = TestEnv::new();
  env.write_file("blocker", "");

  env
    .run()
    .env("RBUILD_STATE_DIR", env.temp.path().join("blocker"))
    .assert()
    .code(3)
    .stderr(predicate::str::contains("[state]"));
}

#[test]
fn skip_with_unbounded_build_period_succeeds() {
  let env = TestEnv::new();
  env.run().assert().success();

  for period in ["100000000000000", "18446744073709551615"] {
    env
      .run()
      .args(["--build-period", period])
      .assert()
      .success()
      .stdout(predicate::str::contains("Rebuild not due"))
      .stdout(predicate::str::contains("never"));
  }
}
