mod common;

use std::fs;
use std::process::Command;

use assert_cmd::cargo::cargo_bin_cmd;
use common::{env_python, find_python, init_project, parse_json};

const EMPTY_LOCK: &str = "version = 1\n\n[python]\nrequirement = \">=3.8\"\n";

#[test]
fn bundle_venv_help_describes_arguments() {
    let assert = cargo_bin_cmd!("pyb")
        .args(["bundle", "venv", "--help"])
        .assert()
        .success();
    let output = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 help");
    assert!(output.contains("<PATH>"), "help missing PATH: {output}");
    assert!(output.contains("--python"), "help missing --python: {output}");
}

#[test]
fn missing_project_is_reported_as_user_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let assert = cargo_bin_cmd!("pyb")
        .current_dir(temp.path())
        .args(["--json", "bundle", "venv", "venv"])
        .assert()
        .code(1);
    let payload = parse_json(&assert);
    assert_eq!(payload["status"], "user-error");
    assert_eq!(payload["details"]["reason"], "missing_project");
    assert!(!temp.path().join("venv").exists());
}

#[test]
fn missing_lock_prints_hint() {
    let (_temp, root) = init_project("pyb-no-lock", "demo-app", None);
    let assert = cargo_bin_cmd!("pyb")
        .current_dir(&root)
        .args(["--no-color", "bundle", "venv", "venv"])
        .assert()
        .code(1);
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stderr.contains("pyb.lock not found"), "stderr: {stderr}");
    assert!(stderr.contains("Hint:"), "stderr: {stderr}");
}

#[test]
fn unknown_python_fails_before_touching_target() {
    let (_temp, root) = init_project("pyb-bad-python", "demo-app", Some(EMPTY_LOCK));
    let target = root.join("venv");
    fs::create_dir_all(&target).expect("target");
    fs::write(target.join("sentinel"), "keep").expect("sentinel");
    let assert = cargo_bin_cmd!("pyb")
        .current_dir(&root)
        .args(["--json", "bundle", "venv", "venv", "--python", "pyb-missing-python3.99"])
        .assert()
        .code(1);
    let payload = parse_json(&assert);
    assert_eq!(payload["details"]["stage"], "resolving_interpreter");
    assert!(target.join("sentinel").exists());
}

#[test]
fn bundles_project_into_fresh_environment() {
    let Some(python) = find_python() else {
        eprintln!("skipping bundle test (python with venv/ensurepip not found)");
        return;
    };
    let (_temp, root) = init_project("pyb-bundle", "demo-app", Some(EMPTY_LOCK));
    let target = root.join("bundle-env");
    fs::create_dir_all(&target).expect("stale env");
    fs::write(target.join("sentinel"), "stale").expect("sentinel");

    let assert = cargo_bin_cmd!("pyb")
        .current_dir(&root)
        .env("PYB_RUNTIME_PYTHON", &python)
        .env("PYB_ONLINE", "0")
        .args(["--json", "bundle", "venv", "bundle-env"])
        .assert()
        .success();
    let payload = parse_json(&assert);
    assert_eq!(payload["status"], "ok", "{payload}");
    assert_eq!(payload["details"]["stage"], "done");
    assert_eq!(payload["details"]["replaced_existing"], true);
    assert_eq!(payload["details"]["dependencies"], 0);
    let artifact = payload["details"]["artifact"].as_str().expect("artifact");
    assert!(artifact.starts_with("demo_app-0.1.0"), "{artifact}");

    assert!(!target.join("sentinel").exists());
    let output = Command::new(env_python(&target))
        .args(["-c", "import demo_app; print(demo_app.GREETING)"])
        .output()
        .expect("run bundled python");
    assert!(output.status.success(), "{output:?}");
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "hello from the bundle"
    );
}

#[test]
fn explicit_python_is_used_for_the_environment() {
    let Some(python) = find_python() else {
        eprintln!("skipping explicit python test (python with venv/ensurepip not found)");
        return;
    };
    let (_temp, root) = init_project("pyb-explicit", "demo-app", Some(EMPTY_LOCK));
    let assert = cargo_bin_cmd!("pyb")
        .current_dir(&root)
        .env("PYB_ONLINE", "0")
        .args(["--json", "bundle", "venv", "env", "-p", python.as_str()])
        .assert()
        .success();
    let payload = parse_json(&assert);
    let reported = payload["details"]["python"].as_str().expect("python version");

    let probe = Command::new(&python)
        .args(["-c", "import sys; print('.'.join(map(str, sys.version_info[:3])))"])
        .output()
        .expect("probe python");
    assert_eq!(String::from_utf8_lossy(&probe.stdout).trim(), reported);
    assert!(env_python(&root.join("env")).exists());
}
