#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use assert_cmd::assert::Assert;
use serde_json::Value;
use tempfile::TempDir;

/// A Python able to create environments with pip in them, if one is installed.
pub fn find_python() -> Option<String> {
    let candidates = [
        std::env::var("PYTHON").ok(),
        Some("python3".to_string()),
        Some("python".to_string()),
    ];
    for candidate in candidates.into_iter().flatten() {
        let status = Command::new(&candidate)
            .args(["-c", "import venv, ensurepip"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if matches!(status, Ok(code) if code.success()) {
            return Some(candidate);
        }
    }
    None
}

pub fn write_project(root: &Path, name: &str, lock: Option<&str>) {
    let module = name.replace('-', "_");
    fs::create_dir_all(root.join("src").join(&module)).expect("src dir");
    fs::write(
        root.join("pyproject.toml"),
        format!(
            r#"[project]
name = "{name}"
version = "0.1.0"
requires-python = ">=3.8"
dependencies = []

[build-system]
requires = ["uv_build"]
build-backend = "uv_build"
"#
        ),
    )
    .expect("write pyproject");
    fs::write(
        root.join("src").join(&module).join("__init__.py"),
        "GREETING = \"hello from the bundle\"\n",
    )
    .expect("write module");
    if let Some(lock) = lock {
        fs::write(root.join("pyb.lock"), lock).expect("write lock");
    }
}

pub fn init_project(prefix: &str, name: &str, lock: Option<&str>) -> (TempDir, PathBuf) {
    let temp = tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("tempdir");
    let root = temp.path().join(name);
    write_project(&root, name, lock);
    (temp, root)
}

pub fn env_python(env: &Path) -> PathBuf {
    if cfg!(windows) {
        env.join("Scripts").join("python.exe")
    } else {
        env.join("bin").join("python")
    }
}

pub fn parse_json(assert: &Assert) -> Value {
    serde_json::from_slice(&assert.get_output().stdout).expect("valid json")
}
