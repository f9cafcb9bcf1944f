use std::{
    fs, io,
    path::{Path, PathBuf},
};

use anyhow::anyhow;
use tracing::debug;

use crate::effects::EnvironmentManager;
use crate::error::BundleError;
use crate::interpreter::{detect_interpreter, inspect_python, Interpreter, PythonVersion};
use crate::process::run_command;

/// A virtual environment rooted at `root`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VirtualEnv {
    pub root: PathBuf,
    pub python: PathBuf,
    pub version: PythonVersion,
}

impl VirtualEnv {
    pub fn new(root: PathBuf, version: PythonVersion) -> Self {
        let python = env_python(&root);
        Self {
            root,
            python,
            version,
        }
    }
}

/// Path of the interpreter inside an environment rooted at `root`.
pub fn env_python(root: &Path) -> PathBuf {
    if cfg!(windows) {
        root.join("Scripts").join("python.exe")
    } else {
        root.join("bin").join("python")
    }
}

pub struct SystemEnvironmentManager {
    python_override: Option<String>,
}

impl SystemEnvironmentManager {
    pub fn new(python_override: Option<String>) -> Self {
        Self { python_override }
    }

    fn base_python(&self, interpreter: &Interpreter) -> anyhow::Result<PathBuf> {
        match &interpreter.executable {
            Some(path) => Ok(path.clone()),
            None => detect_interpreter(self.python_override.as_deref()),
        }
    }
}

impl EnvironmentManager for SystemEnvironmentManager {
    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn remove(&self, path: &Path) -> Result<(), BundleError> {
        let metadata = match fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => {
                return Err(BundleError::EnvironmentRemoval {
                    path: path.to_path_buf(),
                    reason: err.to_string(),
                })
            }
        };
        let result = if metadata.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        result.map_err(|err| BundleError::EnvironmentRemoval {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        debug!(path = %path.display(), "removed environment");
        Ok(())
    }

    fn create(&self, path: &Path, interpreter: &Interpreter) -> Result<VirtualEnv, BundleError> {
        let failed = |err: anyhow::Error| BundleError::EnvironmentCreation {
            path: path.to_path_buf(),
            reason: format!("{err:#}"),
        };
        let python = self.base_python(interpreter).map_err(failed)?;
        let args = vec![
            "-m".to_string(),
            "venv".to_string(),
            path.display().to_string(),
        ];
        let output = run_command(&python, &args, &[], Path::new(".")).map_err(failed)?;
        if !output.success() {
            return Err(failed(anyhow!(
                "venv exited with {}: {}",
                output.code,
                output.diagnostic()
            )));
        }
        let env_python = env_python(path);
        if !env_python.exists() {
            return Err(failed(anyhow!(
                "environment python missing at {}",
                env_python.display()
            )));
        }
        let version = inspect_python(&env_python)
            .and_then(|details| details.version())
            .map_err(failed)?;
        debug!(path = %path.display(), %version, "created environment");
        Ok(VirtualEnv {
            root: path.to_path_buf(),
            python: env_python,
            version,
        })
    }
}
