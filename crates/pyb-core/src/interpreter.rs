use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
    process::Command,
};

use anyhow::{anyhow, bail, Context, Result};
use pep440_rs::Version;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::effects::InterpreterLookup;
use crate::error::BundleError;

const INSPECT_SCRIPT: &str = "import json, sys; print(json.dumps({'version_info': list(sys.version_info[:3]), 'executable': sys.executable}))";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PythonVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl PythonVersion {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn to_pep440(self) -> Version {
        Version::new([self.major, self.minor, self.patch])
    }
}

impl fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// The interpreter a new environment is bound to.
///
/// `executable` is `None` when the ambient interpreter should be used.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interpreter {
    pub executable: Option<PathBuf>,
    pub version: PythonVersion,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PythonDetails {
    version_info: Vec<u64>,
    pub(crate) executable: PathBuf,
}

impl PythonDetails {
    pub(crate) fn version(&self) -> Result<PythonVersion> {
        match self.version_info.as_slice() {
            [major, minor, patch, ..] => Ok(PythonVersion::new(*major, *minor, *patch)),
            other => bail!("python reported an incomplete version {other:?}"),
        }
    }
}

pub(crate) fn inspect_python(path: &Path) -> Result<PythonDetails> {
    let output = Command::new(path)
        .arg("-c")
        .arg(INSPECT_SCRIPT)
        .output()
        .with_context(|| format!("failed to inspect python at {}", path.display()))?;
    if !output.status.success() {
        bail!(
            "python exited with {} while probing",
            output.status.code().unwrap_or(-1)
        )
    }
    let details: PythonDetails =
        serde_json::from_slice(&output.stdout).context("invalid runtime inspection payload")?;
    details.version()?;
    Ok(details)
}

/// Finds the interpreter used when none is requested explicitly.
pub fn detect_interpreter(python_override: Option<&str>) -> Result<PathBuf> {
    if let Some(explicit) = python_override {
        return Ok(PathBuf::from(explicit));
    }
    for candidate in ["python3", "python"] {
        if let Ok(path) = which::which(candidate) {
            return Ok(path);
        }
    }
    bail!("no python interpreter found on PATH; set PYB_RUNTIME_PYTHON");
}

/// Turns a `--python` value into an absolute executable path.
///
/// Values containing a path separator are treated as paths, anything else is
/// looked up on `PATH`.
pub fn locate_interpreter(identifier: &str) -> Result<PathBuf> {
    let looks_like_path = identifier.contains(std::path::MAIN_SEPARATOR)
        || identifier.contains('/')
        || Path::new(identifier).is_absolute();
    if looks_like_path {
        let path = Path::new(identifier);
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            env::current_dir()
                .context("unable to determine current directory")?
                .join(path)
        };
        return fs::canonicalize(&absolute)
            .with_context(|| format!("unable to resolve python path at {identifier}"));
    }
    which::which(identifier).map_err(|err| anyhow!("`{identifier}` was not found on PATH: {err}"))
}

pub struct SystemInterpreterLookup {
    python_override: Option<String>,
}

impl SystemInterpreterLookup {
    pub fn new(python_override: Option<String>) -> Self {
        Self { python_override }
    }
}

impl InterpreterLookup for SystemInterpreterLookup {
    fn resolve(&self, identifier: &str) -> Result<Interpreter, BundleError> {
        let not_found = |err: anyhow::Error| BundleError::InterpreterNotFound {
            identifier: identifier.to_string(),
            reason: format!("{err:#}"),
        };
        let path = locate_interpreter(identifier).map_err(not_found)?;
        let details = inspect_python(&path).map_err(not_found)?;
        let version = details.version().map_err(not_found)?;
        debug!(%identifier, executable = %details.executable.display(), %version, "resolved interpreter");
        Ok(Interpreter {
            executable: Some(details.executable),
            version,
        })
    }

    fn ambient(&self) -> Result<Interpreter, BundleError> {
        let label = self.python_override.as_deref().unwrap_or("python3");
        let not_found = |err: anyhow::Error| BundleError::InterpreterNotFound {
            identifier: label.to_string(),
            reason: format!("{err:#}"),
        };
        let path = detect_interpreter(self.python_override.as_deref()).map_err(not_found)?;
        let details = inspect_python(&path).map_err(not_found)?;
        let version = details.version().map_err(not_found)?;
        debug!(executable = %details.executable.display(), %version, "using ambient interpreter");
        Ok(Interpreter {
            executable: None,
            version,
        })
    }
}
