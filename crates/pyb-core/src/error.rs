use std::io;
use std::path::PathBuf;

use pyb_domain::SolverProblemError;

/// Failures of the individual bundling steps.
#[derive(thiserror::Error, Debug)]
pub enum BundleError {
    #[error("could not find a Python interpreter for `{identifier}`: {reason}")]
    InterpreterNotFound { identifier: String, reason: String },
    #[error("could not remove the existing environment at {}: {reason}", .path.display())]
    EnvironmentRemoval { path: PathBuf, reason: String },
    #[error("could not create a virtual environment at {}: {reason}", .path.display())]
    EnvironmentCreation { path: PathBuf, reason: String },
    #[error("installing dependencies failed with exit code {code}")]
    DependencyInstall { code: i32 },
    #[error("{0}")]
    Resolution(#[from] SolverProblemError),
    #[error("{package} is locked to source `{source_name}`, which is not a configured package index")]
    UnknownSource { package: String, source_name: String },
    #[error("building the project wheel failed: {reason}")]
    ArtifactBuild { reason: String },
    #[error("installing {package} failed with exit code {code}")]
    ArtifactInstall { package: String, code: i32 },
    #[error("the installer could not run: {reason}")]
    Installer { reason: String },
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl BundleError {
    /// Process exit status for this failure; installer statuses pass through unchanged.
    pub fn exit_code(&self) -> i32 {
        match self {
            BundleError::DependencyInstall { code } | BundleError::ArtifactInstall { code, .. } => {
                *code
            }
            _ => 1,
        }
    }

    pub(crate) fn installer(err: &anyhow::Error) -> Self {
        BundleError::Installer {
            reason: format!("{err:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installer_statuses_pass_through() {
        assert_eq!(BundleError::DependencyInstall { code: 7 }.exit_code(), 7);
        let err = BundleError::ArtifactInstall {
            package: "demo (0.1.0)".to_string(),
            code: 3,
        };
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.to_string(), "installing demo (0.1.0) failed with exit code 3");
    }

    #[test]
    fn other_failures_map_to_one() {
        let err = BundleError::ArtifactBuild {
            reason: "boom".to_string(),
        };
        assert_eq!(err.exit_code(), 1);
        let err = BundleError::from(SolverProblemError::new("incompatible"));
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.to_string(), "incompatible");
    }
}
