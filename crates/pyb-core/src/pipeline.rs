use std::fmt;
use std::path::PathBuf;

use pyb_domain::{LockSnapshot, ProjectPackage};
use serde::Serialize;
use tracing::info;

use crate::effects::Effects;
use crate::error::BundleError;
use crate::pool::SourcePool;
use crate::scoped::with_temporary_directory;

/// Steps of a bundle run, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleStage {
    ResolvingInterpreter,
    ClearingTarget,
    CreatingEnv,
    InstallingDependencies,
    BuildingArtifact,
    InstallingArtifact,
    Done,
}

impl fmt::Display for BundleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BundleStage::ResolvingInterpreter => "resolving interpreter",
            BundleStage::ClearingTarget => "clearing target",
            BundleStage::CreatingEnv => "creating environment",
            BundleStage::InstallingDependencies => "installing dependencies",
            BundleStage::BuildingArtifact => "building artifact",
            BundleStage::InstallingArtifact => "installing artifact",
            BundleStage::Done => "done",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug)]
pub struct BundleRequest {
    pub path: PathBuf,
    pub python: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct BundleReport {
    pub path: PathBuf,
    pub python: String,
    pub executable: PathBuf,
    pub dependencies: usize,
    pub artifact: String,
    pub replaced_existing: bool,
}

/// A failed run: the step that failed and why.
#[derive(Debug)]
pub struct BundleFailure {
    pub stage: BundleStage,
    pub error: BundleError,
}

impl BundleFailure {
    pub fn exit_code(&self) -> i32 {
        self.error.exit_code()
    }
}

impl fmt::Display for BundleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl std::error::Error for BundleFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Builds a fresh environment at `request.path` holding the locked
/// dependencies and a wheel of `package`.
///
/// Stops at the first failing step. An environment created before the failure
/// is left at the target path.
pub fn bundle_environment(
    effects: &dyn Effects,
    package: &ProjectPackage,
    lock: &LockSnapshot,
    pool: &SourcePool,
    request: &BundleRequest,
) -> Result<BundleReport, BundleFailure> {
    let mut stage = BundleStage::ResolvingInterpreter;
    let fail = |stage: BundleStage| move |error: BundleError| BundleFailure { stage, error };

    let interpreter = match request.python.as_deref() {
        Some(identifier) => effects.interpreters().resolve(identifier),
        None => effects.interpreters().ambient(),
    }
    .map_err(fail(stage))?;

    stage = BundleStage::ClearingTarget;
    let environments = effects.environments();
    let replaced_existing = environments.exists(&request.path);
    if replaced_existing {
        info!(
            "Removing existing virtual environment {}",
            request.path.display()
        );
        environments.remove(&request.path).map_err(fail(stage))?;
    }

    stage = BundleStage::CreatingEnv;
    info!(
        "Creating a virtual environment using Python {} in {}",
        interpreter.version,
        request.path.display()
    );
    let env = environments
        .create(&request.path, &interpreter)
        .map_err(fail(stage))?;

    stage = BundleStage::InstallingDependencies;
    info!("Installing dependencies");
    let mut installer = effects.installers().installer(&env, package, lock, pool);
    let code = installer.run().map_err(fail(stage))?;
    if code != 0 {
        return Err(fail(stage)(BundleError::DependencyInstall { code }));
    }

    stage = BundleStage::BuildingArtifact;
    let artifact = with_temporary_directory("pyb-bundle-", |dir| {
        let filename = effects.builder().build(package, &env, dir)?;
        stage = BundleStage::InstallingArtifact;
        let installable = package.with_file_source(&dir.join(&filename));
        info!("Installing {installable}");
        let code = installer.install(&installable)?;
        if code != 0 {
            return Err(BundleError::ArtifactInstall {
                package: installable.to_string(),
                code,
            });
        }
        Ok(filename)
    })
    .map_err(|error| BundleFailure { stage, error })?;

    Ok(BundleReport {
        path: env.root.clone(),
        python: env.version.to_string(),
        executable: env.python.clone(),
        dependencies: lock.packages.len(),
        artifact,
        replaced_existing,
    })
}
