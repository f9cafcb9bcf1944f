use std::path::{self, PathBuf};

use anyhow::{Context, Result};
use pyb_domain::{load_lockfile, ProjectPackage, ProjectSnapshot, LOCK_FILENAME};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::context::CommandContext;
use crate::error::BundleError;
use crate::outcome::ExecutionOutcome;
use crate::pipeline::{bundle_environment, BundleFailure, BundleRequest, BundleStage};
use crate::pool::SourcePool;
use crate::solutions::SolutionProviderRepository;

pub const MISSING_PROJECT_MESSAGE: &str = "No pyproject.toml found.";
pub const MISSING_PROJECT_HINT: &str =
    "Run `pyb bundle venv` from a directory containing pyproject.toml.";

#[derive(Clone, Debug)]
pub struct BundleVenvRequest {
    pub path: PathBuf,
    pub python: Option<String>,
}

/// Bundles the current project into a fresh virtual environment.
///
/// # Errors
/// Returns an error only when the target path cannot be made absolute; every
/// other failure is reported through the outcome.
pub fn bundle_venv(ctx: &CommandContext, request: &BundleVenvRequest) -> Result<ExecutionOutcome> {
    let Ok(root) = ctx.project_root() else {
        return Ok(missing_project_outcome());
    };
    let snapshot = match ProjectSnapshot::read_from(&root) {
        Ok(snapshot) => snapshot,
        Err(err) => return Ok(manifest_error_outcome(&err)),
    };
    let package = match ProjectPackage::from_snapshot(&snapshot) {
        Ok(package) => package,
        Err(err) => return Ok(manifest_error_outcome(&err)),
    };
    if !snapshot.lock_path.exists() {
        return Ok(ExecutionOutcome::user_error(
            format!("{LOCK_FILENAME} not found"),
            json!({
                "reason": "missing_lock",
                "lockfile": snapshot.lock_path.display().to_string(),
                "hint": format!("Lock the project's dependencies into {LOCK_FILENAME} before bundling."),
            }),
        ));
    }
    let lock = match load_lockfile(&snapshot.lock_path) {
        Ok(lock) => lock,
        Err(err) => {
            return Ok(ExecutionOutcome::user_error(
                format!("{LOCK_FILENAME} could not be read"),
                json!({
                    "reason": "invalid_lock",
                    "error": format!("{err:#}"),
                    "hint": format!("Fix or regenerate {LOCK_FILENAME}, then rerun the command."),
                }),
            ))
        }
    };
    let lock_fresh = lock.is_fresh(&snapshot);
    if !lock_fresh {
        warn!("{LOCK_FILENAME} is not consistent with the latest changes in pyproject.toml");
    }
    let pool = SourcePool::from_project(&snapshot, ctx.config());
    let target = path::absolute(&request.path)
        .with_context(|| format!("resolving {}", request.path.display()))?;

    info!(
        "Bundling {} ({}) into {}",
        package.pretty_name(),
        package.pretty_version(),
        target.display()
    );
    let pipeline_request = BundleRequest {
        path: target.clone(),
        python: request.python.clone(),
    };
    match bundle_environment(ctx.effects(), &package, &lock, &pool, &pipeline_request) {
        Ok(report) => Ok(ExecutionOutcome::success(
            format!("Bundled {package} into {}", report.path.display()),
            json!({
                "stage": BundleStage::Done,
                "code": 0,
                "path": report.path.display().to_string(),
                "python": report.python,
                "executable": report.executable.display().to_string(),
                "dependencies": report.dependencies,
                "artifact": report.artifact,
                "replaced_existing": report.replaced_existing,
                "offline": pool.is_offline(),
                "lock_fresh": lock_fresh,
            }),
        )),
        Err(failure) => Ok(failure_outcome(&failure, &target)),
    }
}

fn missing_project_outcome() -> ExecutionOutcome {
    ExecutionOutcome::user_error(
        MISSING_PROJECT_MESSAGE,
        json!({
            "reason": "missing_project",
            "hint": MISSING_PROJECT_HINT,
        }),
    )
}

fn manifest_error_outcome(err: &anyhow::Error) -> ExecutionOutcome {
    if err
        .chain()
        .any(|cause| cause.to_string().contains("pyproject.toml not found"))
    {
        return missing_project_outcome();
    }
    ExecutionOutcome::user_error(
        "pyproject.toml is invalid",
        json!({
            "reason": "invalid_manifest",
            "error": format!("{err:#}"),
            "hint": "Fix the [project] table in pyproject.toml and rerun the command.",
        }),
    )
}

fn failure_outcome(failure: &BundleFailure, target: &std::path::Path) -> ExecutionOutcome {
    let mut details = json!({
        "reason": "bundle_failed",
        "stage": failure.stage,
        "code": failure.exit_code(),
        "path": target.display().to_string(),
    });
    let solutions = SolutionProviderRepository::with_defaults().solutions_for(failure);
    if let Some(solution) = solutions.first() {
        details["hint"] = Value::String(solution.description());
        details["solution"] = json!({
            "title": solution.title(),
            "description": solution.description(),
            "links": solution.documentation_links(),
        });
    }
    let message = failure.to_string();
    match failure.error {
        BundleError::Installer { .. } | BundleError::Io(_) => {
            ExecutionOutcome::failure(message, details)
        }
        _ => ExecutionOutcome::user_error(message, details),
    }
}
