#![deny(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate
)]

mod build;
mod bundle;
mod config;
mod context;
mod effects;
mod environment;
mod error;
mod install;
mod interpreter;
mod outcome;
mod pipeline;
mod pool;
mod process;
mod scoped;
mod solutions;
#[cfg(test)]
mod testing;

pub const PYB_VERSION: &str = env!("CARGO_PKG_VERSION");

pub use build::UvWheelBuilder;
pub use bundle::{bundle_venv, BundleVenvRequest, MISSING_PROJECT_HINT, MISSING_PROJECT_MESSAGE};
pub use config::{Config, GlobalOptions, IndexConfig, NetworkConfig, RuntimeConfig};
pub use context::CommandContext;
pub use effects::{
    ArtifactBuilder, Effects, EnvironmentManager, Installer, InstallerFactory, InterpreterLookup,
    SharedEffects, SystemEffects,
};
pub use environment::{env_python, SystemEnvironmentManager, VirtualEnv};
pub use error::BundleError;
pub use install::{render_requirements, PipInstaller, SystemInstallerFactory};
pub use interpreter::{
    detect_interpreter, locate_interpreter, Interpreter, PythonVersion, SystemInterpreterLookup,
};
pub use outcome::{format_status_message, to_json_response, CommandStatus, ExecutionOutcome};
pub use pipeline::{bundle_environment, BundleFailure, BundleReport, BundleRequest, BundleStage};
pub use pool::{SourcePool, PYPI_SIMPLE_URL};
pub use process::{run_command, RunOutput};
pub use scoped::with_temporary_directory;
pub use solutions::{
    HasSolutionsForError, PythonRequirementIncompatibilitySolutionProvider,
    PythonRequirementSolution, Solution, SolutionProviderRepository,
};
