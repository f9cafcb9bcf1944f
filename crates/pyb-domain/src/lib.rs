#![deny(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod lockfile;
pub mod package;
pub mod project;
pub mod resolution;

pub use lockfile::{
    load_lockfile, parse_lockfile, LockSnapshot, LockedFile, LockedPackage, LOCK_FILENAME,
    LOCK_VERSION,
};
pub use package::{PackageSource, ProjectPackage};
pub use project::{
    current_project_root, discover_project_root, manifest_fingerprint, PackageIndex,
    ProjectSnapshot, DEFAULT_PYTHON_REQUIREMENT,
};
pub use resolution::{check_python_compatibility, SolverProblemError};
