use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Result};
use pep440_rs::{Version, VersionSpecifiers};
use pep508_rs::Requirement;

use crate::project::ProjectSnapshot;

/// Where an installable copy of a package comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PackageSource {
    /// The project checkout itself.
    Directory(PathBuf),
    /// A built distribution on local disk.
    File(PathBuf),
}

impl PackageSource {
    pub fn source_type(&self) -> &'static str {
        match self {
            PackageSource::Directory(_) => "directory",
            PackageSource::File(_) => "file",
        }
    }
}

/// Identity and metadata of the project being bundled.
#[derive(Clone, Debug)]
pub struct ProjectPackage {
    name: String,
    pretty_version: String,
    python_requirement: VersionSpecifiers,
    source: PackageSource,
}

impl ProjectPackage {
    pub fn from_snapshot(snapshot: &ProjectSnapshot) -> Result<Self> {
        Version::from_str(&snapshot.version).map_err(|err| {
            anyhow!("invalid [project].version `{}`: {err}", snapshot.version)
        })?;
        let python_requirement = VersionSpecifiers::from_str(&snapshot.python_requirement)
            .map_err(|err| {
                anyhow!(
                    "invalid requires-python `{}`: {err}",
                    snapshot.python_requirement
                )
            })?;
        for spec in &snapshot.dependencies {
            Requirement::from_str(spec)
                .map_err(|err| anyhow!("invalid dependency `{spec}`: {err}"))?;
        }
        Ok(Self {
            name: snapshot.name.clone(),
            pretty_version: snapshot.version.clone(),
            python_requirement,
            source: PackageSource::Directory(snapshot.root.clone()),
        })
    }

    /// Returns a copy of this descriptor that installs from `artifact`.
    #[must_use]
    pub fn with_file_source(&self, artifact: &Path) -> Self {
        Self {
            source: PackageSource::File(artifact.to_path_buf()),
            ..self.clone()
        }
    }

    pub fn pretty_name(&self) -> &str {
        &self.name
    }

    pub fn pretty_version(&self) -> &str {
        &self.pretty_version
    }

    pub fn python_requirement(&self) -> &VersionSpecifiers {
        &self.python_requirement
    }

    pub fn source(&self) -> &PackageSource {
        &self.source
    }

    /// Name used for the distribution's module and wheel filename.
    pub fn module_name(&self) -> String {
        self.name.to_lowercase().replace(['-', '.'], "_")
    }
}

impl fmt::Display for ProjectPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.pretty_version)
    }
}
