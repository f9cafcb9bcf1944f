use pyb_domain::{LockSnapshot, PackageIndex, ProjectSnapshot};
use serde::Serialize;

use crate::config::Config;
use crate::error::BundleError;

pub const PYPI_SIMPLE_URL: &str = "https://pypi.org/simple";

/// Ordered package indexes the installer may download from; the first is primary.
#[derive(Clone, Debug, Serialize)]
pub struct SourcePool {
    indexes: Vec<PackageIndex>,
    offline: bool,
}

impl SourcePool {
    pub fn new(indexes: Vec<PackageIndex>, offline: bool) -> Self {
        Self { indexes, offline }
    }

    pub fn from_project(snapshot: &ProjectSnapshot, config: &Config) -> Self {
        let mut primary = snapshot
            .sources
            .iter()
            .find(|source| source.default)
            .cloned()
            .unwrap_or_else(|| PackageIndex {
                name: "pypi".to_string(),
                url: PYPI_SIMPLE_URL.to_string(),
                default: true,
            });
        if let Some(url) = &config.index().url {
            primary.url.clone_from(url);
        }
        let mut indexes = vec![primary];
        indexes.extend(
            snapshot
                .sources
                .iter()
                .filter(|source| !source.default)
                .cloned(),
        );
        Self::new(indexes, !config.network().online)
    }

    pub fn indexes(&self) -> &[PackageIndex] {
        &self.indexes
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    /// Fails on the first locked package whose `source` names no index in this pool.
    pub fn check_lock(&self, lock: &LockSnapshot) -> Result<(), BundleError> {
        for package in &lock.packages {
            let Some(source) = package.source.as_deref() else {
                continue;
            };
            if !self.indexes.iter().any(|index| index.name == source) {
                return Err(BundleError::UnknownSource {
                    package: format!("{} ({})", package.name, package.version),
                    source_name: source.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Arguments selecting this pool on a `pip install` command line.
    pub fn pip_args(&self) -> Vec<String> {
        if self.offline {
            return vec!["--no-index".to_string()];
        }
        let mut args = Vec::new();
        let mut indexes = self.indexes.iter();
        if let Some(primary) = indexes.next() {
            args.push("--index-url".to_string());
            args.push(primary.url.clone());
        }
        for extra in indexes {
            args.push("--extra-index-url".to_string());
            args.push(extra.url.clone());
        }
        args
    }
}
