use std::path::Path;
use std::sync::Arc;

use pyb_domain::{LockSnapshot, ProjectPackage};

use crate::build::UvWheelBuilder;
use crate::config::Config;
use crate::environment::{SystemEnvironmentManager, VirtualEnv};
use crate::error::BundleError;
use crate::install::SystemInstallerFactory;
use crate::interpreter::{Interpreter, SystemInterpreterLookup};
use crate::pool::SourcePool;

pub trait InterpreterLookup: Send + Sync {
    /// Resolves an explicitly requested interpreter.
    fn resolve(&self, identifier: &str) -> Result<Interpreter, BundleError>;
    /// Describes the interpreter used when none was requested.
    fn ambient(&self) -> Result<Interpreter, BundleError>;
}

pub trait EnvironmentManager: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
    fn remove(&self, path: &Path) -> Result<(), BundleError>;
    fn create(&self, path: &Path, interpreter: &Interpreter) -> Result<VirtualEnv, BundleError>;
}

/// A package installer bound to one environment and one lock.
pub trait Installer {
    /// Installs every locked dependency and returns the installer's exit status.
    fn run(&mut self) -> Result<i32, BundleError>;
    /// Installs a single package from its local source and returns the exit status.
    fn install(&mut self, package: &ProjectPackage) -> Result<i32, BundleError>;
}

pub trait InstallerFactory: Send + Sync {
    fn installer<'a>(
        &self,
        env: &'a VirtualEnv,
        package: &'a ProjectPackage,
        lock: &'a LockSnapshot,
        pool: &'a SourcePool,
    ) -> Box<dyn Installer + 'a>;
}

pub trait ArtifactBuilder: Send + Sync {
    /// Builds a wheel of `package` into `out_dir` and returns its filename.
    fn build(
        &self,
        package: &ProjectPackage,
        env: &VirtualEnv,
        out_dir: &Path,
    ) -> Result<String, BundleError>;
}

pub trait Effects: Send + Sync {
    fn interpreters(&self) -> &dyn InterpreterLookup;
    fn environments(&self) -> &dyn EnvironmentManager;
    fn installers(&self) -> &dyn InstallerFactory;
    fn builder(&self) -> &dyn ArtifactBuilder;
}

pub struct SystemEffects {
    interpreters: Arc<SystemInterpreterLookup>,
    environments: Arc<SystemEnvironmentManager>,
    installers: Arc<SystemInstallerFactory>,
    builder: Arc<UvWheelBuilder>,
}

impl SystemEffects {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let python = config.runtime().python.clone();
        Self {
            interpreters: Arc::new(SystemInterpreterLookup::new(python.clone())),
            environments: Arc::new(SystemEnvironmentManager::new(python)),
            installers: Arc::new(SystemInstallerFactory),
            builder: Arc::new(UvWheelBuilder),
        }
    }
}

impl Default for SystemEffects {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl Effects for SystemEffects {
    fn interpreters(&self) -> &dyn InterpreterLookup {
        self.interpreters.as_ref()
    }

    fn environments(&self) -> &dyn EnvironmentManager {
        self.environments.as_ref()
    }

    fn installers(&self) -> &dyn InstallerFactory {
        self.installers.as_ref()
    }

    fn builder(&self) -> &dyn ArtifactBuilder {
        self.builder.as_ref()
    }
}

pub type SharedEffects = Arc<dyn Effects>;
