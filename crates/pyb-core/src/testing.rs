//! Recording fakes of the effect traits.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use pyb_domain::{LockSnapshot, PackageSource, ProjectPackage};

use crate::effects::{
    ArtifactBuilder, Effects, EnvironmentManager, Installer, InstallerFactory, InterpreterLookup,
};
use crate::environment::VirtualEnv;
use crate::error::BundleError;
use crate::interpreter::{Interpreter, PythonVersion};
use crate::pool::SourcePool;

pub(crate) const AMBIENT: PythonVersion = PythonVersion::new(3, 11, 7);
pub(crate) const EXPLICIT: PythonVersion = PythonVersion::new(3, 12, 2);

#[derive(Default)]
pub(crate) struct FakeState {
    pub(crate) calls: Vec<String>,
    pub(crate) build_dirs: Vec<PathBuf>,
    pub(crate) installed_artifacts: Vec<(PathBuf, bool)>,
}

impl FakeState {
    fn record(state: &Mutex<FakeState>, call: impl Into<String>) {
        state.lock().unwrap().calls.push(call.into());
    }
}

#[derive(Default)]
pub(crate) struct FakeEffects {
    pub(crate) state: Arc<Mutex<FakeState>>,
    pub(crate) dependency_code: i32,
    pub(crate) artifact_code: i32,
    pub(crate) fail_build: bool,
}

impl FakeEffects {
    fn record(&self, call: impl Into<String>) {
        FakeState::record(&self.state, call);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }
}

impl InterpreterLookup for FakeEffects {
    fn resolve(&self, identifier: &str) -> Result<Interpreter, BundleError> {
        self.record(format!("resolve {identifier}"));
        if identifier == "missing" {
            return Err(BundleError::InterpreterNotFound {
                identifier: identifier.to_string(),
                reason: "not on PATH".to_string(),
            });
        }
        Ok(Interpreter {
            executable: Some(PathBuf::from(identifier)),
            version: EXPLICIT,
        })
    }

    fn ambient(&self) -> Result<Interpreter, BundleError> {
        self.record("ambient");
        Ok(Interpreter {
            executable: None,
            version: AMBIENT,
        })
    }
}

impl EnvironmentManager for FakeEffects {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn remove(&self, path: &Path) -> Result<(), BundleError> {
        self.record("remove");
        fs::remove_dir_all(path)?;
        Ok(())
    }

    fn create(&self, path: &Path, interpreter: &Interpreter) -> Result<VirtualEnv, BundleError> {
        self.record(format!("create {}", interpreter.version));
        fs::create_dir_all(path.join("site-packages"))?;
        fs::write(
            path.join("pyvenv.cfg"),
            format!("version = {}\n", interpreter.version),
        )?;
        Ok(VirtualEnv::new(path.to_path_buf(), interpreter.version))
    }
}

struct FakeInstaller<'a> {
    state: Arc<Mutex<FakeState>>,
    dependency_code: i32,
    artifact_code: i32,
    env: &'a VirtualEnv,
    lock: &'a LockSnapshot,
}

impl Installer for FakeInstaller<'_> {
    fn run(&mut self) -> Result<i32, BundleError> {
        FakeState::record(&self.state, "install dependencies");
        if self.dependency_code == 0 {
            for package in &self.lock.packages {
                fs::write(
                    self.env.root.join("site-packages").join(&package.name),
                    &package.version,
                )?;
            }
        }
        Ok(self.dependency_code)
    }

    fn install(&mut self, package: &ProjectPackage) -> Result<i32, BundleError> {
        FakeState::record(&self.state, format!("install {package}"));
        let PackageSource::File(path) = package.source() else {
            panic!("artifact should be a file source");
        };
        self.state
            .lock()
            .unwrap()
            .installed_artifacts
            .push((path.clone(), path.exists()));
        if self.artifact_code == 0 {
            fs::write(
                self.env.root.join("site-packages").join(package.module_name()),
                package.pretty_version(),
            )?;
        }
        Ok(self.artifact_code)
    }
}

impl InstallerFactory for FakeEffects {
    fn installer<'a>(
        &self,
        env: &'a VirtualEnv,
        _package: &'a ProjectPackage,
        lock: &'a LockSnapshot,
        _pool: &'a SourcePool,
    ) -> Box<dyn Installer + 'a> {
        self.record("installer");
        Box::new(FakeInstaller {
            state: Arc::clone(&self.state),
            dependency_code: self.dependency_code,
            artifact_code: self.artifact_code,
            env,
            lock,
        })
    }
}

impl ArtifactBuilder for FakeEffects {
    fn build(
        &self,
        package: &ProjectPackage,
        _env: &VirtualEnv,
        out_dir: &Path,
    ) -> Result<String, BundleError> {
        self.record("build");
        self.state
            .lock()
            .unwrap()
            .build_dirs
            .push(out_dir.to_path_buf());
        if self.fail_build {
            return Err(BundleError::ArtifactBuild {
                reason: "missing module".to_string(),
            });
        }
        let filename = format!(
            "{}-{}-py3-none-any.whl",
            package.module_name(),
            package.pretty_version()
        );
        fs::write(out_dir.join(&filename), b"wheel")?;
        Ok(filename)
    }
}

impl Effects for FakeEffects {
    fn interpreters(&self) -> &dyn InterpreterLookup {
        self
    }

    fn environments(&self) -> &dyn EnvironmentManager {
        self
    }

    fn installers(&self) -> &dyn InstallerFactory {
        self
    }

    fn builder(&self) -> &dyn ArtifactBuilder {
        self
    }
}
