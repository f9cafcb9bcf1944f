use std::fmt::Write as _;
use std::fs;

use anyhow::anyhow;
use pyb_domain::{check_python_compatibility, LockSnapshot, PackageSource, ProjectPackage};
use tracing::{debug, warn};

use crate::effects::{Installer, InstallerFactory};
use crate::environment::VirtualEnv;
use crate::error::BundleError;
use crate::pool::SourcePool;
use crate::process::{run_command, RunOutput};
use crate::scoped::with_temporary_directory;

const QUIET_FLAGS: &[&str] = &[
    "--quiet",
    "--no-input",
    "--disable-pip-version-check",
    "--progress-bar",
    "off",
];

/// Renders the locked set as a pip requirements file.
///
/// Hashes are emitted only when every package carries them, since pip refuses
/// a partially hashed requirements file.
pub fn render_requirements(lock: &LockSnapshot) -> String {
    let hashed = !lock.packages.is_empty()
        && lock.packages.iter().all(|package| !package.files.is_empty());
    let mut out = String::new();
    for package in &lock.packages {
        out.push_str(&package.requirement());
        if hashed {
            for file in &package.files {
                let _ = write!(out, " \\\n    --hash={}", file.hash);
            }
        }
        out.push('\n');
    }
    out
}

#[derive(Clone, Debug)]
struct PipSession {
    base_args: Vec<String>,
    envs: Vec<(String, String)>,
}

/// Drives `python -m pip` inside one environment.
pub struct PipInstaller<'a> {
    env: &'a VirtualEnv,
    package: &'a ProjectPackage,
    lock: &'a LockSnapshot,
    pool: &'a SourcePool,
    session: Option<PipSession>,
}

impl<'a> PipInstaller<'a> {
    pub fn new(
        env: &'a VirtualEnv,
        package: &'a ProjectPackage,
        lock: &'a LockSnapshot,
        pool: &'a SourcePool,
    ) -> Self {
        Self {
            env,
            package,
            lock,
            pool,
            session: None,
        }
    }

    fn session(&mut self) -> Result<PipSession, BundleError> {
        if let Some(session) = &self.session {
            return Ok(session.clone());
        }
        let envs = vec![(
            "VIRTUAL_ENV".to_string(),
            self.env.root.display().to_string(),
        )];
        let probe = run_command(
            &self.env.python,
            &["-m".to_string(), "pip".to_string(), "--version".to_string()],
            &envs,
            &self.env.root,
        )
        .map_err(|err| BundleError::installer(&err))?;
        if !probe.success() {
            return Err(BundleError::installer(&anyhow!(
                "pip is not available in {}: {}",
                self.env.root.display(),
                probe.diagnostic()
            )));
        }
        debug!(pip = probe.stdout.trim(), "pip session ready");
        let mut base_args = vec!["-m".to_string(), "pip".to_string(), "install".to_string()];
        base_args.extend(QUIET_FLAGS.iter().map(ToString::to_string));
        base_args.extend(self.pool.pip_args());
        let session = PipSession { base_args, envs };
        self.session = Some(session.clone());
        Ok(session)
    }

    fn pip(&self, session: &PipSession, extra: &[String]) -> Result<RunOutput, BundleError> {
        let mut args = session.base_args.clone();
        args.extend_from_slice(extra);
        let output = run_command(&self.env.python, &args, &session.envs, &self.env.root)
            .map_err(|err| BundleError::installer(&err))?;
        if !output.success() {
            warn!(code = output.code, stderr = output.diagnostic(), "pip install failed");
        }
        Ok(output)
    }
}

impl Installer for PipInstaller<'_> {
    fn run(&mut self) -> Result<i32, BundleError> {
        check_python_compatibility(self.package.python_requirement(), self.lock)?;
        self.pool.check_lock(self.lock)?;
        if self.lock.is_empty() {
            debug!("lock is empty; nothing to install");
            return Ok(0);
        }
        let session = self.session()?;
        let requirements = render_requirements(self.lock);
        with_temporary_directory("pyb-reqs-", |dir| {
            let path = dir.join("requirements.txt");
            fs::write(&path, &requirements)?;
            let output = self.pip(
                &session,
                &[
                    "--no-deps".to_string(),
                    "-r".to_string(),
                    path.display().to_string(),
                ],
            )?;
            Ok(output.code)
        })
    }

    fn install(&mut self, package: &ProjectPackage) -> Result<i32, BundleError> {
        let artifact = match package.source() {
            PackageSource::File(path) => path.clone(),
            other => {
                return Err(BundleError::installer(&anyhow!(
                    "{package} has a {} source; only local files can be installed",
                    other.source_type()
                )))
            }
        };
        let session = self.session()?;
        let output = self.pip(
            &session,
            &["--no-deps".to_string(), artifact.display().to_string()],
        )?;
        Ok(output.code)
    }
}

pub struct SystemInstallerFactory;

impl InstallerFactory for SystemInstallerFactory {
    fn installer<'a>(
        &self,
        env: &'a VirtualEnv,
        package: &'a ProjectPackage,
        lock: &'a LockSnapshot,
        pool: &'a SourcePool,
    ) -> Box<dyn Installer + 'a> {
        Box::new(PipInstaller::new(env, package, lock, pool))
    }
}
