use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use pyb_domain::{PackageSource, ProjectPackage};
use tracing::debug;
use walkdir::WalkDir;

use crate::effects::ArtifactBuilder;
use crate::environment::VirtualEnv;
use crate::error::BundleError;

const STAGED_FILES: &[&str] = &[
    "pyproject.toml",
    "setup.cfg",
    "setup.py",
    "MANIFEST.in",
    "README.md",
    "README.rst",
    "README.txt",
    "LICENSE",
    "LICENSE.txt",
];

/// Builds wheels in-process with `uv-build-backend`.
pub struct UvWheelBuilder;

impl ArtifactBuilder for UvWheelBuilder {
    fn build(
        &self,
        package: &ProjectPackage,
        env: &VirtualEnv,
        out_dir: &Path,
    ) -> Result<String, BundleError> {
        build_wheel(package, env, out_dir).map_err(|err| BundleError::ArtifactBuild {
            reason: format!("{err:#}"),
        })
    }
}

fn build_wheel(package: &ProjectPackage, env: &VirtualEnv, out_dir: &Path) -> Result<String> {
    let PackageSource::Directory(project_root) = package.source() else {
        bail!("{package} is not a project directory");
    };
    if !package.python_requirement().contains(&env.version.to_pep440()) {
        bail!(
            "{package} requires Python {} but the environment runs {}",
            package.python_requirement(),
            env.version
        );
    }
    let build_root = prepare_build_root(project_root, &package.module_name(), out_dir)?;
    let filename =
        uv_build_backend::build_wheel(build_root.path(), out_dir, None, crate::PYB_VERSION)
            .context("building wheel")?;
    let filename = filename.to_string();
    debug!(%filename, out_dir = %out_dir.display(), "built wheel");
    Ok(filename)
}

struct BuildRoot {
    path: PathBuf,
    _staging: Option<tempfile::TempDir>,
}

impl BuildRoot {
    fn path(&self) -> &Path {
        &self.path
    }
}

// Flat layouts are staged into `src/<module>` so the backend always sees the
// layout it expects. The project itself is left alone.
fn prepare_build_root(project_root: &Path, module: &str, out_dir: &Path) -> Result<BuildRoot> {
    let expected_init = project_root.join("src").join(module).join("__init__.py");
    if expected_init.exists() {
        return Ok(BuildRoot {
            path: project_root.to_path_buf(),
            _staging: None,
        });
    }

    let staging = tempfile::Builder::new()
        .prefix(".pyb-build-")
        .tempdir_in(out_dir)
        .context("creating build staging directory")?;
    let root = staging.path().to_path_buf();

    for filename in STAGED_FILES {
        let src = project_root.join(filename);
        if src.exists() {
            fs::copy(&src, root.join(filename))
                .with_context(|| format!("staging {}", src.display()))?;
        }
    }

    let src_dir = project_root.join("src");
    if src_dir.is_dir() {
        copy_tree(&src_dir, &root.join("src"))
            .with_context(|| format!("staging {}", src_dir.display()))?;
    }

    let module_dir = root.join("src").join(module);
    let flat_package = project_root.join(module);
    if !module_dir.exists() && flat_package.is_dir() {
        copy_tree(&flat_package, &module_dir)
            .with_context(|| format!("staging {}", flat_package.display()))?;
    }

    if !module_dir.join("__init__.py").is_file() {
        bail!(
            "no `{module}` package found in {}; expected src/{module}/__init__.py or {module}/__init__.py",
            project_root.display()
        );
    }
    debug!(root = %root.display(), "staged build root");

    Ok(BuildRoot {
        path: root,
        _staging: Some(staging),
    })
}

fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    for entry in WalkDir::new(from) {
        let entry = entry?;
        let path = entry.path();
        let relative = path.strip_prefix(from).unwrap_or(path);
        if relative
            .components()
            .any(|part| part.as_os_str() == "__pycache__")
        {
            continue;
        }
        let dest = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(path, &dest)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::PythonVersion;
    use pyb_domain::ProjectSnapshot;

    fn write_project(root: &Path, requires_python: &str) {
        fs::create_dir_all(root).unwrap();
        fs::write(
            root.join("pyproject.toml"),
            format!(
                "[project]\nname = \"demo-app\"\nversion = \"0.1.0\"\nrequires-python = \"{requires_python}\"\n\n[build-system]\nrequires = [\"uv_build\"]\nbuild-backend = \"uv_build\"\n"
            ),
        )
        .unwrap();
    }

    fn package(root: &Path) -> ProjectPackage {
        let snapshot = ProjectSnapshot::read_from(root).unwrap();
        ProjectPackage::from_snapshot(&snapshot).unwrap()
    }

    fn env(version: PythonVersion) -> VirtualEnv {
        VirtualEnv::new(PathBuf::from("/nonexistent/pyb-env"), version)
    }

    #[test]
    fn src_layout_builds_in_place() {
        let temp = tempfile::tempdir().unwrap();
        let project = temp.path().join("proj");
        fs::create_dir_all(project.join("src").join("demo_app")).unwrap();
        fs::write(project.join("src").join("demo_app").join("__init__.py"), "").unwrap();
        let out_dir = temp.path().join("out");
        fs::create_dir_all(&out_dir).unwrap();

        let root = prepare_build_root(&project, "demo_app", &out_dir).unwrap();
        assert_eq!(root.path(), project);
        assert_eq!(fs::read_dir(&out_dir).unwrap().count(), 0);
    }

    #[test]
    fn flat_layout_is_staged_without_touching_project() {
        let temp = tempfile::tempdir().unwrap();
        let project = temp.path().join("proj");
        write_project(&project, ">=3.8");
        fs::write(project.join("README.md"), "# demo").unwrap();
        fs::create_dir_all(project.join("demo_app").join("__pycache__")).unwrap();
        fs::write(project.join("demo_app").join("__init__.py"), "VALUE = 1\n").unwrap();
        fs::write(project.join("demo_app").join("__pycache__").join("x.pyc"), "").unwrap();
        let out_dir = temp.path().join("out");
        fs::create_dir_all(&out_dir).unwrap();

        let root = prepare_build_root(&project, "demo_app", &out_dir).unwrap();
        let staged = root.path().to_path_buf();
        assert!(staged.starts_with(&out_dir));
        assert!(!project.join("src").exists());
        assert!(staged.join("README.md").exists());
        assert_eq!(
            fs::read_to_string(staged.join("src").join("demo_app").join("__init__.py")).unwrap(),
            "VALUE = 1\n"
        );
        assert!(!staged.join("src").join("demo_app").join("__pycache__").exists());

        drop(root);
        assert!(!staged.exists());
    }

    #[test]
    fn missing_module_is_a_build_error() {
        let temp = tempfile::tempdir().unwrap();
        let project = temp.path().join("proj");
        write_project(&project, ">=3.8");
        fs::create_dir_all(project.join("demoapp")).unwrap();
        fs::write(project.join("demoapp").join("__init__.py"), "VALUE = 1\n").unwrap();
        let out_dir = temp.path().join("out");
        fs::create_dir_all(&out_dir).unwrap();

        let err = UvWheelBuilder
            .build(&package(&project), &env(PythonVersion::new(3, 11, 0)), &out_dir)
            .unwrap_err();
        assert!(matches!(err, BundleError::ArtifactBuild { .. }), "{err}");
        assert!(err.to_string().contains("no `demo_app` package found"), "{err}");
        assert_eq!(fs::read_dir(&out_dir).unwrap().count(), 0);
    }

    #[test]
    fn module_directory_without_init_is_a_build_error() {
        let temp = tempfile::tempdir().unwrap();
        let project = temp.path().join("proj");
        write_project(&project, ">=3.8");
        fs::create_dir_all(project.join("src").join("demo_app")).unwrap();
        fs::write(project.join("src").join("demo_app").join("cli.py"), "").unwrap();
        let out_dir = temp.path().join("out");
        fs::create_dir_all(&out_dir).unwrap();

        let err = prepare_build_root(&project, "demo_app", &out_dir).err().expect("error");
        assert!(err.to_string().contains("src/demo_app/__init__.py"), "{err}");
    }

    #[test]
    fn incompatible_environment_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let project = temp.path().join("proj");
        write_project(&project, ">=3.12");
        let err = UvWheelBuilder
            .build(&package(&project), &env(PythonVersion::new(3, 8, 10)), temp.path())
            .unwrap_err();
        assert!(matches!(err, BundleError::ArtifactBuild { .. }), "{err}");
        assert!(err.to_string().contains("requires Python >=3.12"), "{err}");
    }

    #[test]
    fn file_sources_are_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let project = temp.path().join("proj");
        write_project(&project, ">=3.8");
        let wheel = temp.path().join("demo_app-0.1.0-py3-none-any.whl");
        let installable = package(&project).with_file_source(&wheel);
        let err = UvWheelBuilder
            .build(&installable, &env(PythonVersion::new(3, 11, 0)), temp.path())
            .unwrap_err();
        assert!(err.to_string().contains("not a project directory"), "{err}");
    }

    #[test]
    fn builds_wheel_for_src_layout() {
        let temp = tempfile::tempdir().unwrap();
        let project = temp.path().join("proj");
        write_project(&project, ">=3.8");
        fs::create_dir_all(project.join("src").join("demo_app")).unwrap();
        fs::write(project.join("src").join("demo_app").join("__init__.py"), "").unwrap();
        let out_dir = temp.path().join("out");
        fs::create_dir_all(&out_dir).unwrap();

        let filename = UvWheelBuilder
            .build(&package(&project), &env(PythonVersion::new(3, 11, 0)), &out_dir)
            .expect("wheel");
        assert!(filename.starts_with("demo_app-0.1.0"), "{filename}");
        assert!(filename.ends_with(".whl"), "{filename}");
        assert!(out_dir.join(&filename).exists());
    }
}
