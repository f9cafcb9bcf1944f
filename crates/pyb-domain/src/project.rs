use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use toml_edit::{DocumentMut, Item, Table};

use crate::lockfile::LOCK_FILENAME;

pub const DEFAULT_PYTHON_REQUIREMENT: &str = ">=3.8";

/// A package index the installer may download locked packages from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PackageIndex {
    pub name: String,
    pub url: String,
    pub default: bool,
}

#[derive(Clone, Debug)]
pub struct ProjectSnapshot {
    pub root: PathBuf,
    pub manifest_path: PathBuf,
    pub lock_path: PathBuf,
    pub name: String,
    pub version: String,
    pub python_requirement: String,
    pub dependencies: Vec<String>,
    pub sources: Vec<PackageIndex>,
    pub manifest_fingerprint: String,
}

impl ProjectSnapshot {
    pub fn read_from(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let manifest_path = root.join("pyproject.toml");
        if !manifest_path.exists() {
            bail!("pyproject.toml not found in {}", root.display());
        }
        let contents = fs::read_to_string(&manifest_path)
            .with_context(|| format!("reading {}", manifest_path.display()))?;
        let doc: DocumentMut = contents
            .parse()
            .with_context(|| format!("failed to parse {}", manifest_path.display()))?;
        let project = project_table(&doc)?;
        let name = project
            .get("name")
            .and_then(Item::as_str)
            .ok_or_else(|| anyhow!("pyproject missing [project].name"))?
            .to_string();
        let version = project
            .get("version")
            .and_then(Item::as_str)
            .ok_or_else(|| anyhow!("pyproject missing [project].version"))?
            .to_string();
        let python_requirement = project
            .get("requires-python")
            .and_then(Item::as_str)
            .map_or_else(|| DEFAULT_PYTHON_REQUIREMENT.to_string(), ToString::to_string);
        let dependencies = read_dependencies(project);
        let sources = read_sources(&doc)?;
        let manifest_fingerprint =
            manifest_fingerprint(&name, &python_requirement, &dependencies);
        Ok(Self {
            root: root.to_path_buf(),
            manifest_path,
            lock_path: root.join(LOCK_FILENAME),
            name,
            version,
            python_requirement,
            dependencies,
            sources,
            manifest_fingerprint,
        })
    }
}

fn project_table(doc: &DocumentMut) -> Result<&Table> {
    doc.get("project")
        .and_then(Item::as_table)
        .ok_or_else(|| anyhow!("[project] must be a table"))
}

fn read_dependencies(project: &Table) -> Vec<String> {
    project
        .get("dependencies")
        .and_then(Item::as_array)
        .map(|array| {
            array
                .iter()
                .filter_map(|val| val.as_str().map(ToString::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn read_sources(doc: &DocumentMut) -> Result<Vec<PackageIndex>> {
    let Some(entries) = doc
        .get("tool")
        .and_then(Item::as_table)
        .and_then(|tool| tool.get("pyb"))
        .and_then(Item::as_table)
        .and_then(|pyb| pyb.get("source"))
    else {
        return Ok(Vec::new());
    };
    let tables = entries
        .as_array_of_tables()
        .ok_or_else(|| anyhow!("[[tool.pyb.source]] must be an array of tables"))?;
    let mut sources = Vec::new();
    for (idx, table) in tables.iter().enumerate() {
        let name = table
            .get("name")
            .and_then(Item::as_str)
            .ok_or_else(|| anyhow!("[[tool.pyb.source]] entry {idx} is missing `name`"))?;
        let url = table
            .get("url")
            .and_then(Item::as_str)
            .ok_or_else(|| anyhow!("[[tool.pyb.source]] `{name}` is missing `url`"))?;
        let default = table
            .get("default")
            .and_then(Item::as_bool)
            .unwrap_or(false);
        sources.push(PackageIndex {
            name: name.to_string(),
            url: url.to_string(),
            default,
        });
    }
    Ok(sources)
}

/// Hash of the manifest fields a lock is resolved against.
///
/// Dependency order and surrounding whitespace do not affect the result.
pub fn manifest_fingerprint(name: &str, python_requirement: &str, dependencies: &[String]) -> String {
    let mut deps: Vec<&str> = dependencies.iter().map(|dep| dep.trim()).collect();
    deps.sort_unstable();
    deps.dedup();
    let mut hasher = Sha256::new();
    hasher.update(name.trim().to_lowercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(python_requirement.trim().as_bytes());
    hasher.update(b"\n");
    for dep in deps {
        hasher.update(dep.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

pub fn current_project_root() -> Result<PathBuf> {
    match discover_project_root()? {
        Some(root) => Ok(root),
        None => Err(anyhow!(
            "No pyproject.toml found in the current directory or any parent"
        )),
    }
}

pub fn discover_project_root() -> Result<Option<PathBuf>> {
    let mut dir = env::current_dir().context("unable to determine project root")?;
    loop {
        if dir.join("pyproject.toml").exists() {
            return Ok(Some(dir));
        }
        if !dir.pop() {
            break;
        }
    }
    Ok(None)
}
