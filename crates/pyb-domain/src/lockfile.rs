use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use toml_edit::{DocumentMut, Item, Table};

use crate::project::ProjectSnapshot;

pub const LOCK_FILENAME: &str = "pyb.lock";
pub const LOCK_VERSION: i64 = 1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockedFile {
    pub file: String,
    pub hash: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockedPackage {
    pub name: String,
    pub version: String,
    pub requires_python: Option<String>,
    pub marker: Option<String>,
    pub source: Option<String>,
    pub files: Vec<LockedFile>,
}

impl LockedPackage {
    /// Requirement line pinning this package, with its marker when present.
    pub fn requirement(&self) -> String {
        match &self.marker {
            Some(marker) => format!("{}=={} ; {marker}", self.name, self.version),
            None => format!("{}=={}", self.name, self.version),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct LockSnapshot {
    pub version: i64,
    pub content_hash: Option<String>,
    pub python_requirement: Option<String>,
    pub packages: Vec<LockedPackage>,
}

impl LockSnapshot {
    /// Whether the lock was produced from the manifest as it is now.
    ///
    /// A recorded `[python] requirement` must also match the project's.
    pub fn is_fresh(&self, snapshot: &ProjectSnapshot) -> bool {
        let python_matches = self
            .python_requirement
            .as_deref()
            .map_or(true, |requirement| {
                requirement.trim() == snapshot.python_requirement.trim()
            });
        python_matches
            && self.content_hash.as_deref() == Some(snapshot.manifest_fingerprint.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

pub fn load_lockfile(path: &Path) -> Result<LockSnapshot> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let doc: DocumentMut = contents
        .parse()
        .with_context(|| format!("failed to parse {}", path.display()))?;
    parse_lock_document(&doc).with_context(|| format!("invalid lock at {}", path.display()))
}

pub fn parse_lockfile(contents: &str) -> Result<LockSnapshot> {
    let doc: DocumentMut = contents.parse().context("failed to parse lockfile")?;
    parse_lock_document(&doc)
}

fn parse_lock_document(doc: &DocumentMut) -> Result<LockSnapshot> {
    let version = doc
        .get("version")
        .and_then(Item::as_integer)
        .unwrap_or(LOCK_VERSION);
    if version > LOCK_VERSION {
        bail!("lock version {version} is newer than the supported version {LOCK_VERSION}");
    }
    let content_hash = doc
        .get("metadata")
        .and_then(Item::as_table)
        .and_then(|table| table.get("content-hash"))
        .and_then(Item::as_str)
        .map(ToString::to_string);
    let python_requirement = doc
        .get("python")
        .and_then(Item::as_table)
        .and_then(|table| table.get("requirement"))
        .and_then(Item::as_str)
        .map(ToString::to_string);
    let mut packages = Vec::new();
    if let Some(item) = doc.get("package") {
        let tables = item
            .as_array_of_tables()
            .ok_or_else(|| anyhow!("[[package]] must be an array of tables"))?;
        for (idx, table) in tables.iter().enumerate() {
            packages.push(parse_package(idx, table)?);
        }
    }
    Ok(LockSnapshot {
        version,
        content_hash,
        python_requirement,
        packages,
    })
}

fn parse_package(idx: usize, table: &Table) -> Result<LockedPackage> {
    let name = optional_str(table, "name")
        .ok_or_else(|| anyhow!("locked package {idx} is missing `name`"))?;
    let version = optional_str(table, "version")
        .ok_or_else(|| anyhow!("locked package `{name}` is missing `version`"))?;
    let files = table
        .get("files")
        .and_then(Item::as_array_of_tables)
        .map(|files| {
            files
                .iter()
                .filter_map(|entry| {
                    Some(LockedFile {
                        file: optional_str(entry, "file")?,
                        hash: optional_str(entry, "hash")?,
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(LockedPackage {
        requires_python: optional_str(table, "requires-python"),
        marker: optional_str(table, "marker"),
        source: optional_str(table, "source"),
        name,
        version,
        files,
    })
}

fn optional_str(table: &Table, key: &str) -> Option<String> {
    table
        .get(key)
        .and_then(Item::as_str)
        .map(ToString::to_string)
}
