use std::fmt::Write as _;
use std::str::FromStr;

use pep440_rs::{Version, VersionSpecifiers};
use pep508_rs::{MarkerExpression, MarkerOperator, MarkerTree, MarkerValue, MarkerValueVersion};
use tracing::debug;

use crate::lockfile::LockSnapshot;

/// A resolution failure reported by the locker, carried as its message text.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SolverProblemError {
    message: String,
}

impl SolverProblemError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

// Interpreter releases probed when comparing two requires-python ranges.
const PROBE_SERIES: &[(u64, u64)] = &[(2, 7), (3, 20)];
const PROBE_PATCHES: &[u64] = &[0, 99];

/// A probed interpreter: its full version and its `major.minor` series.
struct Probe {
    full: Version,
    series: Version,
}

fn probes() -> impl Iterator<Item = Probe> {
    PROBE_SERIES.iter().flat_map(|&(major, max_minor)| {
        (0..=max_minor).flat_map(move |minor| {
            PROBE_PATCHES.iter().map(move |&patch| Probe {
                full: Version::new([major, minor, patch]),
                series: Version::new([major, minor]),
            })
        })
    })
}

// Only the Python version clauses of a marker are evaluated. Any other clause
// might hold on some platform, so it counts as satisfied.
fn marker_applies(marker: &MarkerTree, probe: &Probe) -> bool {
    match marker {
        MarkerTree::Expression(expression) => expression_applies(expression, probe),
        MarkerTree::And(markers) => markers.iter().all(|marker| marker_applies(marker, probe)),
        MarkerTree::Or(markers) => markers.iter().any(|marker| marker_applies(marker, probe)),
    }
}

fn expression_applies(expression: &MarkerExpression, probe: &Probe) -> bool {
    let (field, operator, value) = match (&expression.l_value, &expression.r_value) {
        (MarkerValue::MarkerEnvVersion(field), MarkerValue::QuotedString(value)) => {
            (field, Some(expression.operator.to_string()), value)
        }
        (MarkerValue::QuotedString(value), MarkerValue::MarkerEnvVersion(field)) => {
            (field, mirrored(&expression.operator), value)
        }
        _ => return true,
    };
    let Some(operator) = operator else {
        return true;
    };
    let candidate = match field {
        MarkerValueVersion::PythonVersion => &probe.series,
        MarkerValueVersion::PythonFullVersion => &probe.full,
        MarkerValueVersion::ImplementationVersion => return true,
    };
    VersionSpecifiers::from_str(&format!("{operator}{value}"))
        .map_or(true, |specifiers| specifiers.contains(candidate))
}

// `'3.9' <= python_version` reads as `python_version >= '3.9'`.
fn mirrored(operator: &MarkerOperator) -> Option<String> {
    let mirrored = match operator {
        MarkerOperator::Equal => "==",
        MarkerOperator::NotEqual => "!=",
        MarkerOperator::GreaterThan => "<",
        MarkerOperator::GreaterEqual => "<=",
        MarkerOperator::LessThan => ">",
        MarkerOperator::LessEqual => ">=",
        _ => return None,
    };
    Some(mirrored.to_string())
}

/// Fails when some locked package cannot run on every Python the project supports.
///
/// A package only has to support the interpreters its marker selects it for, so
/// `numpy ; python_version >= '3.9'` requiring `>=3.9` is fine in a `>=3.8` project.
/// Unparsable `requires-python` values and markers on locked packages are skipped;
/// the installer reports them if they matter.
pub fn check_python_compatibility(
    project_requirement: &VersionSpecifiers,
    lock: &LockSnapshot,
) -> Result<(), SolverProblemError> {
    let mut offenders = Vec::new();
    for package in &lock.packages {
        let Some(raw) = package.requires_python.as_deref() else {
            continue;
        };
        let specifiers = match VersionSpecifiers::from_str(raw) {
            Ok(specifiers) => specifiers,
            Err(err) => {
                debug!(package = %package.name, %err, "ignoring unparsable requires-python");
                continue;
            }
        };
        let marker = match package.marker.as_deref().map(MarkerTree::from_str) {
            None => None,
            Some(Ok(marker)) => Some(marker),
            Some(Err(err)) => {
                debug!(package = %package.name, %err, "ignoring unparsable marker");
                None
            }
        };
        let excluded = probes().any(|probe| {
            project_requirement.contains(&probe.full)
                && marker
                    .as_ref()
                    .map_or(true, |marker| marker_applies(marker, &probe))
                && !specifiers.contains(&probe.full)
        });
        if excluded {
            offenders.push((package.name.as_str(), raw));
        }
    }
    if offenders.is_empty() {
        return Ok(());
    }
    let mut message = format!(
        "The current project's Python requirement ({project_requirement}) is not compatible \
         with some of the required packages Python requirement:"
    );
    for (name, requirement) in offenders {
        let _ = write!(message, "\n  - {name} requires Python {requirement}");
    }
    Err(SolverProblemError::new(message))
}
