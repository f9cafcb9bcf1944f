use std::collections::HashMap;
use std::env;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalOptions {
    pub quiet: bool,
    pub verbose: u8,
    pub trace: bool,
    pub json: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub(crate) fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub(crate) fn non_empty(&self, key: &str) -> Option<String> {
        self.var(key)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned)
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub(crate) runtime: RuntimeConfig,
    pub(crate) network: NetworkConfig,
    pub(crate) index: IndexConfig,
}

impl Config {
    /// Builds a configuration snapshot from the current process environment.
    pub fn from_env() -> Self {
        Self::from_snapshot(&EnvSnapshot::capture())
    }

    pub(crate) fn from_snapshot(snapshot: &EnvSnapshot) -> Self {
        Self {
            runtime: RuntimeConfig {
                python: snapshot.non_empty("PYB_RUNTIME_PYTHON"),
            },
            network: NetworkConfig {
                online: match snapshot.var("PYB_ONLINE") {
                    Some(value) => {
                        let lowered = value.trim().to_ascii_lowercase();
                        !matches!(lowered.as_str(), "" | "0" | "false" | "no" | "off")
                    }
                    None => true,
                },
            },
            index: IndexConfig {
                url: snapshot.non_empty("PYB_INDEX_URL"),
            },
        }
    }

    #[must_use]
    pub fn runtime(&self) -> &RuntimeConfig {
        &self.runtime
    }

    #[must_use]
    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    #[must_use]
    pub fn index(&self) -> &IndexConfig {
        &self.index
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    pub python: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct NetworkConfig {
    pub online: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self { online: true }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IndexConfig {
    pub url: Option<String>,
}
