use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use anyhow::Result;
use pyb_domain::current_project_root;

use crate::config::{Config, GlobalOptions};
use crate::effects::{Effects, SharedEffects, SystemEffects};

/// Everything a command needs: global flags, configuration and effects.
pub struct CommandContext<'a> {
    pub global: &'a GlobalOptions,
    config: Config,
    project_root: OnceLock<PathBuf>,
    effects: SharedEffects,
}

impl<'a> CommandContext<'a> {
    /// Creates a context backed by the real system and the process environment.
    pub fn new(global: &'a GlobalOptions) -> Self {
        let config = Config::from_env();
        let effects: SharedEffects = Arc::new(SystemEffects::new(&config));
        Self::with_effects(global, config, effects)
    }

    pub fn with_effects(global: &'a GlobalOptions, config: Config, effects: SharedEffects) -> Self {
        Self {
            global,
            config,
            project_root: OnceLock::new(),
            effects,
        }
    }

    /// Pins the project root instead of discovering it from the working directory.
    #[must_use]
    pub fn with_project_root(self, root: PathBuf) -> Self {
        let _ = self.project_root.set(root);
        self
    }

    pub fn effects(&self) -> &dyn Effects {
        self.effects.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolves the current project's root directory.
    ///
    /// # Errors
    /// Returns an error when no `pyproject.toml` is found up the directory tree.
    pub fn project_root(&self) -> Result<PathBuf> {
        if let Some(path) = self.project_root.get() {
            Ok(path.clone())
        } else {
            let path = current_project_root()?;
            let _ = self.project_root.set(path.clone());
            Ok(path)
        }
    }
}
