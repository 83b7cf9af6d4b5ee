use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::{Config, GlobalOptions};
use crate::effects::{self, Effects, SharedEffects};
use crate::process::OutputRouting;

pub struct CommandContext<'a> {
    pub global: &'a GlobalOptions,
    config: Config,
    project_root: PathBuf,
    effects: SharedEffects,
}

impl<'a> CommandContext<'a> {
    /// Creates a context rooted at the current working directory.
    ///
    /// # Errors
    /// Returns an error if the working directory cannot be read.
    pub fn new(global: &'a GlobalOptions, effects: SharedEffects) -> Result<Self> {
        let config = Config::from_env();
        let project_root = env::current_dir().context("reading current directory")?;
        Ok(Self::from_parts(global, config, project_root, effects))
    }

    #[must_use]
    pub fn from_parts(
        global: &'a GlobalOptions,
        config: Config,
        project_root: PathBuf,
        effects: SharedEffects,
    ) -> Self {
        Self {
            global,
            config,
            project_root,
            effects,
        }
    }

    pub fn effects(&self) -> &dyn Effects {
        self.effects.as_ref()
    }

    pub fn fs(&self) -> &dyn effects::FileSystem {
        self.effects.fs()
    }

    pub fn process(&self) -> &dyn effects::ProcessRunner {
        self.effects.process()
    }

    pub fn tools(&self) -> &dyn effects::ToolLocator {
        self.effects.tools()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// JSON mode owns stdout, so child output is diverted to stderr.
    pub fn output_routing(&self) -> OutputRouting {
        if self.global.json {
            OutputRouting::StderrOnly
        } else {
            OutputRouting::Terminal
        }
    }
}
