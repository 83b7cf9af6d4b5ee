//! Global options and environment-derived settings.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::distribution::BuildBackend;
use crate::UserError;

pub const DEFAULT_DIST_DIR: &str = "dist";
pub const DEFAULT_REPOSITORY: &str = "testpypi";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalOptions {
    pub quiet: bool,
    pub verbose: u8,
    pub trace: bool,
    pub json: bool,
    pub no_color: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub(crate) fn capture() -> Self {
        Self {
            vars: env::vars_os()
                .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
                .collect(),
        }
    }

    pub(crate) fn flag_is_enabled(&self, key: &str) -> bool {
        matches!(self.vars.get(key).map(String::as_str), Some("1"))
    }

    /// Returns the value of `key`, treating blank values as unset.
    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
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

#[derive(Debug)]
pub struct Config {
    pub(crate) tools: ToolConfig,
    pub(crate) release: ReleaseConfig,
}

impl Config {
    /// Builds a configuration snapshot from the current process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_snapshot(&EnvSnapshot::capture())
    }

    pub(crate) fn from_snapshot(snapshot: &EnvSnapshot) -> Self {
        Self {
            tools: ToolConfig {
                python: snapshot.var("TPUB_PYTHON").map(ToOwned::to_owned),
                twine: snapshot.var("TPUB_TWINE").map(ToOwned::to_owned),
            },
            release: ReleaseConfig {
                dist_dir: PathBuf::from(
                    snapshot.var("TPUB_DIST_DIR").unwrap_or(DEFAULT_DIST_DIR),
                ),
                repository: snapshot
                    .var("TPUB_REPOSITORY")
                    .unwrap_or(DEFAULT_REPOSITORY)
                    .to_string(),
                backend: snapshot.var("TPUB_BUILD_BACKEND").map(ToOwned::to_owned),
                keep_going: snapshot.flag_is_enabled("TPUB_KEEP_GOING"),
            },
        }
    }

    #[must_use]
    pub fn tools(&self) -> &ToolConfig {
        &self.tools
    }

    #[must_use]
    pub fn release(&self) -> &ReleaseConfig {
        &self.release
    }
}

#[derive(Debug, Clone, Default)]
pub struct ToolConfig {
    pub python: Option<String>,
    pub twine: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReleaseConfig {
    pub dist_dir: PathBuf,
    pub repository: String,
    /// Raw `TPUB_BUILD_BACKEND`; only parsed when no `--backend` flag is given.
    pub backend: Option<String>,
    pub keep_going: bool,
}

impl ReleaseConfig {
    /// The configured packaging backend, `auto` when unset.
    ///
    /// # Errors
    /// Returns a user error when `TPUB_BUILD_BACKEND` names no known backend.
    pub fn build_backend(&self) -> Result<BuildBackend> {
        let Some(raw) = self.backend.as_deref() else {
            return Ok(BuildBackend::Auto);
        };
        raw.parse::<BuildBackend>().map_err(|_| {
            UserError::new(
                format!("unsupported TPUB_BUILD_BACKEND value `{raw}`"),
                json!({
                    "reason": "invalid_backend",
                    "value": raw,
                    "hint": "use one of: auto, build, setuptools",
                }),
            )
            .into()
        })
    }
}
