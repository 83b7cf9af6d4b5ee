#![deny(clippy::all, warnings)]

pub mod config;
mod context;
pub mod distribution;
pub mod effects;
mod outcome;
pub mod process;
pub mod python;
mod release;

pub use crate::config::{Config, GlobalOptions, ReleaseConfig, ToolConfig};
pub use crate::context::CommandContext;
pub use crate::distribution::{
    ArtifactKind, ArtifactSummary, BuildBackend, CleanReport, ReleaseRequest, Repository,
};
pub use crate::effects::{Effects, SharedEffects, SystemEffects};
pub use crate::outcome::{
    exit_code_for, format_status_message, outcome_from_error, to_json_response, CommandGroup,
    CommandStatus, ExecutionOutcome, UserError,
};
pub use crate::process::{OutputRouting, RunOutput, ToolInvocation};
pub use crate::release::{build_project, clean_project, execute, release_project, upload_project};

pub const TPUB_VERSION: &str = env!("CARGO_PKG_VERSION");
