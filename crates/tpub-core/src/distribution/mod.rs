//! Output-directory cleanup, packaging, and upload steps.

mod artifacts;
mod build;
mod clean;
mod plan;
mod upload;

use anyhow::Result;
use serde_json::{json, Value};

use crate::process::{RunOutput, ToolInvocation};
use crate::CommandContext;

pub use artifacts::{ArtifactKind, ArtifactSummary};
pub use clean::CleanReport;
pub use plan::{BuildBackend, ReleaseRequest, Repository};

pub(crate) use artifacts::{discover_artifacts, format_bytes};
pub(crate) use build::run_build;
pub(crate) use clean::clean_output_dir;
pub(crate) use plan::{display_dir, plan_build, resolve_dist_dir, resolve_repository, BuildPlan};
pub(crate) use upload::{plan_upload, run_upload};

const STDERR_TAIL_LINES: usize = 20;

fn run_tool(ctx: &CommandContext, step: &str, invocation: &ToolInvocation) -> Result<RunOutput> {
    tracing::debug!(step, cwd = %invocation.cwd.display(), "running {}", invocation);
    let output = ctx.process().run(invocation, ctx.output_routing())?;
    if output.success() {
        tracing::debug!(step, "step finished");
    } else {
        tracing::warn!(step, code = output.code, "{} exited with a failure status", invocation.program);
    }
    Ok(output)
}

/// Details for a step whose tool exited non-zero.
pub(crate) fn tool_failure_details(
    step: &str,
    invocation: &ToolInvocation,
    output: &RunOutput,
) -> Value {
    let lines: Vec<&str> = output.stderr.lines().collect();
    let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
    json!({
        "reason": format!("{step}_failed"),
        "step": step,
        "code": output.code,
        "command": invocation.command_line(),
        "stderr_tail": tail,
    })
}
