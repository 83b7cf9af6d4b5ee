use std::path::Path;

use anyhow::Result;
use serde_json::json;

use crate::process::{RunOutput, ToolInvocation};
use crate::{CommandContext, UserError};

use super::artifacts::ArtifactSummary;
use super::plan::Repository;
use super::{display_dir, run_tool};

pub(crate) fn plan_upload(
    ctx: &CommandContext,
    repository: &Repository,
    dist_dir: &Path,
    artifacts: &[ArtifactSummary],
) -> Result<ToolInvocation> {
    if artifacts.is_empty() {
        let shown = display_dir(ctx, dist_dir);
        return Err(UserError::new(
            format!("no artifacts found in {shown}"),
            json!({
                "reason": "no_artifacts",
                "dist_dir": shown,
                "hint": "run `tpub build` first, or check that the packaging tool writes to this directory",
            }),
        )
        .into());
    }
    let tools = ctx.config().tools();
    let tool = ctx
        .tools()
        .upload_tool(tools.twine.as_deref(), tools.python.as_deref())?;
    Ok(ToolInvocation::new(tool.program, ctx.project_root())
        .args(tool.prefix)
        .args(["upload", "--repository-url"])
        .arg(repository.url.clone())
        .args(
            artifacts
                .iter()
                .map(|artifact| artifact.absolute_path.clone().into_os_string()),
        ))
}

pub(crate) fn run_upload(
    ctx: &CommandContext,
    repository: &Repository,
    invocation: &ToolInvocation,
) -> Result<RunOutput> {
    tracing::info!(repository = %repository.label, url = %repository.url, "uploading artifacts");
    run_tool(ctx, "upload", invocation)
}
