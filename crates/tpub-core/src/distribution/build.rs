use anyhow::Result;

use crate::process::RunOutput;
use crate::CommandContext;

use super::{run_tool, BuildPlan};

/// Runs the packaging tool once; it writes the sdist and wheel itself.
pub(crate) fn run_build(ctx: &CommandContext, plan: &BuildPlan) -> Result<RunOutput> {
    tracing::info!(backend = %plan.backend, "building source distribution and wheel");
    run_tool(ctx, "build", &plan.invocation)
}
