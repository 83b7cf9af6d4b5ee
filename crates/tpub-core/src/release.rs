//! The release driver: clean `dist/`, build an sdist and a wheel, upload them.

use std::path::Path;

use anyhow::Result;
use serde_json::{json, Value};

use crate::distribution::{
    clean_output_dir, discover_artifacts, display_dir, format_bytes, plan_build, plan_upload,
    resolve_dist_dir, resolve_repository, run_build, run_upload, tool_failure_details,
    ArtifactSummary, CleanReport, ReleaseRequest, Repository,
};
use crate::outcome::outcome_from_error;
use crate::process::{RunOutput, ToolInvocation};
use crate::{CommandContext, CommandGroup, ExecutionOutcome};

/// Runs one command and folds any error into an outcome.
pub fn execute(
    ctx: &CommandContext,
    group: CommandGroup,
    request: &ReleaseRequest,
) -> ExecutionOutcome {
    let result = match group {
        CommandGroup::Release => release_project(ctx, request),
        CommandGroup::Clean => clean_project(ctx, request),
        CommandGroup::Build => build_project(ctx, request),
        CommandGroup::Upload => upload_project(ctx, request),
    };
    result.unwrap_or_else(|err| {
        tracing::debug!(error = ?err, "command failed");
        outcome_from_error(&err)
    })
}

/// Cleans the output directory, builds, and uploads to the configured index.
///
/// A failed build stops the run unless `keep_going` is set.
///
/// # Errors
/// Returns an error when planning fails, the output directory cannot be
/// cleaned, or a tool cannot be started.
pub fn release_project(ctx: &CommandContext, request: &ReleaseRequest) -> Result<ExecutionOutcome> {
    let dist_dir = resolve_dist_dir(ctx, request);
    let repository = resolve_repository(ctx, request);
    let keep_going = request.keep_going || ctx.config().release().keep_going;
    // Planned before cleaning so a project without metadata keeps its dist/.
    let build_plan = plan_build(ctx, request, &dist_dir)?;

    if request.dry_run {
        let clean = clean_output_dir(ctx.fs(), &dist_dir, ctx.project_root(), true)?;
        let upload_preview = upload_preview(ctx, &repository, &dist_dir)?;
        let present = discover_artifacts(ctx.fs(), &dist_dir, ctx.project_root())?;
        let details = json!({
            "dry_run": true,
            "dist_dir": display_dir(ctx, &dist_dir),
            "repository": repository,
            "backend": build_plan.backend,
            "clean": clean,
            "build": { "command": build_plan.invocation.command_line() },
            "upload": { "command": upload_preview },
            "present": present,
            "keep_going": keep_going,
        });
        let message = format!(
            "dry-run: would remove {} entries, build with {}, upload to {}",
            clean.removed.len(),
            build_plan.backend,
            repository.label
        );
        return Ok(ExecutionOutcome::success(message, details));
    }

    let clean = clean_output_dir(ctx.fs(), &dist_dir, ctx.project_root(), false)?;
    let build = run_build(ctx, &build_plan)?;
    if !build.success() {
        if !keep_going {
            return Ok(step_failure("build", &build_plan.invocation, &build, &clean));
        }
        tracing::warn!(code = build.code, "build failed; uploading anyway (--keep-going)");
    }

    let artifacts = discover_artifacts(ctx.fs(), &dist_dir, ctx.project_root())?;
    if artifacts.is_empty() && !build.success() {
        return Ok(step_failure("build", &build_plan.invocation, &build, &clean));
    }
    let upload_invocation = plan_upload(ctx, &repository, &dist_dir, &artifacts)?;
    let upload = run_upload(ctx, &repository, &upload_invocation)?;
    if !upload.success() {
        let mut outcome = step_failure("upload", &upload_invocation, &upload, &clean);
        if let Value::Object(map) = &mut outcome.details {
            map.insert("build_code".into(), json!(build.code));
            map.insert("artifacts".into(), json!(artifacts));
        }
        return Ok(outcome);
    }

    let details = json!({
        "dry_run": false,
        "dist_dir": display_dir(ctx, &dist_dir),
        "repository": repository,
        "backend": build_plan.backend,
        "clean": clean,
        "build": { "command": build_plan.invocation.command_line(), "code": build.code },
        "upload": { "command": upload_invocation.command_line(), "code": upload.code },
        "artifacts": artifacts,
    });
    let message = format!(
        "uploaded {} to {}",
        artifact_count(artifacts.len()),
        repository.label
    );
    Ok(ExecutionOutcome::success(message, details))
}

/// Empties the output directory without building.
///
/// # Errors
/// Returns an error when the directory cannot be listed or an entry cannot be removed.
pub fn clean_project(ctx: &CommandContext, request: &ReleaseRequest) -> Result<ExecutionOutcome> {
    let dist_dir = resolve_dist_dir(ctx, request);
    let shown = display_dir(ctx, &dist_dir);
    let clean = clean_output_dir(ctx.fs(), &dist_dir, ctx.project_root(), request.dry_run)?;
    let message = if !clean.existed {
        format!("{shown} does not exist; nothing to clean")
    } else if clean.removed.is_empty() {
        format!("{shown} is already empty")
    } else if request.dry_run {
        format!("dry-run: would remove {} entries from {shown}", clean.removed.len())
    } else {
        format!("removed {} entries from {shown}", clean.removed.len())
    };
    Ok(ExecutionOutcome::success(
        message,
        json!({
            "dry_run": request.dry_run,
            "dist_dir": shown,
            "clean": clean,
        }),
    ))
}

/// Cleans the output directory and builds an sdist and a wheel into it.
///
/// # Errors
/// Returns an error when planning fails, cleanup fails, or the packaging tool
/// cannot be started.
pub fn build_project(ctx: &CommandContext, request: &ReleaseRequest) -> Result<ExecutionOutcome> {
    let dist_dir = resolve_dist_dir(ctx, request);
    let plan = plan_build(ctx, request, &dist_dir)?;
    if request.dry_run {
        let clean = clean_output_dir(ctx.fs(), &dist_dir, ctx.project_root(), true)?;
        return Ok(ExecutionOutcome::success(
            format!("dry-run: would build with {}", plan.backend),
            json!({
                "dry_run": true,
                "dist_dir": display_dir(ctx, &dist_dir),
                "backend": plan.backend,
                "clean": clean,
                "build": { "command": plan.invocation.command_line() },
            }),
        ));
    }

    let clean = clean_output_dir(ctx.fs(), &dist_dir, ctx.project_root(), false)?;
    let build = run_build(ctx, &plan)?;
    if !build.success() {
        return Ok(step_failure("build", &plan.invocation, &build, &clean));
    }
    let artifacts = discover_artifacts(ctx.fs(), &dist_dir, ctx.project_root())?;
    if artifacts.is_empty() {
        return Ok(ExecutionOutcome::user_error(
            "build completed but produced no artifacts",
            json!({
                "reason": "no_artifacts",
                "dist_dir": display_dir(ctx, &dist_dir),
                "backend": plan.backend,
                "hint": "check that the packaging tool writes into the configured output directory",
            }),
        ));
    }
    let message = build_message(&artifacts);
    Ok(ExecutionOutcome::success(
        message,
        json!({
            "dry_run": false,
            "dist_dir": display_dir(ctx, &dist_dir),
            "backend": plan.backend,
            "clean": clean,
            "build": { "command": plan.invocation.command_line(), "code": build.code },
            "artifacts": artifacts,
        }),
    ))
}

/// Uploads whatever is already in the output directory.
///
/// # Errors
/// Returns an error when there is nothing to upload or the upload tool cannot
/// be started.
pub fn upload_project(ctx: &CommandContext, request: &ReleaseRequest) -> Result<ExecutionOutcome> {
    let dist_dir = resolve_dist_dir(ctx, request);
    let repository = resolve_repository(ctx, request);
    let artifacts = discover_artifacts(ctx.fs(), &dist_dir, ctx.project_root())?;
    let invocation = plan_upload(ctx, &repository, &dist_dir, &artifacts)?;
    if request.dry_run {
        return Ok(ExecutionOutcome::success(
            format!(
                "dry-run: would upload {} to {}",
                artifact_count(artifacts.len()),
                repository.label
            ),
            json!({
                "dry_run": true,
                "dist_dir": display_dir(ctx, &dist_dir),
                "repository": repository,
                "upload": { "command": invocation.command_line() },
                "artifacts": artifacts,
            }),
        ));
    }

    let upload = run_upload(ctx, &repository, &invocation)?;
    if !upload.success() {
        let mut details = tool_failure_details("upload", &invocation, &upload);
        if let Value::Object(map) = &mut details {
            map.insert("artifacts".into(), json!(artifacts));
        }
        return Ok(ExecutionOutcome::failure(
            format!("upload failed with exit code {}", upload.code),
            details,
        ));
    }
    Ok(ExecutionOutcome::success(
        format!(
            "uploaded {} to {}",
            artifact_count(artifacts.len()),
            repository.label
        ),
        json!({
            "dry_run": false,
            "dist_dir": display_dir(ctx, &dist_dir),
            "repository": repository,
            "upload": { "command": invocation.command_line(), "code": upload.code },
            "artifacts": artifacts,
        }),
    ))
}

fn upload_preview(ctx: &CommandContext, repository: &Repository, dist_dir: &Path) -> Result<String> {
    let tools = ctx.config().tools();
    let tool = ctx
        .tools()
        .upload_tool(tools.twine.as_deref(), tools.python.as_deref())?;
    let glob = dist_dir.join("*").to_string_lossy().to_string();
    Ok(ToolInvocation::new(tool.program, ctx.project_root())
        .args(tool.prefix)
        .args(["upload", "--repository-url"])
        .arg(repository.url.clone())
        .arg(glob)
        .command_line())
}

fn step_failure(
    step: &str,
    invocation: &ToolInvocation,
    output: &RunOutput,
    clean: &CleanReport,
) -> ExecutionOutcome {
    let mut details = tool_failure_details(step, invocation, output);
    if let Value::Object(map) = &mut details {
        map.insert("clean".into(), json!(clean));
        if step == "build" {
            map.insert(
                "hint".into(),
                json!("fix the packaging error above, or pass --keep-going to upload anyway"),
            );
        }
    }
    ExecutionOutcome::failure(
        format!("{step} failed with exit code {}", output.code),
        details,
    )
}

fn build_message(artifacts: &[ArtifactSummary]) -> String {
    let first = &artifacts[0];
    let sha_short: String = first.sha256.chars().take(12).collect();
    if artifacts.len() == 1 {
        format!(
            "wrote {} ({}, sha256={sha_short}…)",
            first.path,
            format_bytes(first.bytes)
        )
    } else {
        let total: u64 = artifacts.iter().map(|artifact| artifact.bytes).sum();
        format!(
            "wrote {} ({} total)",
            artifact_count(artifacts.len()),
            format_bytes(total)
        )
    }
}

fn artifact_count(count: usize) -> String {
    if count == 1 {
        "1 artifact".to_string()
    } else {
        format!("{count} artifacts")
    }
}
