use atty::Stream;
use color_eyre::Result;
use serde_json::Value;
use tpub_core::{CommandGroup, CommandStatus, ExecutionOutcome};

use crate::style::Style;

#[derive(Clone, Copy, Debug)]
pub struct OutputOptions {
    pub quiet: bool,
    pub json: bool,
    pub no_color: bool,
}

pub fn emit_output(
    opts: &OutputOptions,
    group: CommandGroup,
    outcome: &ExecutionOutcome,
) -> Result<i32> {
    let code = tpub_core::exit_code_for(outcome);

    if opts.json {
        let payload = tpub_core::to_json_response(group, outcome);
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(code);
    }

    let message = tpub_core::format_status_message(group, &outcome.message);
    if let CommandStatus::Ok = outcome.status {
        if opts.quiet {
            return Ok(code);
        }
        let style = Style::new(opts.no_color, atty::is(Stream::Stdout));
        println!("{}", style.status(&outcome.status, &message));
        for line in detail_lines(&style, &outcome.details) {
            println!("{line}");
        }
    } else {
        let style = Style::new(opts.no_color, atty::is(Stream::Stderr));
        eprintln!("{}", style.status(&outcome.status, &message));
        if let Some(command) = failed_command(&outcome.details) {
            eprintln!("{}", style.dimmed(&format!("  command: {command}")));
        }
        if let Some(hint) = hint_from_details(&outcome.details) {
            eprintln!("{}", style.info(&format!("Hint: {hint}")));
        }
    }

    Ok(code)
}

fn detail_lines(style: &Style, details: &Value) -> Vec<String> {
    let mut lines = Vec::new();
    let dry_run = details
        .get("dry_run")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if dry_run {
        if let Some(removed) = details.pointer("/clean/removed").and_then(Value::as_array) {
            for entry in removed.iter().filter_map(Value::as_str) {
                lines.push(format!("  would remove {entry}"));
            }
        }
        for step in ["build", "upload"] {
            if let Some(command) = details
                .pointer(&format!("/{step}/command"))
                .and_then(Value::as_str)
            {
                lines.push(style.info(&format!("  would run: {command}")));
            }
        }
    }
    if let Some(artifacts) = details.get("artifacts").and_then(Value::as_array) {
        for artifact in artifacts {
            let Some(path) = artifact.get("path").and_then(Value::as_str) else {
                continue;
            };
            let sha: String = artifact
                .get("sha256")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .chars()
                .take(12)
                .collect();
            lines.push(format!("  {path}  {}", style.dimmed(&format!("sha256={sha}"))));
        }
    }
    lines
}

fn failed_command(details: &Value) -> Option<&str> {
    details
        .as_object()
        .and_then(|map| map.get("command"))
        .and_then(Value::as_str)
}

fn hint_from_details(details: &Value) -> Option<&str> {
    details
        .as_object()
        .and_then(|map| map.get("hint"))
        .and_then(Value::as_str)
}
