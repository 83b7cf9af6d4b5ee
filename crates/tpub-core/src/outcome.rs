use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandGroup {
    Release,
    Clean,
    Build,
    Upload,
}

impl fmt::Display for CommandGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandGroup::Release => "release",
            CommandGroup::Clean => "clean",
            CommandGroup::Build => "build",
            CommandGroup::Upload => "upload",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub status: CommandStatus,
    pub message: String,
    #[serde(default)]
    pub details: Value,
}

impl ExecutionOutcome {
    pub fn success(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::Ok,
            message: message.into(),
            details,
        }
    }

    pub fn failure(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::Failure,
            message: message.into(),
            details,
        }
    }

    pub fn user_error(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::UserError,
            message: message.into(),
            details,
        }
    }

    /// Exit code of the external tool that failed, when one did.
    #[must_use]
    pub fn tool_exit_code(&self) -> Option<i32> {
        self.details
            .get("code")
            .and_then(Value::as_i64)
            .and_then(|code| i32::try_from(code).ok())
    }

    #[must_use]
    pub fn hint(&self) -> Option<&str> {
        self.details.get("hint").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum CommandStatus {
    Ok,
    UserError,
    Failure,
}

#[derive(thiserror::Error, Debug)]
#[error("{message}")]
pub struct UserError {
    pub(crate) message: String,
    pub(crate) details: Value,
}

impl UserError {
    pub fn new(message: impl Into<String>, details: Value) -> Self {
        Self {
            message: message.into(),
            details,
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn details(&self) -> &Value {
        &self.details
    }
}

/// Folds an error escaping a command into an outcome the CLI can render.
#[must_use]
pub fn outcome_from_error(err: &anyhow::Error) -> ExecutionOutcome {
    if let Some(user) = err.downcast_ref::<UserError>() {
        return ExecutionOutcome::user_error(user.message().to_string(), user.details().clone());
    }
    let issues: Vec<String> = err.chain().map(ToString::to_string).collect();
    ExecutionOutcome::failure(
        err.to_string(),
        json!({
            "reason": "internal_error",
            "error": err.to_string(),
            "issues": issues,
            "hint": "Re-run with `-vv` for more detail.",
        }),
    )
}

/// Maps an outcome onto the process exit code.
#[must_use]
pub fn exit_code_for(outcome: &ExecutionOutcome) -> i32 {
    match outcome.status {
        CommandStatus::Ok => 0,
        CommandStatus::UserError => 1,
        CommandStatus::Failure => outcome
            .tool_exit_code()
            .filter(|code| *code != 0)
            .unwrap_or(2),
    }
}

#[must_use]
pub fn to_json_response(group: CommandGroup, outcome: &ExecutionOutcome) -> Value {
    let status = match outcome.status {
        CommandStatus::Ok => "ok",
        CommandStatus::UserError => "user-error",
        CommandStatus::Failure => "error",
    };
    let details = match &outcome.details {
        Value::Object(_) => outcome.details.clone(),
        Value::Null => json!({}),
        other => json!({ "value": other }),
    };
    json!({
        "status": status,
        "message": format_status_message(group, &outcome.message),
        "details": details,
    })
}

#[must_use]
pub fn format_status_message(group: CommandGroup, message: &str) -> String {
    let prefix = format!("tpub {group}");
    if message.is_empty() {
        prefix
    } else if message.starts_with(&prefix) {
        message.to_string()
    } else {
        format!("{prefix}: {message}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn status_message_is_prefixed_once() {
        assert_eq!(
            format_status_message(CommandGroup::Release, "uploaded 2 artifacts"),
            "tpub release: uploaded 2 artifacts"
        );
        assert_eq!(
            format_status_message(CommandGroup::Build, "tpub build: wrote 2 artifacts"),
            "tpub build: wrote 2 artifacts"
        );
        assert_eq!(format_status_message(CommandGroup::Clean, ""), "tpub clean");
    }

    #[test]
    fn exit_codes_follow_tool_failures() {
        let ok = ExecutionOutcome::success("done", json!({}));
        assert_eq!(exit_code_for(&ok), 0);

        let user = ExecutionOutcome::user_error("no artifacts", json!({}));
        assert_eq!(exit_code_for(&user), 1);

        let tool = ExecutionOutcome::failure("twine failed", json!({ "code": 42 }));
        assert_eq!(exit_code_for(&tool), 42);

        let internal = ExecutionOutcome::failure("io", json!({ "reason": "internal_error" }));
        assert_eq!(exit_code_for(&internal), 2);
    }

    #[test]
    fn user_errors_become_user_outcomes() {
        let err: anyhow::Error =
            UserError::new("dist is a file", json!({ "reason": "dist_not_directory" })).into();
        let outcome = outcome_from_error(&err);
        assert_eq!(outcome.status, CommandStatus::UserError);
        assert_eq!(outcome.details["reason"], "dist_not_directory");

        let err = anyhow!("disk on fire").context("removing dist/pkg.whl");
        let outcome = outcome_from_error(&err);
        assert_eq!(outcome.status, CommandStatus::Failure);
        assert_eq!(outcome.details["issues"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn json_envelope_wraps_non_object_details() {
        let outcome = ExecutionOutcome::success("ok", json!(["a"]));
        let payload = to_json_response(CommandGroup::Upload, &outcome);
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["message"], "tpub upload: ok");
        assert_eq!(payload["details"]["value"][0], "a");
    }
}
