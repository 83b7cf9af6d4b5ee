use std::path::PathBuf;

use anyhow::{anyhow, Result};
use serde_json::json;
use which::which;

use crate::UserError;

/// How the upload tool is launched: `twine ...` or `python -m twine ...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTool {
    pub program: String,
    pub prefix: Vec<String>,
}

impl UploadTool {
    pub fn standalone(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            prefix: Vec::new(),
        }
    }

    pub fn python_module(python: impl Into<String>) -> Self {
        Self {
            program: python.into(),
            prefix: vec!["-m".to_string(), "twine".to_string()],
        }
    }
}

/// Detects the Python interpreter used for the packaging step.
///
/// # Errors
///
/// Returns a user error when no interpreter can be found, or an error when the
/// detected path is not valid UTF-8.
pub fn detect_interpreter(explicit: Option<&str>) -> Result<String> {
    if let Some(explicit) = explicit {
        return Ok(explicit.to_string());
    }

    for candidate in ["python3", "python"] {
        if let Ok(path) = which(candidate) {
            return path_to_string(path);
        }
    }

    Err(UserError::new(
        "no python interpreter found",
        json!({
            "reason": "missing_python",
            "searched": ["python3", "python"],
            "hint": "install Python or set TPUB_PYTHON to an interpreter path",
        }),
    )
    .into())
}

/// Detects the upload tool, falling back to `python -m twine`.
///
/// # Errors
///
/// Returns a user error when neither `twine` nor an interpreter is available.
pub fn detect_upload_tool(explicit: Option<&str>, python: Option<&str>) -> Result<UploadTool> {
    if let Some(explicit) = explicit {
        return Ok(UploadTool::standalone(explicit));
    }
    if let Ok(path) = which("twine") {
        return Ok(UploadTool::standalone(path_to_string(path)?));
    }
    match detect_interpreter(python) {
        Ok(python) => Ok(UploadTool::python_module(python)),
        Err(_) => Err(UserError::new(
            "no upload tool found",
            json!({
                "reason": "missing_twine",
                "hint": "install twine (`pip install twine`) or set TPUB_TWINE",
            }),
        )
        .into()),
    }
}

fn path_to_string(path: PathBuf) -> Result<String> {
    path.into_os_string()
        .into_string()
        .map_err(|_| anyhow!("non-utf8 path"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_interpreter_wins() {
        let python = detect_interpreter(Some("/opt/py/bin/python3")).unwrap();
        assert_eq!(python, "/opt/py/bin/python3");
    }

    #[test]
    fn explicit_upload_tool_wins() {
        let tool = detect_upload_tool(Some("/opt/py/bin/twine"), None).unwrap();
        assert_eq!(tool, UploadTool::standalone("/opt/py/bin/twine"));
        assert!(tool.prefix.is_empty());
    }

    #[test]
    fn module_fallback_runs_twine_through_python() {
        let tool = UploadTool::python_module("python3");
        assert_eq!(tool.program, "python3");
        assert_eq!(tool.prefix, vec!["-m", "twine"]);
    }
}
