use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Result;
use serde::Serialize;
use serde_json::json;

use crate::process::ToolInvocation;
use crate::{CommandContext, UserError};

use super::artifacts::relative_path_str;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildBackend {
    #[default]
    Auto,
    Build,
    Setuptools,
}

impl fmt::Display for BuildBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BuildBackend::Auto => "auto",
            BuildBackend::Build => "build",
            BuildBackend::Setuptools => "setuptools",
        })
    }
}

impl FromStr for BuildBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(BuildBackend::Auto),
            "build" | "pypa-build" => Ok(BuildBackend::Build),
            "setuptools" | "setup.py" => Ok(BuildBackend::Setuptools),
            other => Err(format!("unknown build backend `{other}`")),
        }
    }
}

/// Per-invocation overrides; unset fields fall back to `TPUB_*` settings.
#[derive(Clone, Debug, Default)]
pub struct ReleaseRequest {
    pub dist_dir: Option<PathBuf>,
    pub repository: Option<String>,
    pub backend: Option<BuildBackend>,
    pub keep_going: bool,
    pub dry_run: bool,
}

#[derive(Clone, Debug)]
pub(crate) struct BuildPlan {
    pub(crate) backend: BuildBackend,
    pub(crate) invocation: ToolInvocation,
}

pub(crate) fn resolve_dist_dir(ctx: &CommandContext, request: &ReleaseRequest) -> PathBuf {
    let configured = request
        .dist_dir
        .as_ref()
        .unwrap_or(&ctx.config().release().dist_dir);
    if configured.is_absolute() {
        configured.clone()
    } else {
        ctx.project_root().join(configured)
    }
}

pub(crate) fn plan_build(
    ctx: &CommandContext,
    request: &ReleaseRequest,
    dist_dir: &Path,
) -> Result<BuildPlan> {
    let root = ctx.project_root();
    let requested = match request.backend {
        Some(backend) => backend,
        None => ctx.config().release().build_backend()?,
    };
    let backend = select_backend(ctx, root, requested)?;
    let python = ctx
        .tools()
        .interpreter(ctx.config().tools().python.as_deref())?;
    let dist = dist_dir.to_string_lossy().to_string();

    let invocation = match backend {
        BuildBackend::Build | BuildBackend::Auto => ToolInvocation::new(python, root).args([
            "-m".to_string(),
            "build".to_string(),
            "--sdist".to_string(),
            "--wheel".to_string(),
            "--outdir".to_string(),
            dist,
            root.to_string_lossy().to_string(),
        ]),
        BuildBackend::Setuptools => ToolInvocation::new(python, root).args([
            "setup.py".to_string(),
            "sdist".to_string(),
            "--dist-dir".to_string(),
            dist.clone(),
            "bdist_wheel".to_string(),
            "--dist-dir".to_string(),
            dist,
        ]),
    };
    Ok(BuildPlan {
        backend,
        invocation,
    })
}

fn select_backend(
    ctx: &CommandContext,
    root: &Path,
    requested: BuildBackend,
) -> Result<BuildBackend> {
    let has_pyproject = ctx.fs().exists(&root.join("pyproject.toml"));
    let has_setup_py = ctx.fs().exists(&root.join("setup.py"));
    let selected = match requested {
        BuildBackend::Auto if has_pyproject => Some(BuildBackend::Build),
        BuildBackend::Auto if has_setup_py => Some(BuildBackend::Setuptools),
        BuildBackend::Build if has_pyproject || has_setup_py => Some(BuildBackend::Build),
        BuildBackend::Setuptools if has_setup_py => Some(BuildBackend::Setuptools),
        _ => None,
    };
    selected.ok_or_else(|| {
        let expected = match requested {
            BuildBackend::Setuptools => "setup.py",
            _ => "pyproject.toml or setup.py",
        };
        UserError::new(
            format!("no packaging metadata found ({expected} missing)"),
            json!({
                "reason": "missing_packaging_metadata",
                "project_root": root.display().to_string(),
                "backend": requested,
                "hint": "run tpub from the directory that holds the project's packaging metadata",
            }),
        )
        .into()
    })
}

pub(crate) const PYPI_UPLOAD_URL: &str = "https://upload.pypi.org/legacy/";
pub(crate) const TEST_PYPI_UPLOAD_URL: &str = "https://test.pypi.org/legacy/";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Repository {
    pub label: String,
    pub url: String,
}

pub(crate) fn resolve_repository(ctx: &CommandContext, request: &ReleaseRequest) -> Repository {
    let selection = request
        .repository
        .as_deref()
        .unwrap_or(ctx.config().release().repository.as_str());
    repository_from_selection(selection)
}

fn repository_from_selection(selection: &str) -> Repository {
    let value = selection.trim();
    if value.is_empty() {
        return Repository {
            label: "testpypi".to_string(),
            url: TEST_PYPI_UPLOAD_URL.to_string(),
        };
    }
    if value.starts_with("http://") || value.starts_with("https://") {
        return Repository {
            label: value.to_string(),
            url: value.to_string(),
        };
    }
    match value.to_ascii_lowercase().as_str() {
        "testpypi" | "test-pypi" => Repository {
            label: value.to_string(),
            url: TEST_PYPI_UPLOAD_URL.to_string(),
        },
        "pypi" => Repository {
            label: "pypi".to_string(),
            url: PYPI_UPLOAD_URL.to_string(),
        },
        _ => Repository {
            label: value.to_string(),
            url: format!("https://{value}/legacy/"),
        },
    }
}

pub(crate) fn display_dir(ctx: &CommandContext, dir: &Path) -> String {
    relative_path_str(dir, ctx.project_root())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_parses_aliases() {
        assert_eq!("auto".parse::<BuildBackend>(), Ok(BuildBackend::Auto));
        assert_eq!(" Build ".parse::<BuildBackend>(), Ok(BuildBackend::Build));
        assert_eq!("setup.py".parse::<BuildBackend>(), Ok(BuildBackend::Setuptools));
        assert!("poetry".parse::<BuildBackend>().is_err());
        assert_eq!(BuildBackend::Setuptools.to_string(), "setuptools");
    }

    #[test]
    fn repository_aliases_and_urls() {
        let default = repository_from_selection("");
        assert_eq!(default.label, "testpypi");
        assert_eq!(default.url, TEST_PYPI_UPLOAD_URL);

        let test = repository_from_selection("test-pypi");
        assert_eq!(test.url, TEST_PYPI_UPLOAD_URL);

        let pypi = repository_from_selection("PyPI");
        assert_eq!(pypi.label, "pypi");
        assert_eq!(pypi.url, PYPI_UPLOAD_URL);

        let host = repository_from_selection("packages.example.com");
        assert_eq!(host.url, "https://packages.example.com/legacy/");

        let url = repository_from_selection("http://localhost:8080/");
        assert_eq!(url.label, "http://localhost:8080/");
        assert_eq!(url.url, "http://localhost:8080/");
    }
}
