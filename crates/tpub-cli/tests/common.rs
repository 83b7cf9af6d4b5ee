#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use assert_cmd::{assert::Assert, cargo::cargo_bin_cmd, Command};
use serde_json::Value;
use tempfile::TempDir;

const FAKE_PYTHON: &str = r#"#!/bin/sh
echo "python $*" >> "$TPUB_TEST_LOG"
if [ "$1" = "-m" ] && [ "$2" = "build" ]; then
  out=""
  while [ $# -gt 0 ]; do
    if [ "$1" = "--outdir" ]; then
      out="$2"
    fi
    shift
  done
  mkdir -p "$out"
  if [ -z "$FAKE_BUILD_SKIP_WRITE" ]; then
    printf 'sdist' > "$out/demo-0.1.0.tar.gz"
    printf 'wheel' > "$out/demo-0.1.0-py3-none-any.whl"
  fi
  echo "Successfully built demo"
  exit "${FAKE_BUILD_EXIT:-0}"
fi
exit 0
"#;

const FAKE_TWINE: &str = r#"#!/bin/sh
echo "twine $*" >> "$TPUB_TEST_LOG"
echo "Uploading distributions"
exit "${FAKE_TWINE_EXIT:-0}"
"#;

/// Directory holding the fake `python` and `twine` scripts.
///
/// Written once per test binary, before any test spawns a child, so no
/// script is exec'd while another thread still holds it open for writing.
pub fn fake_tools() -> &'static Path {
    static TOOLS: OnceLock<TempDir> = OnceLock::new();
    TOOLS
        .get_or_init(|| {
            let dir = tempfile::Builder::new()
                .prefix("tpub-fake-tools")
                .tempdir()
                .expect("tempdir");
            write_script(&dir.path().join("python"), FAKE_PYTHON);
            write_script(&dir.path().join("twine"), FAKE_TWINE);
            dir
        })
        .path()
}

fn write_script(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    fs::write(path, body).expect("write script");
    let mut perms = fs::metadata(path).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("chmod");
}

pub struct Project {
    _temp: TempDir,
    pub root: PathBuf,
    pub log: PathBuf,
}

impl Project {
    pub fn with_pyproject() -> Self {
        let project = Self::bare();
        fs::write(
            project.root.join("pyproject.toml"),
            "[project]\nname = \"demo\"\nversion = \"0.1.0\"\n",
        )
        .expect("write pyproject");
        project
    }

    pub fn bare() -> Self {
        let temp = tempfile::Builder::new()
            .prefix("tpub-project")
            .tempdir()
            .expect("tempdir");
        let root = temp.path().join("demo");
        fs::create_dir_all(&root).expect("create project");
        let log = temp.path().join("tools.log");
        Self {
            _temp: temp,
            root,
            log,
        }
    }

    pub fn dist(&self) -> PathBuf {
        self.root.join("dist")
    }

    pub fn write_dist(&self, name: &str, contents: &str) {
        fs::create_dir_all(self.dist()).expect("create dist");
        fs::write(self.dist().join(name), contents).expect("write dist entry");
    }

    /// Sorted names of everything in `dist/`, hidden entries included.
    pub fn dist_entries(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.dist())
            .expect("read dist")
            .map(|entry| {
                entry
                    .expect("dir entry")
                    .file_name()
                    .to_string_lossy()
                    .to_string()
            })
            .collect();
        names.sort();
        names
    }

    /// Lines recorded by the fake tools, in invocation order.
    pub fn tool_log(&self) -> Vec<String> {
        fs::read_to_string(&self.log)
            .map(|text| text.lines().map(ToString::to_string).collect())
            .unwrap_or_default()
    }

    pub fn tpub(&self) -> Command {
        let tools = fake_tools();
        let mut cmd = cargo_bin_cmd!("tpub");
        cmd.current_dir(&self.root)
            .env("TPUB_PYTHON", tools.join("python"))
            .env("TPUB_TWINE", tools.join("twine"))
            .env("TPUB_TEST_LOG", &self.log)
            .env("NO_COLOR", "1")
            .env_remove("TPUB_DIST_DIR")
            .env_remove("TPUB_REPOSITORY")
            .env_remove("TPUB_BUILD_BACKEND")
            .env_remove("TPUB_KEEP_GOING")
            .env_remove("FAKE_BUILD_EXIT")
            .env_remove("FAKE_BUILD_SKIP_WRITE")
            .env_remove("FAKE_TWINE_EXIT");
        cmd
    }
}

pub fn stdout_of(assert: &Assert) -> String {
    String::from_utf8_lossy(&assert.get_output().stdout).to_string()
}

pub fn stderr_of(assert: &Assert) -> String {
    String::from_utf8_lossy(&assert.get_output().stderr).to_string()
}

pub fn parse_json(assert: &Assert) -> Value {
    serde_json::from_slice(&assert.get_output().stdout).expect("valid json")
}
