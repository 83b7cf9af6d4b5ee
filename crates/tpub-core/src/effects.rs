use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::process::{run_command_streaming, OutputRouting, RunOutput, ToolInvocation};
use crate::python::{detect_interpreter, detect_upload_tool, UploadTool};

pub trait ProcessRunner: Send + Sync {
    fn run(&self, invocation: &ToolInvocation, routing: OutputRouting) -> Result<RunOutput>;
}

pub trait ToolLocator: Send + Sync {
    fn interpreter(&self, explicit: Option<&str>) -> Result<String>;
    fn upload_tool(&self, explicit: Option<&str>, python: Option<&str>) -> Result<UploadTool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryStat {
    pub kind: EntryKind,
    pub len: u64,
}

impl EntryStat {
    fn from_metadata(metadata: &fs::Metadata) -> Self {
        let file_type = metadata.file_type();
        let kind = if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Dir
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        };
        Self {
            kind,
            len: metadata.len(),
        }
    }
}

pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
    /// Follows symlinks; `None` when the path or its link target is missing.
    fn metadata(&self, path: &Path) -> Result<Option<EntryStat>>;
    /// Describes the entry itself; symlinks report [`EntryKind::Symlink`].
    fn symlink_metadata(&self, path: &Path) -> Result<EntryStat>;
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
    fn open(&self, path: &Path) -> Result<Box<dyn Read>>;
    fn remove_file(&self, path: &Path) -> Result<()>;
    fn remove_dir_all(&self, path: &Path) -> Result<()>;
}

pub trait Effects: Send + Sync {
    fn process(&self) -> &dyn ProcessRunner;
    fn tools(&self) -> &dyn ToolLocator;
    fn fs(&self) -> &dyn FileSystem;
}

pub struct SystemEffects {
    process: Arc<SystemProcessRunner>,
    tools: Arc<SystemToolLocator>,
    fs: Arc<SystemFileSystem>,
}

impl SystemEffects {
    #[must_use]
    pub fn new() -> Self {
        Self {
            process: Arc::new(SystemProcessRunner),
            tools: Arc::new(SystemToolLocator),
            fs: Arc::new(SystemFileSystem),
        }
    }
}

impl Default for SystemEffects {
    fn default() -> Self {
        Self::new()
    }
}

impl Effects for SystemEffects {
    fn process(&self) -> &dyn ProcessRunner {
        self.process.as_ref()
    }

    fn tools(&self) -> &dyn ToolLocator {
        self.tools.as_ref()
    }

    fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }
}

struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, invocation: &ToolInvocation, routing: OutputRouting) -> Result<RunOutput> {
        run_command_streaming(invocation, routing)
    }
}

struct SystemToolLocator;

impl ToolLocator for SystemToolLocator {
    fn interpreter(&self, explicit: Option<&str>) -> Result<String> {
        detect_interpreter(explicit)
    }

    fn upload_tool(&self, explicit: Option<&str>, python: Option<&str>) -> Result<UploadTool> {
        detect_upload_tool(explicit, python)
    }
}

pub(crate) struct SystemFileSystem;

impl FileSystem for SystemFileSystem {
    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn metadata(&self, path: &Path) -> Result<Option<EntryStat>> {
        match fs::metadata(path) {
            Ok(metadata) => Ok(Some(EntryStat::from_metadata(&metadata))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("inspecting {}", path.display())),
        }
    }

    fn symlink_metadata(&self, path: &Path) -> Result<EntryStat> {
        fs::symlink_metadata(path)
            .map(|metadata| EntryStat::from_metadata(&metadata))
            .with_context(|| format!("inspecting {}", path.display()))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).with_context(|| format!("listing {}", path.display()))? {
            entries.push(entry?.path());
        }
        entries.sort();
        Ok(entries)
    }

    fn open(&self, path: &Path) -> Result<Box<dyn Read>> {
        let file = fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
        Ok(Box::new(file))
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).with_context(|| format!("removing {}", path.display()))
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        fs::remove_dir_all(path).with_context(|| format!("removing {}", path.display()))
    }
}

pub type SharedEffects = Arc<dyn Effects>;
