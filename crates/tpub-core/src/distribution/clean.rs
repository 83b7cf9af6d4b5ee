use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use serde_json::json;

use crate::effects::{EntryKind, FileSystem};
use crate::UserError;

use super::artifacts::relative_path_str;

#[derive(Clone, Debug, Default, Serialize)]
pub struct CleanReport {
    pub existed: bool,
    pub removed: Vec<String>,
}

/// Empties `dist_dir` in place.
///
/// A missing directory is left missing; the packaging tool creates it. With
/// `dry_run` set the entries are only listed.
pub(crate) fn clean_output_dir(
    filesystem: &dyn FileSystem,
    dist_dir: &Path,
    project_root: &Path,
    dry_run: bool,
) -> Result<CleanReport> {
    if !filesystem.exists(dist_dir) {
        tracing::debug!(dir = %dist_dir.display(), "output directory absent; nothing to clean");
        return Ok(CleanReport::default());
    }
    if filesystem.symlink_metadata(dist_dir)?.kind != EntryKind::Dir {
        let shown = relative_path_str(dist_dir, project_root);
        return Err(UserError::new(
            format!("{shown} exists but is not a directory"),
            json!({
                "reason": "dist_not_directory",
                "dist_dir": shown,
                "hint": "move the file aside or pass --dist-dir to pick another output directory",
            }),
        )
        .into());
    }

    let mut report = CleanReport {
        existed: true,
        removed: Vec::new(),
    };
    for entry in filesystem.read_dir(dist_dir)? {
        if !dry_run {
            // Symlinks are unlinked, never followed.
            if filesystem.symlink_metadata(&entry)?.kind == EntryKind::Dir {
                filesystem.remove_dir_all(&entry)?;
            } else {
                filesystem.remove_file(&entry)?;
            }
        }
        tracing::debug!(entry = %entry.display(), dry_run, "removed stale output");
        report
            .removed
            .push(relative_path_str(&entry, project_root));
    }
    Ok(report)
}
