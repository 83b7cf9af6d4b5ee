use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::effects::{EntryKind, FileSystem};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    Sdist,
    Wheel,
    Other,
}

impl ArtifactKind {
    #[must_use]
    pub fn from_filename(filename: &str) -> Self {
        let path = Path::new(filename);
        if has_case_insensitive_extension(path, "whl") {
            return ArtifactKind::Wheel;
        }
        if has_case_insensitive_extension(path, "gz") {
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                if has_case_insensitive_extension(Path::new(stem), "tar") {
                    return ArtifactKind::Sdist;
                }
            }
        }
        if has_case_insensitive_extension(path, "zip") {
            return ArtifactKind::Sdist;
        }
        ArtifactKind::Other
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ArtifactSummary {
    pub path: String,
    pub kind: ArtifactKind,
    pub bytes: u64,
    pub sha256: String,
    #[serde(skip)]
    pub absolute_path: PathBuf,
}

/// Lists what `dist/*` would expand to: visible regular files, sorted by name.
///
/// Symlinks to files count; dangling symlinks are skipped with a warning.
pub(crate) fn discover_artifacts(
    filesystem: &dyn FileSystem,
    dist_dir: &Path,
    project_root: &Path,
) -> Result<Vec<ArtifactSummary>> {
    if !filesystem.exists(dist_dir) {
        return Ok(Vec::new());
    }
    let mut artifacts = Vec::new();
    for path in filesystem.read_dir(dist_dir)? {
        let Some(name) = path.file_name() else {
            continue;
        };
        let filename = name.to_string_lossy();
        if filename.starts_with('.') {
            continue;
        }
        let Some(stat) = filesystem.metadata(&path)? else {
            tracing::warn!(path = %path.display(), "skipping dangling symlink");
            continue;
        };
        if stat.kind != EntryKind::File {
            continue;
        }
        if name.to_str().is_none() {
            tracing::warn!(path = %path.display(), "artifact name is not valid UTF-8");
        }
        let kind = ArtifactKind::from_filename(&filename);
        if kind == ArtifactKind::Other {
            tracing::warn!(file = %filename, "uploading file that is neither a wheel nor an sdist");
        }
        let sha256 = compute_file_sha256(filesystem, &path)
            .with_context(|| format!("hashing {}", path.display()))?;
        artifacts.push(ArtifactSummary {
            path: relative_path_str(&path, project_root),
            kind,
            bytes: stat.len,
            sha256,
            absolute_path: path,
        });
    }
    artifacts.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(artifacts)
}

pub(crate) fn compute_file_sha256(filesystem: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut reader = filesystem.open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

pub(crate) fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    fn format_scaled(value: u64, unit: u64, suffix: &str) -> String {
        let whole = value / unit;
        let remainder = value % unit;
        let tenths = (remainder * 10) / unit;
        format!("{whole}.{tenths} {suffix}")
    }

    if bytes >= MB {
        format_scaled(bytes, MB, "MB")
    } else if bytes >= KB {
        format_scaled(bytes, KB, "KB")
    } else {
        format!("{bytes} B")
    }
}

pub(crate) fn relative_path_str(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn has_case_insensitive_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{EntryStat, SystemFileSystem};
    use std::collections::BTreeMap;
    use std::fs;
    use std::io::Read;

    /// Files that exist only in memory; nothing here touches the disk.
    struct MemoryFileSystem {
        files: BTreeMap<PathBuf, Vec<u8>>,
    }

    impl FileSystem for MemoryFileSystem {
        fn exists(&self, path: &Path) -> bool {
            self.files.keys().any(|file| file.starts_with(path))
        }

        fn metadata(&self, path: &Path) -> Result<Option<EntryStat>> {
            Ok(self.files.get(path).map(|bytes| EntryStat {
                kind: EntryKind::File,
                len: bytes.len() as u64,
            }))
        }

        fn symlink_metadata(&self, path: &Path) -> Result<EntryStat> {
            self.metadata(path)?
                .ok_or_else(|| anyhow::anyhow!("missing {}", path.display()))
        }

        fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
            Ok(self
                .files
                .keys()
                .filter(|file| file.parent() == Some(path))
                .cloned()
                .collect())
        }

        fn open(&self, path: &Path) -> Result<Box<dyn Read>> {
            let bytes = self
                .files
                .get(path)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("missing {}", path.display()))?;
            Ok(Box::new(io::Cursor::new(bytes)))
        }

        fn remove_file(&self, _path: &Path) -> Result<()> {
            unreachable!("discovery never removes files")
        }

        fn remove_dir_all(&self, _path: &Path) -> Result<()> {
            unreachable!("discovery never removes directories")
        }
    }

    #[test]
    fn discovery_goes_through_the_filesystem_seam() -> Result<()> {
        let root = PathBuf::from("/virtual/project");
        let dist = root.join("dist");
        let filesystem = MemoryFileSystem {
            files: BTreeMap::from([
                (dist.join("pkg-1.0.0.tar.gz"), b"sdist".to_vec()),
                (dist.join("pkg-1.0.0-py3-none-any.whl"), Vec::new()),
            ]),
        };

        let artifacts = discover_artifacts(&filesystem, &dist, &root)?;
        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[0].path, "dist/pkg-1.0.0-py3-none-any.whl");
        assert_eq!(
            artifacts[0].sha256,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(artifacts[1].bytes, 5);
        assert_eq!(artifacts[1].absolute_path, dist.join("pkg-1.0.0.tar.gz"));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlinks_are_skipped() -> Result<()> {
        let root = tempfile::tempdir()?;
        let dist = root.path().join("dist");
        fs::create_dir_all(&dist)?;
        fs::write(dist.join("pkg-0.2.0.tar.gz"), b"sdist")?;
        std::os::unix::fs::symlink(root.path().join("gone.whl"), dist.join("gone.whl"))?;

        let artifacts = discover_artifacts(&SystemFileSystem, &dist, root.path())?;
        let paths: Vec<_> = artifacts.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(paths, vec!["dist/pkg-0.2.0.tar.gz"]);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_names_are_still_uploaded() -> Result<()> {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let root = tempfile::tempdir()?;
        let dist = root.path().join("dist");
        fs::create_dir_all(&dist)?;
        let name = OsStr::from_bytes(b"pkg-\xff-0.2.0.tar.gz");
        let on_disk = dist.join(name);
        if fs::write(&on_disk, b"sdist").is_err() {
            // Some filesystems refuse non-UTF-8 names outright.
            return Ok(());
        }

        let artifacts = discover_artifacts(&SystemFileSystem, &dist, root.path())?;
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].absolute_path, on_disk);
        assert_eq!(artifacts[0].kind, ArtifactKind::Sdist);
        assert_eq!(artifacts[0].path, "dist/pkg-\u{fffd}-0.2.0.tar.gz");
        Ok(())
    }

    #[test]
    fn classifies_known_formats() {
        assert_eq!(
            ArtifactKind::from_filename("pkg-0.1.0-py3-none-any.whl"),
            ArtifactKind::Wheel
        );
        assert_eq!(
            ArtifactKind::from_filename("pkg-0.1.0.tar.gz"),
            ArtifactKind::Sdist
        );
        assert_eq!(ArtifactKind::from_filename("pkg-0.1.0.zip"), ArtifactKind::Sdist);
        assert_eq!(ArtifactKind::from_filename("notes.gz"), ArtifactKind::Other);
        assert_eq!(
            ArtifactKind::from_filename("pkg-0.1.0.whl.txt"),
            ArtifactKind::Other
        );
    }

    #[test]
    fn discovery_matches_shell_glob() -> Result<()> {
        let root = tempfile::tempdir()?;
        let dist = root.path().join("dist");
        fs::create_dir_all(dist.join("nested"))?;
        fs::write(dist.join("pkg-0.2.0.tar.gz"), b"sdist")?;
        fs::write(dist.join("pkg-0.2.0-py3-none-any.whl"), b"wheel")?;
        fs::write(dist.join(".DS_Store"), b"junk")?;
        fs::write(dist.join("nested").join("inner.whl"), b"inner")?;

        let artifacts = discover_artifacts(&SystemFileSystem, &dist, root.path())?;
        let paths: Vec<_> = artifacts.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["dist/pkg-0.2.0-py3-none-any.whl", "dist/pkg-0.2.0.tar.gz"]
        );
        assert_eq!(artifacts[0].kind, ArtifactKind::Wheel);
        assert_eq!(artifacts[1].kind, ArtifactKind::Sdist);
        assert_eq!(artifacts[1].bytes, 5);
        assert_eq!(artifacts[1].absolute_path, dist.join("pkg-0.2.0.tar.gz"));
        Ok(())
    }

    #[test]
    fn discovery_of_missing_dir_is_empty() -> Result<()> {
        let root = tempfile::tempdir()?;
        let artifacts = discover_artifacts(&SystemFileSystem, &root.path().join("dist"), root.path())?;
        assert!(artifacts.is_empty());
        Ok(())
    }

    #[test]
    fn sha256_matches_known_digest() -> Result<()> {
        let root = tempfile::tempdir()?;
        let file = root.path().join("empty.whl");
        fs::write(&file, b"")?;
        assert_eq!(
            compute_file_sha256(&SystemFileSystem, &file)?,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        Ok(())
    }

    #[test]
    fn format_bytes_scales_values() {
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(1_572_864), "1.5 MB");
    }
}
