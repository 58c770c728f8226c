//! Archived builds in a toolchain output directory

use crate::error::{PpbtError, PpbtResult};
use crate::triplet::Triplet;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

const ARCHIVE_SUFFIX: &str = ".tar.xz";

/// A packaged toolchain found on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchivedBuild {
    pub triplet: Triplet,
    pub archive: PathBuf,
    /// Archive size in bytes
    pub size: u64,
    /// Whether the manifest sidecar is present
    pub has_manifest: bool,
}

/// Archive path for `triplet` in `dir`
pub fn archived_build(dir: &Path, triplet: &Triplet) -> PathBuf {
    dir.join(triplet.archive_name())
}

/// Every `{triplet}.tar.xz` in `dir`, sorted by triplet name.
///
/// A missing directory lists as empty. Files whose stem is not a known
/// triplet are ignored.
pub fn list_archived_builds(dir: &Path) -> PpbtResult<Vec<ArchivedBuild>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(PpbtError::io(format!("reading {}", dir.display()), e)),
    };

    let mut builds = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| PpbtError::io(format!("reading {}", dir.display()), e))?;
        let name = entry.file_name();
        let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(ARCHIVE_SUFFIX)) else {
            continue;
        };
        let triplet = match Triplet::parse(stem) {
            Ok(triplet) => triplet,
            Err(e) => {
                debug!("Ignoring {}: {}", entry.path().display(), e);
                continue;
            }
        };

        let metadata = entry
            .metadata()
            .map_err(|e| PpbtError::io(format!("reading {}", entry.path().display()), e))?;
        if !metadata.is_file() {
            continue;
        }
        builds.push(ArchivedBuild {
            has_manifest: dir.join(triplet.record_name()).is_file(),
            archive: entry.path(),
            size: metadata.len(),
            triplet,
        });
    }

    builds.sort_by_key(|b| b.triplet.to_string());
    Ok(builds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triplet::Platform;
    use tempfile::TempDir;

    #[test]
    fn lists_triplet_archives_only() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        fs::write(dir.join("x86_64-linux-gnu.tar.xz"), b"12345").unwrap();
        fs::write(dir.join("x86_64-linux-gnu.tar.xz.record"), b"").unwrap();
        fs::write(dir.join("arm64-macos.tar.xz"), b"1").unwrap();
        fs::write(dir.join("notes.tar.xz"), b"").unwrap();
        fs::write(dir.join("x86_64-linux-gnu.tar.gz"), b"").unwrap();
        fs::create_dir(dir.join("x86_64-linux-gnu")).unwrap();

        let builds = list_archived_builds(dir).unwrap();
        assert_eq!(builds.len(), 2);

        assert_eq!(builds[0].triplet.machine(), "arm64");
        assert_eq!(builds[0].triplet.platform(), Platform::Darwin);
        assert!(!builds[0].has_manifest);

        assert_eq!(builds[1].triplet.to_string(), "x86_64-linux-gnu");
        assert_eq!(builds[1].size, 5);
        assert!(builds[1].has_manifest);
    }

    #[test]
    fn missing_dir_is_empty() {
        let temp = TempDir::new().unwrap();
        assert!(list_archived_builds(&temp.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn archived_build_path() {
        let triplet = Triplet::resolve("aarch64", "linux").unwrap();
        assert_eq!(
            archived_build(Path::new("/tc"), &triplet),
            PathBuf::from("/tc/aarch64-linux-gnu.tar.xz")
        );
    }
}
