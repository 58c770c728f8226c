//! Work directory layout
//!
//! Every component resolves its paths through [`WorkDirs`], constructed once
//! per invocation from the work root.

use crate::error::{PpbtError, PpbtResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory tree used by a build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkDirs {
    /// Work root
    pub root: PathBuf,
    /// Packaged archives, manifests and the extracted toolchain
    pub toolchain: PathBuf,
    /// Generator prefix; the built toolchain tree lands here
    pub build: PathBuf,
    /// Generator and auxiliary tool sources
    pub source: PathBuf,
    /// Per-command output logs
    pub logs: PathBuf,
    /// Downloaded archives
    pub download: PathBuf,
    /// Shipped generator configs, keyed by machine and triplet
    pub config: PathBuf,
}

impl WorkDirs {
    /// Derive the layout from a root; the config directory defaults to
    /// `{root}/config`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            toolchain: root.join("toolchain"),
            build: root.join("build"),
            source: root.join("src"),
            logs: root.join("logs"),
            download: root.join("download"),
            config: root.join("config"),
            root,
        }
    }

    /// Use a config directory outside the work root
    pub fn with_config_dir(mut self, config: impl Into<PathBuf>) -> Self {
        self.config = config.into();
        self
    }

    /// Create every directory of the layout (the config directory is
    /// shipped, not created)
    pub fn create_all(&self) -> PpbtResult<()> {
        for dir in [
            &self.root,
            &self.toolchain,
            &self.build,
            &self.source,
            &self.logs,
            &self.download,
        ] {
            create_dir(dir)?;
        }
        Ok(())
    }

    /// Location of the generator config for a machine/triplet pair
    pub fn generator_config(&self, machine: &str, config_name: &str) -> PathBuf {
        self.config.join(machine).join(config_name)
    }
}

fn create_dir(dir: &Path) -> PpbtResult<()> {
    std::fs::create_dir_all(dir)
        .map_err(|e| PpbtError::io(format!("creating directory {}", dir.display()), e))?;
    debug!("Ensured directory {}", dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn layout_is_derived_from_root() {
        let dirs = WorkDirs::new("/work");
        assert_eq!(dirs.toolchain, PathBuf::from("/work/toolchain"));
        assert_eq!(dirs.build, PathBuf::from("/work/build"));
        assert_eq!(dirs.source, PathBuf::from("/work/src"));
        assert_eq!(dirs.logs, PathBuf::from("/work/logs"));
        assert_eq!(dirs.download, PathBuf::from("/work/download"));
        assert_eq!(dirs.config, PathBuf::from("/work/config"));
    }

    #[test]
    fn config_dir_override() {
        let dirs = WorkDirs::new("/work").with_config_dir("/etc/ppbt");
        assert_eq!(
            dirs.generator_config("x86_64", "x86_64-linux-gnu-ct-ng.config"),
            PathBuf::from("/etc/ppbt/x86_64/x86_64-linux-gnu-ct-ng.config")
        );
    }

    #[test]
    fn create_all_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let dirs = WorkDirs::new(temp.path().join("root"));
        dirs.create_all().unwrap();
        dirs.create_all().unwrap();
        assert!(dirs.build.is_dir());
        assert!(dirs.logs.is_dir());
        assert!(!dirs.config.exists());
    }

    #[test]
    fn serializes_and_restores() {
        let dirs = WorkDirs::new("/work");
        let json = serde_json::to_string(&dirs).unwrap();
        let restored: WorkDirs = serde_json::from_str(&json).unwrap();
        assert_eq!(dirs, restored);
    }
}
