//! Toolchain consumption: lazy extraction and build environment
//!
//! The packaged archive is unpacked into the toolchain root the first time
//! the toolchain is needed. Extraction also folds the archive's manifest
//! into the package's installed-file record so the package inventory stays
//! accurate even though the files arrived outside the installer.

use crate::archive;
use crate::config::{Config, ConfigManager};
use crate::error::{PpbtError, PpbtResult};
use crate::package::Manifest;
use crate::triplet::Triplet;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variables for building against the toolchain
pub type BuildEnvironment = BTreeMap<String, String>;

/// A packaged toolchain and where it is (or will be) extracted
#[derive(Debug, Clone)]
pub struct Toolchain {
    root: PathBuf,
    triplet: Triplet,
    record: Option<PathBuf>,
}

impl Toolchain {
    /// Toolchain for `triplet` whose archive lives in `root`
    pub fn new(root: impl Into<PathBuf>, triplet: Triplet) -> Self {
        Self {
            root: root.into(),
            triplet,
            record: None,
        }
    }

    /// Installed-file record to reconcile on extraction
    pub fn with_record(mut self, record: impl Into<PathBuf>) -> Self {
        self.record = Some(record.into());
        self
    }

    /// Toolchain located through the configured work directories
    pub fn from_config(config: &Config, triplet: Triplet) -> Self {
        let dirs = ConfigManager::work_dirs(config);
        let toolchain = Self::new(dirs.toolchain, triplet);
        match &config.paths.record {
            Some(record) => toolchain.with_record(record.clone()),
            None => toolchain,
        }
    }

    pub fn triplet(&self) -> &Triplet {
        &self.triplet
    }

    /// Extracted toolchain directory
    pub fn dir(&self) -> PathBuf {
        self.root.join(self.triplet.to_string())
    }

    /// Packaged archive
    pub fn archive(&self) -> PathBuf {
        self.root.join(self.triplet.archive_name())
    }

    /// Manifest shipped next to the archive
    pub fn manifest(&self) -> PathBuf {
        self.root.join(self.triplet.record_name())
    }

    pub fn is_extracted(&self) -> bool {
        self.dir().is_dir()
    }

    /// Extract the archive unless the toolchain directory already exists.
    ///
    /// With `force` an existing directory is replaced. Returns whether an
    /// extraction happened.
    pub fn ensure_extracted(&self, force: bool) -> PpbtResult<bool> {
        let dir = self.dir();
        if dir.exists() && !force {
            debug!("Toolchain directory exists: {}", dir.display());
            return Ok(false);
        }

        let archive = self.archive();
        if !archive.is_file() {
            return Err(PpbtError::ArchiveNotFound { path: archive });
        }

        // The toolchain directory only exists once the record is up to date.
        let pending = self.pending_record()?;

        info!("Extract archive {}", archive.display());
        self.extract_into_place(&archive)?;
        if let Some((record, rows)) = pending {
            if let Err(e) = write_record(&record, rows) {
                let _ = fs::remove_dir_all(self.dir());
                return Err(e);
            }
        }
        Ok(true)
    }

    /// Unpack into a staging directory, then move the toolchain directory
    /// into place so a failed extraction never looks like a finished one.
    fn extract_into_place(&self, archive: &Path) -> PpbtResult<()> {
        let name = self.triplet.to_string();
        let staging = self.root.join(format!(".{}.extracting", name));
        remove_dir_if_exists(&staging)?;

        if let Err(e) = archive::extract(archive, &staging) {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }

        let unpacked = staging.join(&name);
        if !unpacked.is_dir() {
            let _ = fs::remove_dir_all(&staging);
            return Err(PpbtError::ArchiveFormat {
                path: archive.to_path_buf(),
                reason: format!("archive has no top-level '{}' directory", name),
            });
        }

        let dir = self.dir();
        remove_dir_if_exists(&dir)?;
        fs::rename(&unpacked, &dir)
            .map_err(|e| PpbtError::io(format!("moving toolchain into {}", dir.display()), e))?;
        remove_dir_if_exists(&staging)?;
        Ok(())
    }

    /// Installed-file record merged with the archive manifest, ready to be
    /// written once extraction succeeds
    fn pending_record(&self) -> PpbtResult<Option<(PathBuf, Manifest)>> {
        let record = match &self.record {
            Some(record) if record.is_file() => record,
            Some(record) => {
                debug!("No installed-file record at {}", record.display());
                return Ok(None);
            }
            None => return Ok(None),
        };

        let mut rows = Manifest::read(record)?;
        let archived = Manifest::read(&self.manifest())?;
        debug!("Merge {} archive rows into {}", archived.len(), record.display());
        rows.merge(archived);
        Ok(Some((record.clone(), rows)))
    }

    /// Build environment for this toolchain.
    ///
    /// Without `auto_extract` a missing toolchain directory is
    /// [`PpbtError::NotExtracted`].
    pub fn environment(&self, auto_extract: bool) -> PpbtResult<BuildEnvironment> {
        if !self.is_extracted() {
            if auto_extract {
                self.ensure_extracted(false)?;
            } else {
                return Err(PpbtError::NotExtracted { path: self.dir() });
            }
        }
        Ok(derive_environment(&self.dir(), &self.triplet))
    }
}

/// Compiler paths and flags for a toolchain directory. Pure path arithmetic.
pub fn derive_environment(toolchain: &Path, triplet: &Triplet) -> BuildEnvironment {
    let base = toolchain.join("bin").join(triplet.to_string());
    let base = base.display();
    let sysroot = toolchain.join(triplet.to_string()).join("sysroot");
    let include = format!("-I{}", sysroot.join("usr").join("include").display());

    let mut env = BuildEnvironment::new();
    env.insert("TOOLCHAIN_PATH".into(), toolchain.display().to_string());
    env.insert("CC".into(), format!("{}-gcc", base));
    env.insert("CXX".into(), format!("{}-g++", base));
    env.insert("CFLAGS".into(), include.clone());
    env.insert("CPPFLAGS".into(), include.clone());
    env.insert("CMAKE_FLAGS".into(), include);
    env.insert(
        "LDFLAGS".into(),
        format!("-L{}", sysroot.join("lib").display()),
    );
    env
}

fn write_record(record: &Path, rows: Manifest) -> PpbtResult<()> {
    info!("Update pkg metadata {}", record.display());
    rows.write(record)?;
    debug!("Record now lists {} files", rows.len());
    Ok(())
}

fn remove_dir_if_exists(dir: &Path) -> PpbtResult<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PpbtError::io(format!("removing {}", dir.display()), e)),
    }
}
