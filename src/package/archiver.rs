//! Toolchain archiver
//!
//! Packages `{build_root}/{triplet}` into `{triplet}.tar.xz` and writes the
//! `{triplet}.tar.xz.record` manifest next to it. Each regular file is read
//! once: the same bytes feed the archive and the hash, so the manifest and
//! the archive always describe the same file set.

use super::manifest::{HashingReader, Manifest, ManifestEntry};
use crate::archive::{ArchiveWriter, Compression};
use crate::error::{PpbtError, PpbtResult};
use crate::triplet::Triplet;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Result of packaging a toolchain tree
#[derive(Debug, Clone)]
pub struct PackageOutput {
    /// Path of the compressed archive
    pub archive: PathBuf,
    /// Path of the manifest sidecar
    pub manifest: PathBuf,
    /// Hex SHA-256 of the archive bytes
    pub archive_sha256: String,
    /// Regular files recorded in the manifest
    pub files: usize,
}

/// Packages built toolchain trees into an output directory
#[derive(Debug, Clone)]
pub struct Archiver {
    output_dir: PathBuf,
    namespace: String,
}

impl Archiver {
    /// `namespace` is the logical install prefix prepended to manifest paths
    pub fn new(output_dir: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            namespace: namespace.into().trim_end_matches('/').to_string(),
        }
    }

    /// Archive path for a triplet
    pub fn archive_path(&self, triplet: &Triplet) -> PathBuf {
        self.output_dir.join(triplet.archive_name())
    }

    /// Manifest path for a triplet
    pub fn manifest_path(&self, triplet: &Triplet) -> PathBuf {
        self.output_dir.join(triplet.record_name())
    }

    /// Archive `{build_root}/{triplet}` and write its manifest.
    ///
    /// Files that disappear while the tree is walked are logged and left
    /// out of both artifacts.
    pub fn package(&self, build_root: &Path, triplet: &Triplet) -> PpbtResult<PackageOutput> {
        let tree = build_root.join(triplet.to_string());
        if !tree.is_dir() {
            return Err(PpbtError::MissingOutput { path: tree });
        }
        fs::create_dir_all(&self.output_dir).map_err(|e| {
            PpbtError::io(format!("creating directory {}", self.output_dir.display()), e)
        })?;

        let archive = self.archive_path(triplet);
        let partial = archive.with_extension("xz.partial");
        info!("Archive is {}", archive.display());

        let result = self.write_archive(build_root, &tree, &partial);
        let manifest = match result {
            Ok(manifest) => manifest,
            Err(e) => {
                let _ = fs::remove_file(&partial);
                return Err(e);
            }
        };

        fs::rename(&partial, &archive)
            .map_err(|e| PpbtError::io(format!("moving archive to {}", archive.display()), e))?;

        let manifest_path = self.manifest_path(triplet);
        manifest.write(&manifest_path)?;

        let archive_sha256 = file_sha256(&archive)?;
        info!(
            "Packaged {} files into {} (sha256 {})",
            manifest.len(),
            archive.display(),
            archive_sha256
        );

        Ok(PackageOutput {
            archive,
            manifest: manifest_path,
            archive_sha256,
            files: manifest.len(),
        })
    }

    fn write_archive(&self, build_root: &Path, tree: &Path, dest: &Path) -> PpbtResult<Manifest> {
        let mut writer = ArchiveWriter::with_compression(dest, Compression::Xz)?;
        let mut manifest = Manifest::new();

        for entry in WalkDir::new(tree).follow_links(false).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if is_not_found(e.io_error()) => {
                    warn!("File not found while archiving: {}", display_walk_path(&e));
                    continue;
                }
                Err(e) => {
                    return Err(PpbtError::io(
                        format!("walking {}", tree.display()),
                        e.into_io_error()
                            .unwrap_or_else(|| io::Error::other("filesystem loop")),
                    ))
                }
            };

            let rel = entry
                .path()
                .strip_prefix(build_root)
                .map_err(|e| PpbtError::Internal(format!("path outside build root: {}", e)))?
                .to_path_buf();
            let file_type = entry.file_type();

            if file_type.is_file() {
                match self.append_file(&mut writer, entry.path(), &rel)? {
                    Some(row) => {
                        debug!("Archive {}", rel.display());
                        manifest.push(row);
                    }
                    None => warn!("File not found while archiving: {}", rel.display()),
                }
            } else {
                match writer.append_path(build_root, &rel) {
                    Ok(()) => {}
                    Err(PpbtError::Io { ref source, .. }) if is_not_found(Some(source)) => {
                        warn!("File not found while archiving: {}", rel.display());
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        writer.finish()?;
        Ok(manifest)
    }

    /// Stream one regular file into the archive, hashing it on the way.
    /// Returns `None` if the file vanished before it could be opened.
    fn append_file(
        &self,
        writer: &mut ArchiveWriter,
        full: &Path,
        rel: &Path,
    ) -> PpbtResult<Option<ManifestEntry>> {
        let file = match File::open(full) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PpbtError::io(format!("opening {}", full.display()), e)),
        };
        let metadata = file
            .metadata()
            .map_err(|e| PpbtError::io(format!("reading metadata of {}", full.display()), e))?;

        let mut reader = HashingReader::new(file.take(metadata.len()));
        writer.append_file(rel, &metadata, &mut reader)?;
        let (digest, len) = reader.finish();
        if len != metadata.len() {
            return Err(PpbtError::Io {
                context: format!("archiving {}", full.display()),
                source: io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("file shrank from {} to {} bytes", metadata.len(), len),
                ),
            });
        }

        Ok(Some(ManifestEntry::new(
            self.installed_path(rel),
            &digest,
            len,
        )))
    }

    /// Where a build-relative path lives once the package is installed
    fn installed_path(&self, rel: &Path) -> String {
        let rel = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if self.namespace.is_empty() {
            rel
        } else {
            format!("{}/{}", self.namespace, rel)
        }
    }
}

fn is_not_found(err: Option<&io::Error>) -> bool {
    err.map(|e| e.kind() == io::ErrorKind::NotFound)
        .unwrap_or(false)
}

fn display_walk_path(err: &walkdir::Error) -> String {
    err.path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<unknown>".to_string())
}

/// Hex SHA-256 of a file's contents
pub fn file_sha256(path: &Path) -> PpbtResult<String> {
    let mut file = File::open(path)
        .map_err(|e| PpbtError::io(format!("opening {}", path.display()), e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .map_err(|e| PpbtError::io(format!("reading {}", path.display()), e))?;
    Ok(hex::encode(hasher.finalize()))
}
