//! Tar archive codec
//!
//! The compression format is chosen from the file name: `.tgz`/`.gz` →
//! gzip, `.xz` → xz, `.bz2` → bzip2, anything else is read and written as a
//! plain tar stream. An unknown suffix is not an error by itself; a stream
//! that is not a valid tar fails when its entries are read.
//!
//! Archives are written deterministically (fixed mtime, uid/gid 0,
//! normalized permissions) so identical trees yield identical bytes.

use crate::error::{PpbtError, PpbtResult};
use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::{self, File, Metadata};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Component, Path, PathBuf};
use tar::{EntryType, Header, HeaderMode};
use tracing::debug;
use xz2::read::XzDecoder;
use xz2::write::XzEncoder;

/// Compression applied to a tar stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Xz,
    Bzip2,
    None,
}

impl Compression {
    /// Pick the compression from an archive's file name
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if name.ends_with(".tgz") || name.ends_with(".gz") {
            Self::Gzip
        } else if name.ends_with(".xz") {
            Self::Xz
        } else if name.ends_with(".bz2") {
            Self::Bzip2
        } else {
            Self::None
        }
    }

    fn decoder(&self, file: File) -> Box<dyn Read> {
        let reader = BufReader::new(file);
        match self {
            Self::Gzip => Box::new(GzDecoder::new(reader)),
            Self::Xz => Box::new(XzDecoder::new_multi_decoder(reader)),
            Self::Bzip2 => Box::new(BzDecoder::new(reader)),
            Self::None => Box::new(reader),
        }
    }
}

/// Extract every entry of `archive` under `target_dir`.
///
/// Entries that would resolve outside `target_dir` (absolute paths or `..`
/// components) fail the whole extraction.
pub fn extract(archive: &Path, target_dir: &Path) -> PpbtResult<()> {
    let compression = Compression::from_path(archive);
    debug!(
        "Extracting {} ({:?}) into {}",
        archive.display(),
        compression,
        target_dir.display()
    );

    let file = File::open(archive)
        .map_err(|e| PpbtError::io(format!("opening archive {}", archive.display()), e))?;
    fs::create_dir_all(target_dir).map_err(|e| {
        PpbtError::io(format!("creating directory {}", target_dir.display()), e)
    })?;

    let format_error = |e: io::Error| PpbtError::ArchiveFormat {
        path: archive.to_path_buf(),
        reason: e.to_string(),
    };

    let mut tar = tar::Archive::new(compression.decoder(file));
    let mut count = 0usize;
    for entry in tar.entries().map_err(format_error)? {
        let mut entry = entry.map_err(format_error)?;
        let entry_path = entry.path().map_err(format_error)?.into_owned();
        ensure_contained(&entry_path)?;

        let unpacked = entry.unpack_in(target_dir).map_err(|e| {
            PpbtError::io(
                format!("unpacking {} from {}", entry_path.display(), archive.display()),
                e,
            )
        })?;
        if !unpacked {
            return Err(PpbtError::ArchiveUnsafePath {
                entry: entry_path.display().to_string(),
            });
        }
        count += 1;
    }

    debug!("Extracted {} entries from {}", count, archive.display());
    Ok(())
}

/// Create `archive` from `entries`, each a path relative to `source_dir`.
///
/// Entries are added non-recursively: a directory entry adds only the
/// directory itself, so the caller controls exactly what is included.
pub fn create(archive: &Path, source_dir: &Path, entries: &[PathBuf]) -> PpbtResult<()> {
    let mut writer = ArchiveWriter::create(archive)?;
    for entry in entries {
        writer.append_path(source_dir, entry)?;
    }
    writer.finish()
}

enum Encoder {
    Gzip(GzEncoder<BufWriter<File>>),
    Xz(XzEncoder<BufWriter<File>>),
    Bzip2(BzEncoder<BufWriter<File>>),
    Plain(BufWriter<File>),
}

impl Encoder {
    fn new(compression: Compression, file: File) -> Self {
        let out = BufWriter::new(file);
        match compression {
            Compression::Gzip => Self::Gzip(GzEncoder::new(out, flate2::Compression::default())),
            Compression::Xz => Self::Xz(XzEncoder::new(out, 6)),
            Compression::Bzip2 => Self::Bzip2(BzEncoder::new(out, bzip2::Compression::default())),
            Compression::None => Self::Plain(out),
        }
    }

    fn finish(self) -> io::Result<()> {
        let mut out = match self {
            Self::Gzip(enc) => enc.finish()?,
            Self::Xz(enc) => enc.finish()?,
            Self::Bzip2(enc) => enc.finish()?,
            Self::Plain(out) => out,
        };
        out.flush()?;
        out.get_ref().sync_all()
    }
}

impl Write for Encoder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Gzip(enc) => enc.write(buf),
            Self::Xz(enc) => enc.write(buf),
            Self::Bzip2(enc) => enc.write(buf),
            Self::Plain(out) => out.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Gzip(enc) => enc.flush(),
            Self::Xz(enc) => enc.flush(),
            Self::Bzip2(enc) => enc.flush(),
            Self::Plain(out) => out.flush(),
        }
    }
}

/// Incremental archive construction
pub struct ArchiveWriter {
    path: PathBuf,
    builder: tar::Builder<Encoder>,
}

impl ArchiveWriter {
    /// Start a new archive at `path`, compressed according to its suffix
    pub fn create(path: &Path) -> PpbtResult<Self> {
        Self::with_compression(path, Compression::from_path(path))
    }

    /// Start a new archive at `path` with an explicit compression
    pub fn with_compression(path: &Path, compression: Compression) -> PpbtResult<Self> {
        let file = File::create(path)
            .map_err(|e| PpbtError::io(format!("creating archive {}", path.display()), e))?;
        let mut builder = tar::Builder::new(Encoder::new(compression, file));
        builder.mode(HeaderMode::Deterministic);
        builder.follow_symlinks(false);
        Ok(Self {
            path: path.to_path_buf(),
            builder,
        })
    }

    /// Add a single file, directory or symlink, stored under `rel`
    pub fn append_path(&mut self, source_dir: &Path, rel: &Path) -> PpbtResult<()> {
        ensure_contained(rel)?;
        let full = source_dir.join(rel);
        self.builder
            .append_path_with_name(&full, rel)
            .map_err(|e| PpbtError::io(format!("adding {} to archive", full.display()), e))
    }

    /// Add a regular file whose content is streamed from `reader`.
    ///
    /// `metadata.len()` bytes must be readable from `reader`.
    pub fn append_file<R: Read>(
        &mut self,
        rel: &Path,
        metadata: &Metadata,
        reader: R,
    ) -> PpbtResult<()> {
        ensure_contained(rel)?;
        let mut header = Header::new_gnu();
        header.set_metadata_in_mode(metadata, HeaderMode::Deterministic);
        header.set_entry_type(EntryType::Regular);
        header.set_size(metadata.len());
        self.builder
            .append_data(&mut header, rel, reader)
            .map_err(|e| PpbtError::io(format!("adding {} to archive", rel.display()), e))
    }

    /// Write the tar trailer and flush the compressor
    pub fn finish(self) -> PpbtResult<()> {
        let path = self.path;
        let context = || format!("finishing archive {}", path.display());
        let encoder = self
            .builder
            .into_inner()
            .map_err(|e| PpbtError::io(context(), e))?;
        encoder.finish().map_err(|e| PpbtError::io(context(), e))
    }
}

fn ensure_contained(path: &Path) -> PpbtResult<()> {
    let escapes = path.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        return Err(PpbtError::ArchiveUnsafePath {
            entry: path.display().to_string(),
        });
    }
    Ok(())
}
