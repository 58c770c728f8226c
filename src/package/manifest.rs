//! Content-hash manifests
//!
//! A manifest is a CSV file of `(path, hash-spec, size)` rows, the same
//! shape as an installed package's file record. Hash specs are
//! `sha256=` followed by the URL-safe, unpadded base64 digest. Rows are
//! always written sorted by path.

use crate::error::{PpbtError, PpbtResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// One file of a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Path under the installed package namespace
    pub path: String,
    /// `sha256=<digest>`, empty for rows that carry no hash
    pub hash: String,
    /// Byte length, absent for rows that carry no size
    pub size: Option<u64>,
}

impl ManifestEntry {
    pub fn new(path: impl Into<String>, digest: &[u8], size: u64) -> Self {
        Self {
            path: path.into(),
            hash: hash_spec(digest),
            size: Some(size),
        }
    }
}

/// Format a SHA-256 digest as a record hash spec
pub fn hash_spec(digest: &[u8]) -> String {
    format!("sha256={}", URL_SAFE_NO_PAD.encode(digest))
}

/// Hash spec of a file's current contents
pub fn hash_file(path: &Path) -> PpbtResult<(String, u64)> {
    let file = fs::File::open(path)
        .map_err(|e| PpbtError::io(format!("opening {}", path.display()), e))?;
    let mut reader = HashingReader::new(file);
    io::copy(&mut reader, &mut io::sink())
        .map_err(|e| PpbtError::io(format!("reading {}", path.display()), e))?;
    let (digest, len) = reader.finish();
    Ok((hash_spec(&digest), len))
}

/// Reader adapter that hashes and counts everything read through it
pub struct HashingReader<R> {
    inner: R,
    hasher: Sha256,
    len: u64,
}

impl<R: Read> HashingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            len: 0,
        }
    }

    /// Digest and byte count of what has been read so far
    pub fn finish(self) -> (Vec<u8>, u64) {
        (self.hasher.finalize().to_vec(), self.len)
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        self.len += n as u64;
        Ok(n)
    }
}

/// A set of manifest rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ManifestEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a row by path
    pub fn get(&self, path: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    /// Read a manifest; short rows (e.g. the record's own `path,,` line) are
    /// accepted.
    pub fn read(path: &Path) -> PpbtResult<Self> {
        if !path.is_file() {
            return Err(PpbtError::Manifest {
                path: path.to_path_buf(),
                reason: "file not found".to_string(),
            });
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;

        let mut entries = Vec::new();
        for record in reader.records() {
            let record = record?;
            let file = match record.get(0) {
                Some(p) if !p.is_empty() => p.to_string(),
                _ => continue,
            };
            let size = match record.get(2).filter(|s| !s.is_empty()) {
                Some(s) => Some(s.parse::<u64>().map_err(|e| PpbtError::Manifest {
                    path: path.to_path_buf(),
                    reason: format!("bad size '{}' for {}: {}", s, file, e),
                })?),
                None => None,
            };
            entries.push(ManifestEntry {
                path: file,
                hash: record.get(1).unwrap_or("").to_string(),
                size,
            });
        }

        debug!("Read {} manifest rows from {}", entries.len(), path.display());
        Ok(Self { entries })
    }

    /// Write the manifest sorted by path, replacing `path` atomically
    pub fn write(&self, path: &Path) -> PpbtResult<()> {
        let mut sorted: Vec<&ManifestEntry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| a.path.cmp(&b.path));

        let tmp = partial_path(path);
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_path(&tmp)?;
            for entry in sorted {
                let size = entry.size.map(|s| s.to_string()).unwrap_or_default();
                writer.write_record([entry.path.as_str(), entry.hash.as_str(), size.as_str()])?;
            }
            writer
                .flush()
                .map_err(|e| PpbtError::io(format!("writing {}", tmp.display()), e))?;
        }
        fs::rename(&tmp, path)
            .map_err(|e| PpbtError::io(format!("replacing {}", path.display()), e))?;
        Ok(())
    }

    /// Merge `other` into this manifest. Rows are keyed by path; rows from
    /// `other` replace existing ones. The result is sorted by path.
    pub fn merge(&mut self, other: Manifest) {
        let mut by_path: BTreeMap<String, ManifestEntry> = self
            .entries
            .drain(..)
            .map(|e| (e.path.clone(), e))
            .collect();
        for entry in other.entries {
            by_path.insert(entry.path.clone(), entry);
        }
        self.entries = by_path.into_values().collect();
    }
}

/// `{path}.partial`, keeping every extension of the final name
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}
