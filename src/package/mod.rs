//! Toolchain packaging
//!
//! Turns a built toolchain tree into two artifacts that describe the same
//! file set: a compressed tar archive and a content-hash manifest whose
//! paths point at where the files live once the package is installed.

pub mod archiver;
pub mod catalog;
pub mod manifest;

pub use archiver::{file_sha256, Archiver, PackageOutput};
pub use catalog::{archived_build, list_archived_builds, ArchivedBuild};
pub use manifest::{hash_file, hash_spec, Manifest, ManifestEntry};
