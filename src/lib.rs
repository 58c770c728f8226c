//! ppbt - portable toolchain builder
//!
//! Builds a platform-specific compiler toolchain with a cross-compiler
//! generator, packages it as a compressed archive with a content-hash
//! manifest, and lazily extracts it to derive a build environment.

pub mod archive;
pub mod cli;
pub mod config;
pub mod environ;
pub mod error;
pub mod fetch;
pub mod package;
pub mod pipeline;
pub mod triplet;
pub mod ui;
pub mod workdirs;

pub use error::{PpbtError, PpbtResult};
