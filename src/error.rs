//! Error types for ppbt
//!
//! All modules use `PpbtResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ppbt operations
pub type PpbtResult<T> = Result<T, PpbtError>;

/// All errors that can occur in ppbt
#[derive(Error, Debug)]
pub enum PpbtError {
    // Fetch errors
    #[error("Transfer of {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("Unable to download {url} after {attempts} attempt(s): {reason}")]
    Fetch {
        url: String,
        attempts: u32,
        reason: String,
    },

    #[error("Cannot derive a file name from url: {0}")]
    InvalidUrl(String),

    // Build errors
    #[error("Build cmd '{command}' failed ({})", exit_description(.code))]
    BuildCommand {
        command: String,
        code: Option<i32>,
        output: String,
    },

    #[error("Failed to spawn '{command}': {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Toolchain config missing: {}", .path.display())]
    MissingConfig { path: PathBuf },

    #[error("Build did not produce {}", .path.display())]
    MissingOutput { path: PathBuf },

    // Platform errors
    #[error("Unknown platform {0}")]
    UnknownPlatform(String),

    #[error("Unable to determine the host machine")]
    UnknownMachine,

    // Toolchain consumption errors
    #[error("Toolchain not extracted: {}", .path.display())]
    NotExtracted { path: PathBuf },

    #[error("Toolchain archive not found: {}", .path.display())]
    ArchiveNotFound { path: PathBuf },

    // Archive errors
    #[error("Archive entry escapes the target directory: {entry}")]
    ArchiveUnsafePath { entry: String },

    #[error("Invalid archive {}: {reason}", .path.display())]
    ArchiveFormat { path: PathBuf, reason: String },

    #[error("Invalid manifest {}: {reason}", .path.display())]
    Manifest { path: PathBuf, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {}: {reason}", .path.display())]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {}: {source}", .path.display())]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

impl PpbtError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a spawn failure error
    pub fn command_spawn(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandSpawn {
            command: command.into(),
            source,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Whether the error is a deployment problem that should end the process
    /// with a diagnostic rather than be handled by the caller.
    pub fn is_fatal_config(&self) -> bool {
        matches!(self, Self::MissingConfig { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::MissingConfig { .. } => {
                Some("Ship a generator config for this machine/triplet or set paths.config_dir")
            }
            Self::NotExtracted { .. } => Some("Run: ppbt extract (or pass --auto-extract)"),
            Self::ArchiveNotFound { .. } => Some("Run: ppbt build"),
            Self::UnknownPlatform(_) => Some("Supported platforms: linux, darwin, win32"),
            _ => None,
        }
    }
}
