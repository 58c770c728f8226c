//! Configuration schema for ppbt
//!
//! Configuration is stored at `~/.config/ppbt/config.toml`

use crate::fetch::FetchOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Work root and shipped config locations
    pub paths: PathsConfig,

    /// Toolchain generator (crosstool-ng) source
    pub generator: GeneratorConfig,

    /// Auxiliary binary patching tool
    pub aux_tool: AuxToolConfig,

    /// Download behaviour
    pub fetch: FetchConfig,

    /// Packaging settings
    pub package: PackageConfig,
}

/// Filesystem locations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Work root (defaults to `$PPBT_DATA` or the platform data dir)
    pub root: Option<PathBuf>,

    /// Directory of `{machine}/{triplet}-ct-ng.config` files
    pub config_dir: Option<PathBuf>,

    /// Installed-file record reconciled when the toolchain is extracted
    pub record: Option<PathBuf>,
}

/// Generator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Release version, used when no branch is set
    pub version: String,

    /// Release tarball url; `{version}` is substituted
    pub url: String,

    /// Source repository cloned when a branch is requested
    pub git_repo: String,

    /// Branch to clone instead of downloading a release
    pub branch: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            version: "1.26.0".to_string(),
            url: "http://crosstool-ng.org/download/crosstool-ng/crosstool-ng-{version}.tar.bz2"
                .to_string(),
            git_repo: "https://github.com/crosstool-ng/crosstool-ng.git".to_string(),
            branch: None,
        }
    }
}

impl GeneratorConfig {
    /// Release url with the version filled in
    pub fn release_url(&self) -> String {
        self.url.replace("{version}", &self.version)
    }
}

/// Auxiliary tool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuxToolConfig {
    /// Tool name; also the name of the produced executable
    pub name: String,

    /// Release version
    pub version: String,

    /// Source tarball url; `{version}` is substituted
    pub url: String,
}

impl Default for AuxToolConfig {
    fn default() -> Self {
        Self {
            name: "patchelf".to_string(),
            version: "0.18.0".to_string(),
            url: "https://github.com/NixOS/patchelf/releases/download/{version}/patchelf-{version}.tar.gz"
                .to_string(),
        }
    }
}

impl AuxToolConfig {
    /// Source url with the version filled in
    pub fn source_url(&self) -> String {
        self.url.replace("{version}", &self.version)
    }
}

/// Download settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Attempts per download
    pub attempts: u32,

    /// Per-attempt timeout in seconds
    pub timeout_secs: u64,

    /// Backoff unit in seconds (attempt n waits n * backoff_secs)
    pub backoff_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            timeout_secs: 60,
            backoff_secs: 10,
        }
    }
}

impl FetchConfig {
    /// Retry settings for the fetcher
    pub fn options(&self) -> FetchOptions {
        FetchOptions {
            attempts: self.attempts,
            timeout: Duration::from_secs(self.timeout_secs),
            backoff: Duration::from_secs(self.backoff_secs),
        }
    }
}

/// Packaging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    /// Logical prefix of manifest paths (where files live once installed)
    pub namespace: String,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            namespace: "ppbt/_toolchain".to_string(),
        }
    }
}
