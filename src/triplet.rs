//! Target triplet resolution
//!
//! A triplet names the machine + platform a toolchain targets, e.g.
//! `x86_64-linux-gnu`. It determines the archive file name and the name of
//! the toolchain directory, so it must be stable across runs on one host.

use crate::error::{PpbtError, PpbtResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Platforms a toolchain can be built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Darwin,
    Win32,
}

impl Platform {
    /// Suffix appended to the machine name in a triplet
    pub fn triplet_suffix(&self) -> &'static str {
        match self {
            Self::Linux => "linux-gnu",
            Self::Darwin => "macos",
            Self::Win32 => "win",
        }
    }

    /// Inverse of [`Platform::triplet_suffix`]
    pub fn from_triplet_suffix(suffix: &str) -> PpbtResult<Self> {
        match suffix {
            "linux-gnu" => Ok(Self::Linux),
            "macos" => Ok(Self::Darwin),
            "win" => Ok(Self::Win32),
            other => Err(PpbtError::UnknownPlatform(other.to_string())),
        }
    }

    /// Platform of the running host
    pub fn host() -> PpbtResult<Self> {
        match std::env::consts::OS {
            "linux" => Ok(Self::Linux),
            "macos" => Ok(Self::Darwin),
            "windows" => Ok(Self::Win32),
            other => Err(PpbtError::UnknownPlatform(other.to_string())),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Darwin => "darwin",
            Self::Win32 => "win32",
        }
    }
}

impl FromStr for Platform {
    type Err = PpbtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linux" => Ok(Self::Linux),
            "darwin" => Ok(Self::Darwin),
            "win32" => Ok(Self::Win32),
            other => Err(PpbtError::UnknownPlatform(other.to_string())),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Canonical `{machine}-{platform-suffix}` identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triplet {
    machine: String,
    platform: Platform,
}

impl Triplet {
    /// Resolve the triplet for a machine and platform name.
    ///
    /// The platform uses the `linux` / `darwin` / `win32` spelling; anything
    /// else is an [`PpbtError::UnknownPlatform`].
    pub fn resolve(machine: &str, platform: &str) -> PpbtResult<Self> {
        let platform = platform.parse::<Platform>()?;
        Ok(Self::new(machine, platform))
    }

    /// Build a triplet from an already parsed platform. The machine name
    /// is kept as given.
    pub fn new(machine: &str, platform: Platform) -> Self {
        Self {
            machine: machine.to_string(),
            platform,
        }
    }

    /// Triplet of the running host, with optional overrides. Only the
    /// detected machine name is lowercased.
    pub fn detect(machine: Option<&str>, platform: Option<&str>) -> PpbtResult<Self> {
        let machine = match machine {
            Some(m) => m.to_string(),
            None => host_machine()?,
        };
        let platform = match platform {
            Some(p) => p.parse()?,
            None => Platform::host()?,
        };
        Ok(Self::new(&machine, platform))
    }

    /// Split a triplet string back into machine and platform
    pub fn parse(s: &str) -> PpbtResult<Self> {
        let (machine, suffix) = s
            .split_once('-')
            .ok_or_else(|| PpbtError::UnknownPlatform(s.to_string()))?;
        let platform = Platform::from_triplet_suffix(suffix)?;
        Ok(Self::new(machine, platform))
    }

    pub fn machine(&self) -> &str {
        &self.machine
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// File name of the packaged toolchain archive
    pub fn archive_name(&self) -> String {
        format!("{}.tar.xz", self)
    }

    /// File name of the manifest that accompanies the archive
    pub fn record_name(&self) -> String {
        format!("{}.record", self.archive_name())
    }

    /// File name of the generator config shipped for this triplet
    pub fn config_name(&self) -> String {
        format!("{}-ct-ng.config", self)
    }
}

impl fmt::Display for Triplet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.machine, self.platform.triplet_suffix())
    }
}

/// Platform of the running host
pub fn host_platform() -> PpbtResult<Platform> {
    Platform::host()
}

/// Lowercase machine name of the running host (`uname -m`)
#[cfg(unix)]
pub fn host_machine() -> PpbtResult<String> {
    let uts = nix::sys::utsname::uname().map_err(|_| PpbtError::UnknownMachine)?;
    let machine = uts.machine().to_string_lossy().to_lowercase();
    if machine.is_empty() {
        return Err(PpbtError::UnknownMachine);
    }
    Ok(machine)
}

/// Lowercase machine name of the running host
#[cfg(not(unix))]
pub fn host_machine() -> PpbtResult<String> {
    match std::env::consts::ARCH {
        "x86_64" => Ok("amd64".to_string()),
        "x86" => Ok("x86".to_string()),
        "aarch64" => Ok("arm64".to_string()),
        "" => Err(PpbtError::UnknownMachine),
        other => Ok(other.to_lowercase()),
    }
}
