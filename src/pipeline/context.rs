//! Build context
//!
//! Everything a pipeline stage needs is resolved once into a
//! [`BuildContext`]; stages never consult the process working directory or
//! ambient globals.

use crate::config::{Config, ConfigManager};
use crate::error::PpbtResult;
use crate::package::Archiver;
use crate::triplet::{host_machine, Triplet};
use crate::workdirs::WorkDirs;
use std::path::PathBuf;

/// Name of the generator executable inside its source tree
pub const GENERATOR_EXE: &str = "ct-ng";

/// Where the generator's sources come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratorSource {
    /// Versioned release tarball
    Release { version: String, url: String },
    /// Source control checkout of a branch
    Git { repo: String, branch: String },
}

impl GeneratorSource {
    /// Directory the sources unpack or clone into
    pub fn dir_name(&self) -> String {
        match self {
            Self::Release { version, .. } => format!("crosstool-ng-{}", version),
            Self::Git { .. } => "crosstool-ng".to_string(),
        }
    }
}

/// Auxiliary binary patching tool built from a source tarball
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxTool {
    pub name: String,
    pub version: String,
    pub url: String,
}

/// Per-invocation overrides
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Clone this generator branch instead of using a release
    pub branch: Option<String>,
    /// Target machine (defaults to the host)
    pub machine: Option<String>,
    /// Target platform (defaults to the host)
    pub platform: Option<String>,
}

/// Resolved inputs of one pipeline run
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub dirs: WorkDirs,
    pub triplet: Triplet,
    /// Host machine; selects the shipped config directory
    pub host_machine: String,
    pub generator: GeneratorSource,
    pub aux_tool: AuxTool,
    /// Logical install prefix of manifest paths
    pub namespace: String,
    /// Running under CI: generator progress output is suppressed
    pub ci: bool,
    /// Running as root: the generator must be told this is intended
    pub privileged: bool,
}

impl BuildContext {
    /// Resolve a context from configuration and overrides
    pub fn from_config(config: &Config, options: &BuildOptions) -> PpbtResult<Self> {
        let triplet = Triplet::detect(options.machine.as_deref(), options.platform.as_deref())?;
        let branch = options
            .branch
            .clone()
            .or_else(|| config.generator.branch.clone());

        let generator = match branch {
            Some(branch) => GeneratorSource::Git {
                repo: config.generator.git_repo.clone(),
                branch,
            },
            None => GeneratorSource::Release {
                version: config.generator.version.clone(),
                url: config.generator.release_url(),
            },
        };

        Ok(Self {
            dirs: ConfigManager::work_dirs(config),
            triplet,
            host_machine: host_machine()?,
            generator,
            aux_tool: AuxTool {
                name: config.aux_tool.name.clone(),
                version: config.aux_tool.version.clone(),
                url: config.aux_tool.source_url(),
            },
            namespace: config.package.namespace.clone(),
            ci: std::env::var_os("CI").is_some(),
            privileged: is_privileged(),
        })
    }

    /// Generator source tree
    pub fn generator_dir(&self) -> PathBuf {
        self.dirs.source.join(self.generator.dir_name())
    }

    /// Compiled generator executable
    pub fn generator_exe(&self) -> PathBuf {
        self.generator_dir().join(GENERATOR_EXE)
    }

    /// Config file the generator reads
    pub fn generator_config(&self) -> PathBuf {
        self.generator_dir().join(".config")
    }

    /// Config shipped for this host machine and triplet
    pub fn shipped_config(&self) -> PathBuf {
        self.dirs
            .generator_config(&self.host_machine, &self.triplet.config_name())
    }

    /// Built toolchain tree
    pub fn toolchain_tree(&self) -> PathBuf {
        self.dirs.build.join(self.triplet.to_string())
    }

    /// Auxiliary tool source tree
    pub fn aux_source_dir(&self) -> PathBuf {
        self.dirs
            .source
            .join(format!("{}-{}", self.aux_tool.name, self.aux_tool.version))
    }

    /// Auxiliary tool executable produced by its build
    pub fn aux_binary(&self) -> PathBuf {
        self.aux_source_dir().join("src").join(&self.aux_tool.name)
    }

    /// Auxiliary tool installed in the toolchain
    pub fn aux_installed(&self) -> PathBuf {
        self.toolchain_tree().join("bin").join(&self.aux_tool.name)
    }

    pub fn archiver(&self) -> Archiver {
        Archiver::new(&self.dirs.toolchain, &self.namespace)
    }

    /// Environment added to the generator's `source` and `build` runs
    pub fn generator_env(&self) -> Vec<(String, String)> {
        let mut env = vec![(
            "CT_PREFIX".to_string(),
            self.dirs.build.display().to_string(),
        )];
        if self.privileged {
            env.push(("CT_ALLOW_BUILD_AS_ROOT".to_string(), "y".to_string()));
            env.push(("CT_ALLOW_BUILD_AS_ROOT_SURE".to_string(), "y".to_string()));
        }
        if self.ci {
            env.push(("CT_LOG_PROGRESS".to_string(), "n".to_string()));
        }
        env
    }
}

#[cfg(unix)]
fn is_privileged() -> bool {
    nix::unistd::geteuid().is_root()
}

#[cfg(not(unix))]
fn is_privileged() -> bool {
    false
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::Path;

    pub(crate) fn context(root: &Path) -> BuildContext {
        BuildContext {
            dirs: WorkDirs::new(root),
            triplet: Triplet::resolve("x86_64", "linux").unwrap(),
            host_machine: "x86_64".to_string(),
            generator: GeneratorSource::Release {
                version: "1.26.0".to_string(),
                url: "https://example.com/crosstool-ng-1.26.0.tar.bz2".to_string(),
            },
            aux_tool: AuxTool {
                name: "patchelf".to_string(),
                version: "0.18.0".to_string(),
                url: "https://example.com/patchelf-0.18.0.tar.gz".to_string(),
            },
            namespace: "ppbt/_toolchain".to_string(),
            ci: false,
            privileged: false,
        }
    }

    #[test]
    fn paths_follow_layout() {
        let ctx = context(Path::new("/w"));
        assert_eq!(ctx.generator_dir(), PathBuf::from("/w/src/crosstool-ng-1.26.0"));
        assert_eq!(ctx.generator_exe(), PathBuf::from("/w/src/crosstool-ng-1.26.0/ct-ng"));
        assert_eq!(
            ctx.shipped_config(),
            PathBuf::from("/w/config/x86_64/x86_64-linux-gnu-ct-ng.config")
        );
        assert_eq!(ctx.toolchain_tree(), PathBuf::from("/w/build/x86_64-linux-gnu"));
        assert_eq!(
            ctx.aux_binary(),
            PathBuf::from("/w/src/patchelf-0.18.0/src/patchelf")
        );
        assert_eq!(
            ctx.aux_installed(),
            PathBuf::from("/w/build/x86_64-linux-gnu/bin/patchelf")
        );
    }

    #[test]
    fn git_generator_dir() {
        let source = GeneratorSource::Git {
            repo: "https://github.com/crosstool-ng/crosstool-ng.git".to_string(),
            branch: "master".to_string(),
        };
        assert_eq!(source.dir_name(), "crosstool-ng");
    }

    #[test]
    fn generator_env_flags() {
        let mut ctx = context(Path::new("/w"));
        let env = ctx.generator_env();
        assert_eq!(env, vec![("CT_PREFIX".to_string(), "/w/build".to_string())]);

        ctx.privileged = true;
        ctx.ci = true;
        let keys: Vec<_> = ctx.generator_env().into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![
                "CT_PREFIX",
                "CT_ALLOW_BUILD_AS_ROOT",
                "CT_ALLOW_BUILD_AS_ROOT_SURE",
                "CT_LOG_PROGRESS"
            ]
        );
    }

    #[test]
    fn from_config_prefers_option_branch() {
        let mut config = Config::default();
        config.paths.root = Some(PathBuf::from("/w"));
        let options = BuildOptions {
            branch: Some("dev".to_string()),
            machine: Some("aarch64".to_string()),
            platform: Some("linux".to_string()),
        };
        let ctx = BuildContext::from_config(&config, &options).unwrap();
        assert_eq!(ctx.triplet.to_string(), "aarch64-linux-gnu");
        assert!(matches!(ctx.generator, GeneratorSource::Git { ref branch, .. } if branch == "dev"));
    }

    #[test]
    fn from_config_rejects_unknown_platform() {
        let options = BuildOptions {
            platform: Some("haiku".to_string()),
            ..Default::default()
        };
        assert!(BuildContext::from_config(&Config::default(), &options).is_err());
    }
}
