//! Configuration management for ppbt

pub mod schema;

pub use schema::Config;

use crate::error::{PpbtError, PpbtResult};
use crate::workdirs::WorkDirs;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Environment variable overriding the work root
pub const DATA_DIR_ENV: &str = "PPBT_DATA";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ppbt")
            .join("config.toml")
    }

    /// Default work root: `$PPBT_DATA`, else the platform data dir
    pub fn default_work_root() -> PathBuf {
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            return PathBuf::from(dir);
        }
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ppbt")
    }

    /// Resolve the work directory layout for a configuration
    pub fn work_dirs(config: &Config) -> WorkDirs {
        let root = config
            .paths
            .root
            .clone()
            .unwrap_or_else(Self::default_work_root);
        let dirs = WorkDirs::new(root);
        match &config.paths.config_dir {
            Some(dir) => dirs.with_config_dir(dir.clone()),
            None => dirs,
        }
    }

    /// Load configuration, falling back to defaults when the file is absent
    pub async fn load(&self) -> PpbtResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> PpbtResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| PpbtError::io(format!("reading config from {}", path.display()), e))?;

        let config: Config = toml::from_str(&content).map_err(|e| PpbtError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        validate(&config).map_err(|reason| PpbtError::ConfigInvalid {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> PpbtResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            PpbtError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> PpbtResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PpbtError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(config: &Config) -> Result<(), String> {
    semver::Version::parse(&config.generator.version)
        .map_err(|e| format!("generator.version '{}': {}", config.generator.version, e))?;
    if config.fetch.attempts == 0 {
        return Err("fetch.attempts must be at least 1".to_string());
    }
    if config.aux_tool.name.is_empty() || config.aux_tool.name.contains('/') {
        return Err(format!("aux_tool.name '{}' is not a file name", config.aux_tool.name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_default_when_missing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nonexistent.toml");
        let manager = ConfigManager::with_path(path);

        let config = manager.load().await.unwrap();
        assert_eq!(config.generator.version, "1.26.0");
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let manager = ConfigManager::with_path(path);

        let mut config = Config::default();
        config.generator.branch = Some("master".to_string());

        manager.save(&config).await.unwrap();
        let loaded = manager.load().await.unwrap();

        assert_eq!(loaded.generator.branch.as_deref(), Some("master"));
    }

    #[tokio::test]
    async fn rejects_non_semver_generator_version() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[generator]\nversion = \"latest\"\n").unwrap();

        let err = ConfigManager::with_path(path).load().await.unwrap_err();
        assert!(matches!(err, PpbtError::ConfigInvalid { .. }));
    }

    #[tokio::test]
    async fn rejects_zero_attempts() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[fetch]\nattempts = 0\n").unwrap();

        assert!(ConfigManager::with_path(path).load().await.is_err());
    }

    #[test]
    fn work_dirs_use_configured_paths() {
        let mut config = Config::default();
        config.paths.root = Some(PathBuf::from("/work"));
        config.paths.config_dir = Some(PathBuf::from("/shipped"));

        let dirs = ConfigManager::work_dirs(&config);
        assert_eq!(dirs.root, PathBuf::from("/work"));
        assert_eq!(dirs.config, PathBuf::from("/shipped"));
    }

    #[test]
    #[serial]
    fn work_root_honours_env() {
        std::env::set_var(DATA_DIR_ENV, "/from/env");
        let dirs = ConfigManager::work_dirs(&Config::default());
        std::env::remove_var(DATA_DIR_ENV);
        assert_eq!(dirs.root, PathBuf::from("/from/env"));
    }
}
