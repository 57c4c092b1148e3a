//! Loading and saving `config.toml`

use std::fs;
use std::path::{Path, PathBuf};

use super::settings::{DEFAULT_REGISTRY_FILE, PollerSettings};
use crate::error::{ConfigError, ConfigResult};

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "W1POLL_CONFIG_DIR";

/// Configuration file name inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Reads and writes the poller configuration
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Creates a manager for the default configuration directory
    ///
    /// `$W1POLL_CONFIG_DIR` wins over the platform config directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoConfigDir`] if no directory can be determined.
    pub fn new() -> ConfigResult<Self> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
            return Ok(Self::with_config_dir(PathBuf::from(dir)));
        }
        let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(Self::with_config_dir(base.join("w1poll")))
    }

    /// Creates a manager rooted at an explicit directory
    #[must_use]
    pub const fn with_config_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Directory holding the configuration
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Full path of `config.toml`
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    /// Loads settings, falling back to defaults when the file does not exist
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> ConfigResult<PollerSettings> {
        let path = self.config_path();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(PollerSettings::default());
        }
        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let settings: PollerSettings =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(settings)
    }

    /// Writes settings to `config.toml`, creating the directory if needed
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn save(&self, settings: &PollerSettings) -> ConfigResult<()> {
        fs::create_dir_all(&self.config_dir).map_err(|source| ConfigError::Io {
            path: self.config_dir.clone(),
            source,
        })?;
        let contents =
            toml::to_string_pretty(settings).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        let path = self.config_path();
        fs::write(&path, contents).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Resolves the registry file path for the given settings
    ///
    /// `~` and environment variables are expanded; relative paths are taken
    /// relative to the config directory.
    #[must_use]
    pub fn registry_path(&self, settings: &PollerSettings) -> PathBuf {
        let Some(configured) = settings.registry.path.as_ref() else {
            return self.config_dir.join(DEFAULT_REGISTRY_FILE);
        };
        let expanded = expand_path(&configured.to_string_lossy());
        if expanded.is_absolute() {
            expanded
        } else {
            self.config_dir.join(expanded)
        }
    }
}

/// Expands `~` and `$VARS` in a path, leaving it untouched on failure
#[must_use]
pub fn expand_path(path: &str) -> PathBuf {
    shellexpand::full(path).map_or_else(
        |_| PathBuf::from(path),
        |expanded| PathBuf::from(expanded.as_ref()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DebugLevel;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_config_dir(dir.path().to_path_buf());
        let settings = manager.load().unwrap();
        assert_eq!(settings, PollerSettings::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_config_dir(dir.path().join("nested"));

        let mut settings = PollerSettings::default();
        settings.remote.target = "pi@10.0.0.51".to_string();
        settings.remote.identity_file = Some("/home/pi/.ssh/id_ed25519".to_string());
        settings.polling.interval_secs = 120;
        settings.logging.debug = DebugLevel::Basic;

        manager.save(&settings).unwrap();
        assert!(manager.config_path().exists());
        assert_eq!(manager.load().unwrap(), settings);
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_config_dir(dir.path().to_path_buf());
        fs::write(manager.config_path(), "[remote\ntarget=").unwrap();
        assert!(matches!(manager.load(), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_registry_path_resolution() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_config_dir(dir.path().to_path_buf());
        let mut settings = PollerSettings::default();

        assert_eq!(
            manager.registry_path(&settings),
            dir.path().join(DEFAULT_REGISTRY_FILE)
        );

        settings.registry.path = Some(PathBuf::from("state/devices.json"));
        assert_eq!(
            manager.registry_path(&settings),
            dir.path().join("state/devices.json")
        );

        settings.registry.path = Some(PathBuf::from("/var/lib/w1poll/devices.json"));
        assert_eq!(
            manager.registry_path(&settings),
            PathBuf::from("/var/lib/w1poll/devices.json")
        );
    }
}
