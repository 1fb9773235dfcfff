//! Configuration manager - main API for config operations

use crate::persistence::ConfigPersistence;
use crate::{Config, ConfigError, ConfigResult};
use directories::ProjectDirs;
use std::path::PathBuf;
use std::str::FromStr;

/// Prefix of environment variables that override file values
pub const ENV_PREFIX: &str = "MOMENTUM_";

/// Loads, saves and locates the configuration
pub struct ConfigManager {
    persistence: ConfigPersistence,
    config_dir: PathBuf,
    default_data_dir: PathBuf,
}

impl ConfigManager {
    /// Creates a manager for the platform directories
    ///
    /// - Linux: `~/.config/momentum/` (data in `~/.local/share/momentum/`)
    /// - macOS: `~/Library/Application Support/momentum/`
    /// - Windows: `%APPDATA%\momentum\`
    pub fn new() -> ConfigResult<Self> {
        let dirs = ProjectDirs::from("", "", "momentum").ok_or_else(|| {
            ConfigError::PathResolutionError {
                reason: "Could not determine user config directory".to_string(),
            }
        })?;

        let mut manager = Self::with_directory(dirs.config_dir().to_path_buf())?;
        manager.default_data_dir = dirs.data_dir().to_path_buf();
        Ok(manager)
    }

    /// Creates a manager rooted at `config_dir`
    ///
    /// Local data defaults to `<config_dir>/data`.
    pub fn with_directory(config_dir: PathBuf) -> ConfigResult<Self> {
        let persistence = ConfigPersistence::new(config_dir.join("config.toml"));

        Ok(Self {
            persistence,
            default_data_dir: config_dir.join("data"),
            config_dir,
        })
    }

    pub fn config_dir(&self) -> &PathBuf {
        &self.config_dir
    }

    /// Returns the full config file path
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Directory for local collections
    pub fn data_dir(&self, config: &Config) -> PathBuf {
        config
            .app
            .data_dir
            .clone()
            .unwrap_or_else(|| self.default_data_dir.clone())
    }

    /// Directory standing in for the cloud record store
    pub fn remote_dir(&self, config: &Config) -> PathBuf {
        config
            .app
            .remote_dir
            .clone()
            .unwrap_or_else(|| self.data_dir(config).join("remote"))
    }

    /// Loads the configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file is corrupted, returns an error.
    pub fn load(&self) -> ConfigResult<Config> {
        self.persistence.load()
    }

    /// Loads the configuration, falling back to defaults on any error
    pub fn load_or_default(&self) -> Config {
        match self.load() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load config: {}, using defaults", e);
                Config::default()
            }
        }
    }

    /// Validates and saves the configuration
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        self.persistence.save(config)
    }

    /// Loads the config, applies `update_fn` and saves the result
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use momentum_config::ConfigManager;
    /// # let manager = ConfigManager::new().unwrap();
    /// manager.update(|config| {
    ///     config.sync.batch_size = 200;
    /// }).expect("Failed to update config");
    /// ```
    pub fn update<F>(&self, update_fn: F) -> ConfigResult<()>
    where
        F: FnOnce(&mut Config),
    {
        let mut config = self.load()?;
        update_fn(&mut config);
        self.save(&config)
    }

    /// Writes the default config file if none exists
    ///
    /// Returns Ok(true) if a new file was created, Ok(false) if one already exists.
    pub fn initialize(&self) -> ConfigResult<bool> {
        if self.config_path().exists() {
            log::info!(
                "Config file already exists at {}",
                self.config_path().display()
            );
            return Ok(false);
        }

        self.save(&Config::default())?;
        log::info!("Generated default config at {}", self.config_path().display());
        Ok(true)
    }

    /// Overwrites the config file with default values
    pub fn reset(&self) -> ConfigResult<()> {
        self.save(&Config::default())
    }

    /// Validates the current configuration file
    ///
    /// Returns all validation errors found, or Ok if valid.
    pub fn validate(&self) -> ConfigResult<Vec<String>> {
        let config = self.load()?;

        match config.validate() {
            Ok(()) => Ok(Vec::new()),
            Err(errors) => Ok(errors.iter().map(|e| e.to_string()).collect()),
        }
    }

    /// Loads the file and applies `MOMENTUM_SECTION_FIELD` variables
    ///
    /// Example: `MOMENTUM_SYNC_BATCH_SIZE=50`
    pub fn load_with_env_overrides(&self) -> ConfigResult<Config> {
        let mut config = self.load()?;
        apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;

        if let Err(errors) = config.validate() {
            log::warn!(
                "Config validation warnings after env overrides: {}",
                crate::error::describe(&errors)
            );
        }

        Ok(config)
    }
}

/// Applies overrides found through `lookup`
///
/// `lookup` receives full variable names such as `MOMENTUM_SYNC_SCOPE`.
/// A value that does not parse is an error rather than being ignored.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |suffix: &str| {
        let name = format!("{}{}", ENV_PREFIX, suffix);
        lookup(&name).map(|value| (name, value))
    };

    if let Some((_, value)) = var("APP_DATA_DIR") {
        config.app.data_dir = Some(PathBuf::from(value));
    }
    if let Some((_, value)) = var("APP_REMOTE_DIR") {
        config.app.remote_dir = Some(PathBuf::from(value));
    }
    if let Some((name, value)) = var("APP_STORAGE") {
        config.app.storage = parse(&name, &value)?;
    }
    if let Some((name, value)) = var("APP_LOG_LEVEL") {
        config.app.log_level = parse(&name, &value)?;
    }
    if let Some((name, value)) = var("SYNC_BATCH_SIZE") {
        config.sync.batch_size = parse(&name, &value)?;
    }
    if let Some((name, value)) = var("SYNC_AUTO_SYNC") {
        config.sync.auto_sync = parse(&name, &value)?;
    }
    if let Some((name, value)) = var("SYNC_INTERVAL_SECS") {
        config.sync.interval_secs = parse(&name, &value)?;
    }
    if let Some((name, value)) = var("SYNC_SCOPE") {
        config.sync.scope = parse(&name, &value)?;
    }
    if let Some((name, value)) = var("SYNC_RETRY_MAX_ATTEMPTS") {
        config.sync.retry.max_attempts = parse(&name, &value)?;
    }

    Ok(())
}

fn parse<T>(variable: &str, value: &str) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let parsed = value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidOverride {
            variable: variable.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })?;
    log::debug!("Applied override {}={}", variable, value);
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ScopeSetting, StorageBackend};
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn setup_test_manager() -> (TempDir, ConfigManager) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let manager = ConfigManager::with_directory(temp_dir.path().to_path_buf())
            .expect("Failed to create manager");
        (temp_dir, manager)
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_load_or_default_with_missing_file() {
        let (_temp_dir, manager) = setup_test_manager();
        assert_eq!(manager.load_or_default(), Config::default());
    }

    #[test]
    fn test_load_or_default_with_broken_file() {
        let (_temp_dir, manager) = setup_test_manager();
        std::fs::write(manager.config_path(), "[sync\n").expect("Should write");
        assert_eq!(manager.load_or_default(), Config::default());
    }

    #[test]
    fn test_update() {
        let (_temp_dir, manager) = setup_test_manager();
        manager.save(&Config::default()).expect("Should save");

        manager
            .update(|config| {
                config.sync.scope = ScopeSetting::Planner;
            })
            .expect("Should update");

        let loaded = manager.load().expect("Should load");
        assert_eq!(loaded.sync.scope, ScopeSetting::Planner);
    }

    #[test]
    fn test_initialize_only_once() {
        let (_temp_dir, manager) = setup_test_manager();

        assert!(manager.initialize().expect("Should initialize"));
        assert!(manager.config_path().exists());
        assert!(!manager.initialize().expect("Should initialize"));
    }

    #[test]
    fn test_reset() {
        let (_temp_dir, manager) = setup_test_manager();

        let mut config = Config::default();
        config.sync.batch_size = 7;
        manager.save(&config).expect("Should save");

        manager.reset().expect("Should reset");
        assert_eq!(manager.load().expect("Should load"), Config::default());
    }

    #[test]
    fn test_validate_reports_file_problems() {
        let (_temp_dir, manager) = setup_test_manager();
        std::fs::write(manager.config_path(), "[sync]\ninterval_secs = 1\n")
            .expect("Should write");

        let errors = manager.validate().expect("Should validate");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("sync.interval_secs"));
    }

    #[test]
    fn test_directories_default_under_config_dir() {
        let (temp_dir, manager) = setup_test_manager();
        let config = Config::default();

        assert_eq!(manager.data_dir(&config), temp_dir.path().join("data"));
        assert_eq!(
            manager.remote_dir(&config),
            temp_dir.path().join("data").join("remote")
        );
    }

    #[test]
    fn test_explicit_directories_win() {
        let (_temp_dir, manager) = setup_test_manager();
        let mut config = Config::default();
        config.app.data_dir = Some(PathBuf::from("/srv/momentum"));
        config.app.remote_dir = Some(PathBuf::from("/mnt/cloud"));

        assert_eq!(manager.data_dir(&config), PathBuf::from("/srv/momentum"));
        assert_eq!(manager.remote_dir(&config), PathBuf::from("/mnt/cloud"));
    }

    #[test]
    fn test_env_overrides_apply() {
        let mut config = Config::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("MOMENTUM_APP_STORAGE", "sqlite"),
                ("MOMENTUM_SYNC_BATCH_SIZE", "50"),
                ("MOMENTUM_SYNC_SCOPE", "finance"),
                ("MOMENTUM_SYNC_AUTO_SYNC", "true"),
                ("MOMENTUM_APP_REMOTE_DIR", "/tmp/cloud"),
            ]),
        )
        .expect("Overrides parse");

        assert_eq!(config.app.storage, StorageBackend::Sqlite);
        assert_eq!(config.sync.batch_size, 50);
        assert_eq!(config.sync.scope, ScopeSetting::Finance);
        assert!(config.sync.auto_sync);
        assert_eq!(config.app.remote_dir, Some(PathBuf::from("/tmp/cloud")));
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let mut config = Config::default();
        let result = apply_env_overrides(&mut config, env(&[("MOMENTUM_SYNC_BATCH_SIZE", "lots")]));

        match result {
            Err(ConfigError::InvalidOverride { variable, .. }) => {
                assert_eq!(variable, "MOMENTUM_SYNC_BATCH_SIZE")
            }
            other => panic!("expected InvalidOverride, got {:?}", other),
        }
        assert_eq!(config.sync.batch_size, 100);
    }

    #[test]
    fn test_no_overrides_leaves_config() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, |_| None).expect("Nothing to parse");
        assert_eq!(config, Config::default());
    }
}
