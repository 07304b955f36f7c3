use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::SelectionScope;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Engine preferences shared at runtime; edits swap the whole snapshot.
pub type SharedConfig = Arc<ArcSwap<EngineConfig>>;

pub fn shared_config(config: EngineConfig) -> SharedConfig {
    Arc::new(ArcSwap::from_pointee(config))
}

/// Main configuration for the update engine
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EngineConfig {
    /// Property update behaviour
    #[serde(default)]
    pub factory: FactoryConfig,

    /// Camera-dependent feature refresh
    #[serde(default)]
    pub camera: CameraConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

/// How slider edits reach the graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMethod {
    /// Coalesce edits over a fixed interval
    Delayed,
    /// Wait until the mouse is released
    #[default]
    OnHalt,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FactoryConfig {
    /// Alt-held edits apply to the whole selection
    #[serde(default = "default_true")]
    pub alt_allow: bool,

    #[serde(default)]
    pub alt_selection: SelectionScope,

    /// Propagate edits through synchronization channels
    #[serde(default)]
    pub synchronization_allow: bool,

    /// Enable the delayed update methods below
    #[serde(default)]
    pub delay_allow: bool,

    #[serde(default)]
    pub update_method: UpdateMethod,

    /// Coalescing window of the `delayed` method
    #[serde(default = "default_update_delay_ms")]
    pub update_delay_ms: u64,

    /// Input polling period of the `on_halt` method
    #[serde(default = "default_release_poll_ms")]
    pub release_poll_ms: u64,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            alt_allow: true,
            alt_selection: SelectionScope::default(),
            synchronization_allow: false,
            delay_allow: false,
            update_method: UpdateMethod::default(),
            update_delay_ms: default_update_delay_ms(),
            release_poll_ms: default_release_poll_ms(),
        }
    }
}

impl FactoryConfig {
    pub fn update_delay(&self) -> Duration {
        Duration::from_millis(self.update_delay_ms)
    }

    pub fn release_poll(&self) -> Duration {
        Duration::from_millis(self.release_poll_ms)
    }
}

/// When camera changes are pushed to camera-dependent systems
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraUpdateMethod {
    Realtime,
    Delayed,
    /// Only on explicit request
    Apply,
    /// Once the camera stops moving
    #[default]
    OnHalt,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CameraConfig {
    #[serde(default)]
    pub update_method: CameraUpdateMethod,

    #[serde(default = "default_camera_delay_ms")]
    pub update_delay_ms: u64,

    /// Transform polling period of the `on_halt` method
    #[serde(default = "default_halt_poll_ms")]
    pub halt_poll_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            update_method: CameraUpdateMethod::default(),
            update_delay_ms: default_camera_delay_ms(),
            halt_poll_ms: default_halt_poll_ms(),
        }
    }
}

impl CameraConfig {
    pub fn update_delay(&self) -> Duration {
        Duration::from_millis(self.update_delay_ms)
    }

    pub fn halt_poll(&self) -> Duration {
        Duration::from_millis(self.halt_poll_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "pretty", "compact", "full"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_update_delay_ms() -> u64 {
    250
}
fn default_release_poll_ms() -> u64 {
    100
}
fn default_camera_delay_ms() -> u64 {
    350
}
fn default_halt_poll_ms() -> u64 {
    450
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

const MAX_DELAY_MS: u64 = 2000;
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration manager with smart defaults
#[derive(Debug)]
pub struct ConfigManager {
    config: EngineConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables (.env file)
    /// 2. Config file (.scatter.toml)
    /// 3. Sensible defaults
    pub fn load() -> Result<Self, ConfigError> {
        info!("Loading scatter engine configuration");

        Self::load_dotenv();

        let (config, config_path) = Self::load_config_file()?;
        let config = Self::apply_env_overrides(config);
        Self::validate_config(&config)?;

        match config_path {
            Some(ref path) => info!("Config file: {}", path.display()),
            None => info!("Config file: NONE (using defaults)"),
        }
        info!(
            "Update method: {:?} (delay allowed: {}), camera: {:?}",
            config.factory.update_method, config.factory.delay_allow, config.camera.update_method
        );

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Load from an explicit file, still honouring environment overrides.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let config = Self::apply_env_overrides(Self::read_toml_file(path)?);
        Self::validate_config(&config)?;
        Ok(Self {
            config,
            config_path: Some(path.to_path_buf()),
        })
    }

    /// Load .env file if it exists
    fn load_dotenv() {
        if Path::new(".env").exists() {
            if let Err(e) = dotenv::from_filename(".env") {
                warn!("Failed to load .env file: {}", e);
            }
            return;
        }

        if let Some(home) = dirs::home_dir() {
            let home_env = home.join(".scatter.env");
            if home_env.exists() {
                if let Err(e) = dotenv::from_path(&home_env) {
                    warn!("Failed to load .scatter.env: {}", e);
                }
            }
        }
    }

    /// Find and load config file
    /// Search order:
    /// 1. ./.scatter.toml (current directory)
    /// 2. ~/.scatter/config.toml (user config)
    /// 3. Use defaults
    fn load_config_file() -> Result<(EngineConfig, Option<PathBuf>), ConfigError> {
        let local_config = Path::new(".scatter.toml");
        if local_config.exists() {
            let config = Self::read_toml_file(local_config)?;
            return Ok((config, Some(local_config.to_path_buf())));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".scatter").join("config.toml");
            if user_config.exists() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        info!("No config file found, using defaults");
        Ok((EngineConfig::default(), None))
    }

    fn read_toml_file(path: &Path) -> Result<EngineConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;
        EngineConfig::from_toml_str(&content)
    }

    fn apply_env_overrides(config: EngineConfig) -> EngineConfig {
        Self::apply_overrides(config, |key| std::env::var(key).ok())
    }

    fn apply_overrides(
        mut config: EngineConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> EngineConfig {
        let flag = |v: String| v.to_lowercase() == "true" || v == "1";

        if let Some(v) = lookup("SCATTER_ALT_ALLOW") {
            config.factory.alt_allow = flag(v);
        }
        if let Some(v) = lookup("SCATTER_ALT_SELECTION") {
            match v.as_str() {
                "active_emitter" => config.factory.alt_selection = SelectionScope::ActiveEmitter,
                "all_emitters" => config.factory.alt_selection = SelectionScope::AllEmitters,
                other => warn!("Ignoring SCATTER_ALT_SELECTION={}", other),
            }
        }
        if let Some(v) = lookup("SCATTER_SYNC_ALLOW") {
            config.factory.synchronization_allow = flag(v);
        }
        if let Some(v) = lookup("SCATTER_DELAY_ALLOW") {
            config.factory.delay_allow = flag(v);
        }
        if let Some(v) = lookup("SCATTER_UPDATE_METHOD") {
            match v.as_str() {
                "delayed" => config.factory.update_method = UpdateMethod::Delayed,
                "on_halt" => config.factory.update_method = UpdateMethod::OnHalt,
                other => warn!("Ignoring SCATTER_UPDATE_METHOD={}", other),
            }
        }
        if let Some(v) = lookup("SCATTER_UPDATE_DELAY_MS") {
            if let Ok(ms) = v.parse() {
                config.factory.update_delay_ms = ms;
            }
        }
        if let Some(v) = lookup("SCATTER_CAMERA_UPDATE_METHOD") {
            match v.as_str() {
                "realtime" => config.camera.update_method = CameraUpdateMethod::Realtime,
                "delayed" => config.camera.update_method = CameraUpdateMethod::Delayed,
                "apply" => config.camera.update_method = CameraUpdateMethod::Apply,
                "on_halt" => config.camera.update_method = CameraUpdateMethod::OnHalt,
                other => warn!("Ignoring SCATTER_CAMERA_UPDATE_METHOD={}", other),
            }
        }
        if let Some(v) = lookup("SCATTER_CAMERA_DELAY_MS") {
            if let Ok(ms) = v.parse() {
                config.camera.update_delay_ms = ms;
            }
        }

        // Logging; directive lists are left to the EnvFilter
        if let Some(level) = lookup("RUST_LOG") {
            if LOG_LEVELS.contains(&level.as_str()) {
                config.logging.level = level;
            }
        }

        config
    }

    pub fn validate_config(config: &EngineConfig) -> Result<(), ConfigError> {
        for (name, ms) in [
            ("factory.update_delay_ms", config.factory.update_delay_ms),
            ("camera.update_delay_ms", config.camera.update_delay_ms),
        ] {
            if ms > MAX_DELAY_MS {
                return Err(ConfigError::ValidationError(format!(
                    "{} = {} exceeds the maximum of {} ms",
                    name, ms, MAX_DELAY_MS
                )));
            }
        }

        for (name, ms) in [
            ("factory.release_poll_ms", config.factory.release_poll_ms),
            ("camera.halt_poll_ms", config.camera.halt_poll_ms),
        ] {
            if !(10..=5000).contains(&ms) {
                return Err(ConfigError::ValidationError(format!(
                    "{} = {} must be within 10..=5000 ms",
                    name, ms
                )));
            }
        }

        if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log level: {}. Must be one of: {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }

        match config.logging.format.as_str() {
            "pretty" | "compact" | "full" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {}. Must be one of: pretty, compact, full",
                    other
                )))
            }
        }

        Ok(())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn into_config(self) -> EngineConfig {
        self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        let toml_str = EngineConfig::default().to_toml_string()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::ReadError(e.to_string()))?;
        }

        std::fs::write(path, toml_str).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(config.factory.alt_allow);
        assert!(!config.factory.synchronization_allow);
        assert!(!config.factory.delay_allow);
        assert_eq!(config.factory.update_method, UpdateMethod::OnHalt);
        assert_eq!(config.factory.release_poll(), Duration::from_millis(100));
        assert_eq!(config.camera.update_method, CameraUpdateMethod::OnHalt);
        assert_eq!(config.camera.halt_poll(), Duration::from_millis(450));
    }

    #[test]
    fn test_config_validation() {
        let config = EngineConfig::default();
        assert!(ConfigManager::validate_config(&config).is_ok());

        let mut bad = config.clone();
        bad.factory.update_delay_ms = 2500;
        assert!(ConfigManager::validate_config(&bad).is_err());

        let mut bad = config.clone();
        bad.logging.level = "loud".to_string();
        assert!(ConfigManager::validate_config(&bad).is_err());

        let mut bad = config;
        bad.camera.halt_poll_ms = 0;
        assert!(ConfigManager::validate_config(&bad).is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("SCATTER_SYNC_ALLOW", "true"),
            ("SCATTER_DELAY_ALLOW", "1"),
            ("SCATTER_UPDATE_METHOD", "delayed"),
            ("SCATTER_UPDATE_DELAY_MS", "400"),
            ("SCATTER_ALT_SELECTION", "all_emitters"),
            ("SCATTER_CAMERA_UPDATE_METHOD", "bogus"),
        ]
        .into_iter()
        .collect();

        let config = ConfigManager::apply_overrides(EngineConfig::default(), |k| {
            env.get(k).map(|v| v.to_string())
        });

        assert!(config.factory.synchronization_allow);
        assert!(config.factory.delay_allow);
        assert_eq!(config.factory.update_method, UpdateMethod::Delayed);
        assert_eq!(config.factory.update_delay_ms, 400);
        assert_eq!(config.factory.alt_selection, SelectionScope::AllEmitters);
        assert_eq!(config.camera.update_method, CameraUpdateMethod::OnHalt);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [factory]
            delay_allow = true
            update_method = "delayed"
            "#,
        )
        .unwrap();
        assert!(config.factory.delay_allow);
        assert_eq!(config.factory.update_delay_ms, 250);
        assert_eq!(config.camera, CameraConfig::default());
    }
}
