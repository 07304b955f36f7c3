use scatter_core::{
    CameraUpdateMethod, ConfigError, ConfigManager, EngineConfig, SelectionScope, UpdateMethod,
};
use std::fs;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

#[test]
fn test_default_configuration() {
    let config = EngineConfig::default();
    assert_ok!(ConfigManager::validate_config(&config));
}

#[test]
fn test_create_and_load_default_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    assert_ok!(ConfigManager::create_default_config(&path));
    assert!(path.exists());

    let manager = assert_ok!(ConfigManager::from_path(&path));
    assert_eq!(manager.config_path(), Some(path.as_path()));
    assert_eq!(manager.config().factory, EngineConfig::default().factory);
}

#[test]
fn test_load_custom_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scatter.toml");
    fs::write(
        &path,
        r#"
[factory]
alt_selection = "all_emitters"
delay_allow = true
update_method = "delayed"
update_delay_ms = 120

[camera]
update_method = "apply"
"#,
    )
    .unwrap();

    let config = ConfigManager::from_path(&path).unwrap().into_config();
    assert_eq!(config.factory.alt_selection, SelectionScope::AllEmitters);
    assert_eq!(config.factory.update_method, UpdateMethod::Delayed);
    assert_eq!(config.factory.update_delay_ms, 120);
    assert_eq!(config.camera.update_method, CameraUpdateMethod::Apply);
    assert_eq!(config.camera.halt_poll_ms, 450);
}

#[test]
fn test_invalid_files_are_rejected() {
    let dir = TempDir::new().unwrap();

    let missing = dir.path().join("missing.toml");
    assert!(matches!(
        ConfigManager::from_path(&missing),
        Err(ConfigError::NotFound(_))
    ));

    let garbage = dir.path().join("garbage.toml");
    fs::write(&garbage, "factory = [1, 2").unwrap();
    assert!(matches!(
        ConfigManager::from_path(&garbage),
        Err(ConfigError::ParseError(_))
    ));

    let too_slow = dir.path().join("slow.toml");
    fs::write(&too_slow, "[factory]\nupdate_delay_ms = 9000\n").unwrap();
    assert_err!(ConfigManager::from_path(&too_slow));
}

#[test]
fn test_config_serialization() {
    let mut config = EngineConfig::default();
    config.factory.synchronization_allow = true;
    config.camera.update_method = CameraUpdateMethod::Realtime;

    let text = config.to_toml_string().unwrap();
    let back = EngineConfig::from_toml_str(&text).unwrap();
    assert_eq!(back, config);
}
