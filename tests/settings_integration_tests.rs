//! Integration tests for SettingsManager and studio.yaml handling
//!
//! These tests verify:
//! - Saved settings load back unchanged
//! - Partial files keep defaults for missing keys
//! - Malformed files are reported, not silently replaced
//! - Loaded settings drive the renderer and the template store

use barcode_studio::models::StudioSettings;
use barcode_studio::services::{CommandRenderer, GenerationError};
use barcode_studio::SettingsManager;
use camino::Utf8PathBuf;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn create_test_settings_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let settings_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, settings_path)
}

fn no_env() -> Option<config::Map<String, String>> {
    Some(config::Map::new())
}

#[test]
fn test_create_settings_manager() {
    let (_temp_dir, settings_dir) = create_test_settings_dir();
    let nested = settings_dir.join("nested/studio");
    let manager = SettingsManager::new(&nested).unwrap();

    assert_eq!(manager.settings_dir().as_str(), nested.as_str());
    assert!(nested.exists());
    assert_eq!(manager.settings_path(), nested.join("studio.yaml").as_path());
}

#[test]
fn test_save_and_reload() {
    let (_temp_dir, settings_dir) = create_test_settings_dir();
    let manager = SettingsManager::new(&settings_dir).unwrap();

    let settings = StudioSettings {
        auto_generate: false,
        render_timeout_secs: 12,
        renderer_program: "zint".to_string(),
        renderer_args: vec!["--stdin".to_string(), "--png".to_string()],
        template_store_path: settings_dir.join("store/templates.json"),
        debug_mode: true,
        ..StudioSettings::default()
    };
    manager.save(&settings).unwrap();

    let loaded = manager.load_with_env(no_env()).unwrap();
    assert_eq!(loaded, settings);
}

#[test]
fn test_partial_file_keeps_defaults() {
    let (_temp_dir, settings_dir) = create_test_settings_dir();
    let manager = SettingsManager::new(&settings_dir).unwrap();
    fs::write(manager.settings_path(), "notification_capacity: 8\n").unwrap();

    let loaded = manager.load_with_env(no_env()).unwrap();
    assert_eq!(loaded.notification_capacity, 8);
    assert!(loaded.auto_generate);
    assert_eq!(loaded.render_timeout_secs, 30);
    assert_eq!(loaded.template_store_path.as_str(), "templates.json");
}

#[test]
fn test_malformed_file_is_an_error() {
    let (_temp_dir, settings_dir) = create_test_settings_dir();
    let manager = SettingsManager::new(&settings_dir).unwrap();
    fs::write(manager.settings_path(), "render_timeout_secs: [not, a, number\n").unwrap();

    let err = manager.load_with_env(no_env()).unwrap_err();
    assert!(format!("{err:#}").contains("studio.yaml"));
}

#[test]
fn test_render_timeout_has_a_floor() {
    let settings = StudioSettings {
        render_timeout_secs: 0,
        ..StudioSettings::default()
    };
    assert_eq!(settings.render_timeout(), Duration::from_secs(1));
}

#[test]
fn test_renderer_requires_a_program() {
    let (_temp_dir, settings_dir) = create_test_settings_dir();
    let manager = SettingsManager::new(&settings_dir).unwrap();
    manager.init_default().unwrap();

    let settings = manager.load_with_env(no_env()).unwrap();
    assert!(!settings.has_renderer());
    assert_eq!(
        CommandRenderer::from_settings(&settings).unwrap_err(),
        GenerationError::NotConfigured
    );

    fs::write(manager.settings_path(), "renderer_program: zint\n").unwrap();
    let settings = manager.load_with_env(no_env()).unwrap();
    let renderer = CommandRenderer::from_settings(&settings).unwrap();
    assert_eq!(renderer.program().as_str(), "zint");
}
