//! Configuration management for StealthPad
//!
//! Handles loading, saving, and managing user preferences and settings.

use anyhow::Result;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Appearance settings
    pub appearance: AppearanceConfig,
    /// Behavior settings
    pub behavior: BehaviorConfig,
    /// Hotkey configurations
    pub hotkeys: HotkeyConfig,
}

impl Config {
    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stealthpad")
            .join("config.toml")
    }

    /// Load configuration from file or create default
    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            info!("Loading configuration from: {:?}", config_path);
            let content = std::fs::read_to_string(&config_path)?;
            match toml::from_str(&content) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    warn!("Failed to parse config, using defaults: {}", e);
                }
            }
        }

        let config = Self::default();
        config.save()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        info!("Configuration saved to: {:?}", config_path);
        Ok(())
    }
}

/// Appearance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppearanceConfig {
    /// Default note window width in pixels
    pub note_width: i32,
    /// Default note window height in pixels
    pub note_height: i32,
    /// Opacity while a note has input focus (0.0 - 1.0, never fully opaque)
    pub focused_opacity: f64,
    /// Opacity while a note is dimmed but present
    pub dimmed_opacity: f64,
    /// Opacity in stealth mode
    pub stealth_opacity: f64,
    /// Near-zero opacity used while another surface is fullscreen
    pub hidden_opacity: f64,
}

impl Default for AppearanceConfig {
    fn default() -> Self {
        Self {
            note_width: 400,
            note_height: 300,
            focused_opacity: 0.4,
            dimmed_opacity: 0.3,
            stealth_opacity: 0.05,
            hidden_opacity: 0.01,
        }
    }
}

/// Behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorConfig {
    /// Cascade offset between successive new notes, in pixels
    pub cascade_step: i32,
    /// Ask the compositor to exclude note windows from screen capture
    pub exclude_from_capture: bool,
    /// Fullscreen-presentation poll interval in milliseconds
    pub fullscreen_poll_ms: u32,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            cascade_step: 30,
            exclude_from_capture: true,
            fullscreen_poll_ms: 1000,
        }
    }
}

/// Hotkey configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotkeyConfig {
    /// Toggle show/hide of the current note
    pub toggle_note: Option<String>,
    /// Force near-zero opacity on the current note
    pub force_hide: Option<String>,
    /// Restore moderate opacity and focus the current note
    pub restore: Option<String>,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            toggle_note: Some("Ctrl+Shift+N".to_string()),
            force_hide: Some("Ctrl+Shift+H".to_string()),
            restore: Some("Ctrl+Shift+S".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    #[test]
    fn toml_roundtrip_default() {
        let cfg = Config::default();
        let s = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&s).expect("parse");
        assert_eq!(cfg.appearance.note_width, parsed.appearance.note_width);
        assert_eq!(cfg.behavior.cascade_step, parsed.behavior.cascade_step);
        assert_eq!(cfg.hotkeys.toggle_note, parsed.hotkeys.toggle_note);
    }

    #[test]
    fn save_and_load_or_default_reads_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        env::set_var("APPDATA", tmp.path());
        env::set_var("XDG_CONFIG_HOME", tmp.path());

        let path = Config::config_path();
        let s = path.to_string_lossy();
        assert!(
            s.ends_with("stealthpad/config.toml") || s.ends_with("stealthpad\\config.toml"),
            "config path does not end with stealthpad/config.toml: {}",
            s
        );
        if path.exists() {
            fs::remove_file(&path).unwrap();
        }

        let mut cfg = Config::default();
        cfg.appearance.note_width = 512;
        cfg.save().expect("save");
        let loaded = Config::load_or_default().expect("load");
        assert_eq!(loaded.appearance.note_width, 512);
    }
}
