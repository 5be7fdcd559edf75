//! TOML-based configuration system.
//!
//! Loads startup settings from a `config.toml` file, falling back to defaults.
//! Every struct implements `Default` so a missing or partial config file
//! behaves like an empty one.
//!
//! `config.toml` only seeds the engine: once the user changes a setting, the
//! value persisted in the data directory (`settings.toml`) wins.
//!
//! ## Config file search order
//!
//! 1. `PAGEGUARD_CONFIG` environment variable (explicit override)
//! 2. Next to the executable (`<exe_dir>/config.toml`)
//! 3. Platform config directory (`%APPDATA%\PageGuard\config.toml` on Windows)
//! 4. Current working directory (`./config.toml`)
//! 5. No file found → `Config::default()`

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::engine::BlockerSettings;
use crate::filters::FilterStrength;

// ─────────────────────────────────────────────────────────────────────────────
// Config structs
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub blocking: BlockingConfig,
}

/// Where persisted state lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding `settings.toml`, `whitelist.toml` and
    /// `counter.toml`. Empty = platform data directory.
    pub data_dir: String,
    /// `false` keeps all state in memory (nothing written to disk).
    pub persist: bool,
}

/// Initial blocking settings, used until the user changes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockingConfig {
    pub enabled: bool,
    pub strength: FilterStrength,
    pub cookie_blocker_enabled: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Default impls
// ─────────────────────────────────────────────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: String::new(),
            persist: true,
        }
    }
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self::from(&BlockerSettings::default())
    }
}

impl From<&BlockerSettings> for BlockingConfig {
    fn from(s: &BlockerSettings) -> Self {
        Self {
            enabled: s.enabled,
            strength: s.strength,
            cookie_blocker_enabled: s.cookie_blocker_enabled,
        }
    }
}

impl BlockingConfig {
    pub fn initial_settings(&self) -> BlockerSettings {
        BlockerSettings {
            enabled: self.enabled,
            strength: self.strength,
            cookie_blocker_enabled: self.cookie_blocker_enabled,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Config loading and saving
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Loads configuration from a TOML file. Never panics — returns defaults
    /// if no file is found or if parsing fails.
    pub fn load() -> Self {
        match find_config_path() {
            Some(path) => Self::load_from(&path),
            None => {
                info!("No config file found, using defaults");
                Config::default()
            }
        }
    }

    /// Loads `path`, falling back to defaults when it is unreadable or invalid.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<Config>(&content) {
                Ok(config) => {
                    info!(path = %path.display(), "Configuration loaded");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Invalid config, using defaults");
                    Config::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot read config, using defaults");
                Config::default()
            }
        }
    }

    /// Saves configuration to the platform config directory and returns the
    /// path written.
    pub fn save(&self) -> io::Result<PathBuf> {
        let path = save_path();
        self.save_to(&path)?;
        Ok(path)
    }

    /// Writes the configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(io::Error::other)?;
        fs::write(path, content)?;
        info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Resolved data directory, or `None` when persistence is off.
    pub fn data_dir(&self) -> Option<PathBuf> {
        if !self.general.persist {
            return None;
        }
        if !self.general.data_dir.trim().is_empty() {
            return Some(PathBuf::from(self.general.data_dir.trim()));
        }
        Some(platform_data_dir().unwrap_or_else(|| PathBuf::from(".pageguard")))
    }
}

/// Searches for a config file in the standard locations.
fn find_config_path() -> Option<PathBuf> {
    // 1. Explicit env var override
    if let Ok(path) = std::env::var("PAGEGUARD_CONFIG") {
        let p = PathBuf::from(path);
        if p.is_file() {
            return Some(p);
        }
    }

    // 2. Next to the executable
    if let Ok(exe) = std::env::current_exe()
        && let Some(dir) = exe.parent()
    {
        let p = dir.join("config.toml");
        if p.is_file() {
            return Some(p);
        }
    }

    // 3. Platform config directory
    if let Some(dir) = platform_config_dir() {
        let p = dir.join("config.toml");
        if p.is_file() {
            return Some(p);
        }
    }

    // 4. Current working directory
    let p = PathBuf::from("config.toml");
    if p.is_file() {
        return Some(p);
    }

    None
}

/// Returns the platform-specific save path for the config file.
fn save_path() -> PathBuf {
    platform_config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("config.toml")
}

/// Returns the platform config directory without adding a dependency.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var("APPDATA")
            .ok()
            .map(|appdata| PathBuf::from(appdata).join("PageGuard"))
    }
    #[cfg(not(windows))]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .or_else(|| std::env::var("HOME").ok().map(|h| format!("{h}/.config")))
            .map(|dir| PathBuf::from(dir).join("pageguard"))
    }
}

/// Returns the platform data directory (app-private state).
fn platform_data_dir() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var("LOCALAPPDATA")
            .ok()
            .map(|dir| PathBuf::from(dir).join("PageGuard"))
    }
    #[cfg(not(windows))]
    {
        std::env::var("XDG_DATA_HOME")
            .ok()
            .or_else(|| std::env::var("HOME").ok().map(|h| format!("{h}/.local/share")))
            .map(|dir| PathBuf::from(dir).join("pageguard"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = Config::default();
        assert!(c.general.data_dir.is_empty());
        assert!(c.general.persist);
        assert!(c.blocking.enabled);
        assert_eq!(c.blocking.strength, FilterStrength::Medium);
        assert!(c.blocking.cookie_blocker_enabled);
        assert_eq!(c.blocking.initial_settings(), BlockerSettings::default());
    }

    #[test]
    fn test_empty_toml_returns_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.general.persist);
        assert_eq!(config.blocking.strength, FilterStrength::Medium);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let toml = r#"
[blocking]
strength = "strong"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.blocking.strength, FilterStrength::Strong);
        assert!(config.blocking.enabled); // default
        assert!(config.general.persist); // default
    }

    #[test]
    fn test_full_toml_roundtrip() {
        let mut config = Config::default();
        config.general.data_dir = "/tmp/pg".into();
        config.blocking.cookie_blocker_enabled = false;
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.general.data_dir, "/tmp/pg");
        assert!(!deserialized.blocking.cookie_blocker_enabled);
    }

    #[test]
    fn test_data_dir_resolution() {
        let mut config = Config::default();
        config.general.data_dir = " /var/lib/pageguard ".into();
        assert_eq!(config.data_dir(), Some(PathBuf::from("/var/lib/pageguard")));

        config.general.persist = false;
        assert_eq!(config.data_dir(), None);

        config.general.persist = true;
        config.general.data_dir.clear();
        assert!(config.data_dir().is_some());
    }

    #[test]
    fn test_save_to_then_load_from() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.general.persist = false;
        config.blocking.strength = FilterStrength::Light;
        config.blocking.cookie_blocker_enabled = false;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path);
        assert!(!loaded.general.persist);
        assert_eq!(loaded.blocking.strength, FilterStrength::Light);
        assert!(!loaded.blocking.cookie_blocker_enabled);
    }

    #[test]
    fn test_blocking_config_from_current_settings() {
        let current = BlockerSettings {
            enabled: false,
            strength: FilterStrength::Strong,
            cookie_blocker_enabled: true,
        };
        assert_eq!(BlockingConfig::from(&current).initial_settings(), current);
    }

    #[test]
    fn test_load_from_invalid_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[blocking]\nstrength = 42\n").unwrap();
        assert_eq!(Config::load_from(&path).blocking.strength, FilterStrength::Medium);
        assert!(Config::load_from(&dir.path().join("missing.toml")).general.persist);
    }

    #[test]
    fn test_save_path_not_empty() {
        let path = save_path();
        assert!(!path.as_os_str().is_empty());
    }
}
