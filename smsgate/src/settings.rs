//! Application settings

use std::path::{Path, PathBuf};

use at_engine::EngineConfig;
use serde::{Deserialize, Serialize};

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Modem engine configuration
    #[serde(default)]
    pub modem: EngineConfig,
    /// Ports served by virtual modems in `--simulate` mode
    #[serde(default = "default_simulated_ports")]
    pub simulated_ports: Vec<String>,
}

fn default_simulated_ports() -> Vec<String> {
    vec!["/dev/ttyUSB0".to_string(), "/dev/ttyUSB1".to_string()]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            modem: EngineConfig::default(),
            simulated_ports: default_simulated_ports(),
        }
    }
}

impl Settings {
    /// Get the XDG config directory for smsgate
    /// Uses $XDG_CONFIG_HOME/smsgate on Linux/macOS, falls back to ~/.config/smsgate
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("smsgate"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("smsgate"))
    }

    /// Get the settings file path, honouring an explicit override
    pub fn settings_path(custom: Option<&Path>) -> Option<PathBuf> {
        match custom {
            Some(path) => Some(path.to_path_buf()),
            None => Self::config_dir().map(|p| p.join("settings.json")),
        }
    }

    /// Load settings from disk, falling back to defaults
    pub fn load(custom: Option<&Path>) -> Self {
        Self::settings_path(custom)
            .and_then(|path| std::fs::read_to_string(path).ok())
            .and_then(|s| match serde_json::from_str(&s) {
                Ok(settings) => Some(settings),
                Err(e) => {
                    tracing::warn!("Ignoring unreadable settings: {}", e);
                    None
                }
            })
            .unwrap_or_default()
    }

    /// Save settings to disk
    pub fn save(&self, custom: Option<&Path>) -> Result<PathBuf, String> {
        let path = Self::settings_path(custom)
            .ok_or_else(|| "Could not determine settings path".to_string())?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create settings directory: {}", e))?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        std::fs::write(&path, json).map_err(|e| format!("Failed to write settings: {}", e))?;

        Ok(path)
    }
}
