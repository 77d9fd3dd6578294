use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// User-editable application configuration, stored next to the state
/// records in the config directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model name passed to the Generative Language API.
    pub model: String,
    /// Per-request timeout for collaborator fetches.
    pub request_timeout_seconds: u64,
    /// Environment variable the API key is read from.
    pub api_key_env: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: "gemini-3-flash-preview".to_owned(),
            request_timeout_seconds: 45,
            api_key_env: "GEMINI_API_KEY".to_owned(),
        }
    }
}

impl AppConfig {
    pub fn config_file_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_dir = dirs::config_dir().ok_or("could not resolve the config directory")?;

        let app_config_dir = config_dir.join("rampup");
        std::fs::create_dir_all(&app_config_dir)?;

        Ok(app_config_dir.join("config.json"))
    }

    /// Loads the configuration file, falling back to (and writing out)
    /// the defaults when it is missing or unreadable.
    pub fn load() -> Self {
        match Self::load_from_file() {
            Ok(config) => config,
            Err(err) => {
                tracing::debug!(error = %err, "no usable config file, using defaults");
                let default_config = Self::default();
                if let Err(save_err) = default_config.save() {
                    tracing::warn!(error = %save_err, "could not write default config");
                }
                default_config
            }
        }
    }

    fn load_from_file() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = Self::config_file_path()?;
        let config_content = std::fs::read_to_string(config_path)?;
        let config: AppConfig = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let config_path = Self::config_file_path()?;
        let config_json = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, config_json)?;
        Ok(())
    }
}
