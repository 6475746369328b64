// Configuration module
// Centralized management of application configuration

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{StudioError, StudioResult};

pub mod registry; // Model registry and preset voices

const CONFIG_FILENAME: &str = "config.json";
const APP_DIR_NAME: &str = "tts-studio";
const ENDPOINT_ENV: &str = "TTS_STUDIO_ENDPOINT";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where generated audio, chapter files and archives are written
    pub output_dir: PathBuf,
    /// Root of the saved voice library
    pub voices_dir: PathBuf,
    /// Scratch space for converted reference audio
    pub uploads_dir: PathBuf,
    /// Upper bound on simultaneously loaded models
    pub max_cached_models: usize,
    /// Longest text handed to one generation call in batch modes
    pub chunk_max_chars: usize,
    /// Gap inserted between merged segments
    pub merge_silence_ms: u32,
    /// Inputs longer than this get a slowness warning
    pub text_char_limit_warning: usize,
    /// Base URL of the local inference server
    pub inference_endpoint: String,
    pub request_timeout_secs: u64,
    pub default_sample_rate: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        let base_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME);

        Self {
            output_dir: base_dir.join("output"),
            voices_dir: base_dir.join("voices"),
            uploads_dir: base_dir.join("uploads"),
            max_cached_models: 2,
            chunk_max_chars: 2000,
            merge_silence_ms: 250,
            text_char_limit_warning: 5000,
            inference_endpoint: "http://127.0.0.1:8765".to_string(),
            request_timeout_secs: 600,
            default_sample_rate: 24000,
        }
    }
}

impl AppConfig {
    /// Config rooted at one directory, used for tests and portable setups.
    pub fn rooted_at(base_dir: &Path) -> Self {
        Self {
            output_dir: base_dir.join("output"),
            voices_dir: base_dir.join("voices"),
            uploads_dir: base_dir.join("uploads"),
            ..Self::default()
        }
    }

    /// Load configuration: explicit path, then the per-user config file, then defaults.
    /// `TTS_STUDIO_ENDPOINT` overrides the inference endpoint in every case.
    pub fn load(explicit: Option<&Path>) -> StudioResult<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = default_config_path();
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    debug!("No config file at {}, using defaults", default_path.display());
                    Self::default()
                }
            }
        };

        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            if !endpoint.trim().is_empty() {
                config.inference_endpoint = endpoint.trim().to_string();
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> StudioResult<Self> {
        let json = fs::read_to_string(path).map_err(|e| {
            StudioError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = serde_json::from_str(&json).map_err(|e| {
            StudioError::Configuration(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> StudioResult<()> {
        if self.max_cached_models == 0 {
            return Err(StudioError::Configuration(
                "max_cached_models must be at least 1".to_string(),
            ));
        }
        if self.chunk_max_chars == 0 {
            return Err(StudioError::Configuration(
                "chunk_max_chars must be at least 1".to_string(),
            ));
        }
        if self.inference_endpoint.trim().is_empty() {
            return Err(StudioError::Configuration(
                "inference_endpoint cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Create the output, voices and uploads directories
    pub fn ensure_dirs(&self) -> StudioResult<()> {
        for dir in [&self.output_dir, &self.voices_dir, &self.uploads_dir] {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> StudioResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Get the path to the per-user config file
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join(CONFIG_FILENAME)
}
