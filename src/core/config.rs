use crate::core::settings::{Language, Mode, PodcastSettings, ScriptLength};
use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_FILE: &str = "config.yml";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default = "default_output")]
    pub output_folder: String,

    #[serde(default = "default_prefs")]
    pub prefs_folder: String,

    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default)]
    pub synthesis: SynthesisConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Whole-request timeout. Unset means the transport default.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub script_length: ScriptLength,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SynthesisConfig {
    #[serde(default = "default_progress_interval")]
    pub progress_interval_ms: u64,
    #[serde(default = "default_progress_step")]
    pub progress_step: f32,
    #[serde(default = "default_progress_cap")]
    pub progress_cap: f32,
}

fn default_output() -> String {
    "output".to_string()
}
fn default_prefs() -> String {
    ".podcast_wizard".to_string()
}
fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}
fn default_progress_interval() -> u64 {
    500
}
fn default_progress_step() -> f32 {
    5.0
}
fn default_progress_cap() -> f32 {
    95.0
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: None,
        }
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            progress_interval_ms: default_progress_interval(),
            progress_step: default_progress_step(),
            progress_cap: default_progress_cap(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            output_folder: default_output(),
            prefs_folder: default_prefs(),
            defaults: DefaultsConfig::default(),
            synthesis: SynthesisConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Reads `path`, or returns defaults when the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("{} not found, using default settings", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    pub fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.output_folder)?;
        fs::create_dir_all(&self.prefs_folder)?;
        Ok(())
    }

    /// Initial settings record for a new wizard session.
    pub fn initial_settings(&self) -> PodcastSettings {
        PodcastSettings {
            language: self.defaults.language,
            mode: self.defaults.mode,
            script_length: self.defaults.script_length,
            ..Default::default()
        }
    }
}
