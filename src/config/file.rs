//! TOML configuration file loading
//!
//! Supports `~/.config/voicenav/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct VoiceNavConfigFile {
    /// Speech recognition settings
    #[serde(default)]
    pub recognition: RecognitionFileConfig,

    /// Spoken feedback settings
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Cloud speech-to-text settings
    #[serde(default)]
    pub stt: SttFileConfig,

    /// Cloud text-to-speech settings
    #[serde(default)]
    pub tts: TtsFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    /// Page to control
    #[serde(default)]
    pub page: PageFileConfig,
}

/// Speech recognition settings
#[derive(Debug, Default, Deserialize)]
pub struct RecognitionFileConfig {
    /// Recognition language (e.g. "en-US")
    pub language: Option<String>,

    /// Report partial transcripts
    pub interim_results: Option<bool>,

    /// Keep listening across utterances
    pub continuous: Option<bool>,

    /// "text" or "microphone"
    pub backend: Option<String>,
}

/// Spoken feedback settings
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Voice name, matched exactly against the catalog
    pub name: Option<String>,

    /// Speech rate (0.5 to 2.0)
    pub rate: Option<f32>,

    /// Pitch (0.5 to 2.0)
    pub pitch: Option<f32>,

    /// Volume (0.2 to 1.0)
    pub volume: Option<f32>,

    /// Synthesis language (e.g. "en-US")
    pub language: Option<String>,

    /// "auto", "espeak", "console" or "cloud"
    pub backend: Option<String>,
}

/// Speech-to-text settings
#[derive(Debug, Default, Deserialize)]
pub struct SttFileConfig {
    /// "whisper" or "deepgram"
    pub provider: Option<String>,

    /// Model (e.g. "whisper-1", "nova-2")
    pub model: Option<String>,
}

/// Text-to-speech settings
#[derive(Debug, Default, Deserialize)]
pub struct TtsFileConfig {
    /// "openai" or "elevenlabs"
    pub provider: Option<String>,

    /// Model (e.g. "tts-1")
    pub model: Option<String>,

    /// Provider voice identifier (e.g. "alloy")
    pub voice: Option<String>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
    pub deepgram: Option<String>,
    pub elevenlabs: Option<String>,
}

/// Page settings
#[derive(Debug, Default, Deserialize)]
pub struct PageFileConfig {
    /// HTML file to load
    pub path: Option<PathBuf>,
}

/// Load the TOML config file from the standard path
///
/// Returns `VoiceNavConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> VoiceNavConfigFile {
    config_file_path().map_or_else(VoiceNavConfigFile::default, |path| load_config_from(&path))
}

/// Load a TOML config file from `path`, falling back to defaults
pub fn load_config_from(path: &Path) -> VoiceNavConfigFile {
    if !path.exists() {
        return VoiceNavConfigFile::default();
    }

    match read_config_file(path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "loaded config file");
            config
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            VoiceNavConfigFile::default()
        }
    }
}

fn read_config_file(path: &Path) -> Result<VoiceNavConfigFile> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Return the config file path: `~/.config/voicenav/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("voicenav").join("config.toml"))
}
