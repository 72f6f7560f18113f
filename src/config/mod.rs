//! Configuration management
//!
//! Settings are resolved from environment variables, then the TOML file at
//! `~/.config/voicenav/config.toml`, then built-in defaults.

pub mod file;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use secrecy::SecretString;

use crate::feedback::{VoiceConfig, VoiceConfigUpdate};
use crate::recognition::{RecognitionOptions, SttProvider};
use crate::synthesis::TtsProvider;
use crate::{Error, Result};

pub use file::{VoiceNavConfigFile, config_file_path, load_config_file, load_config_from};

/// Default Whisper model
const DEFAULT_WHISPER_MODEL: &str = "whisper-1";

/// Default Deepgram model
const DEFAULT_DEEPGRAM_MODEL: &str = "nova-2";

/// Default `OpenAI` TTS model and voice
const DEFAULT_OPENAI_TTS_MODEL: &str = "tts-1";
const DEFAULT_OPENAI_TTS_VOICE: &str = "alloy";

/// Default `ElevenLabs` model and voice ("Rachel")
const DEFAULT_ELEVENLABS_MODEL: &str = "eleven_monolingual_v1";
const DEFAULT_ELEVENLABS_VOICE: &str = "21m00Tcm4TlvDq8ikWAM";

/// Where transcripts come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecognitionBackend {
    /// Typed lines on stdin
    #[default]
    Text,
    /// Microphone capture with cloud transcription
    Microphone,
}

impl FromStr for RecognitionBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" | "stdin" => Ok(Self::Text),
            "microphone" | "mic" => Ok(Self::Microphone),
            other => Err(Error::Config(format!(
                "unknown recognition backend: {other} (expected text or microphone)"
            ))),
        }
    }
}

impl fmt::Display for RecognitionBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Microphone => write!(f, "microphone"),
        }
    }
}

/// Where spoken feedback goes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SynthesisBackend {
    /// espeak-ng when installed, console otherwise
    #[default]
    Auto,
    /// espeak-ng binary
    Espeak,
    /// Print utterances to stdout
    Console,
    /// Cloud TTS with local playback
    Cloud,
}

impl FromStr for SynthesisBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "espeak" | "espeak-ng" => Ok(Self::Espeak),
            "console" => Ok(Self::Console),
            "cloud" => Ok(Self::Cloud),
            other => Err(Error::Config(format!(
                "unknown synthesis backend: {other} (expected auto, espeak, console or cloud)"
            ))),
        }
    }
}

impl fmt::Display for SynthesisBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Espeak => write!(f, "espeak"),
            Self::Console => write!(f, "console"),
            Self::Cloud => write!(f, "cloud"),
        }
    }
}

impl FromStr for SttProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "whisper" | "openai" => Ok(Self::Whisper),
            "deepgram" => Ok(Self::Deepgram),
            other => Err(Error::Config(format!("unknown STT provider: {other}"))),
        }
    }
}

impl FromStr for TtsProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "elevenlabs" => Ok(Self::ElevenLabs),
            other => Err(Error::Config(format!("unknown TTS provider: {other}"))),
        }
    }
}

/// Speech-to-text settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SttConfig {
    pub provider: SttProvider,
    pub model: String,
}

/// Text-to-speech settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtsConfig {
    pub provider: TtsProvider,
    pub model: String,
    pub voice: String,
}

/// API keys for cloud speech services
#[derive(Debug, Default)]
pub struct ApiKeys {
    pub openai: Option<SecretString>,
    pub deepgram: Option<SecretString>,
    pub elevenlabs: Option<SecretString>,
}

/// Resolved configuration
#[derive(Debug)]
pub struct Config {
    /// Options passed to the recognition engine
    pub recognition: RecognitionOptions,
    pub recognition_backend: RecognitionBackend,
    /// Initial voice parameters, already clamped
    pub voice: VoiceConfig,
    pub synthesis_backend: SynthesisBackend,
    pub stt: SttConfig,
    pub tts: TtsConfig,
    pub api_keys: ApiKeys,
    /// HTML file to control; an empty page when unset
    pub page_path: Option<PathBuf>,
}

impl Config {
    /// Load from the process environment and the standard config file
    ///
    /// # Errors
    ///
    /// Returns error if a backend or provider name is not recognized
    pub fn load() -> Result<Self> {
        let fc = load_config_file();
        Self::resolve(fc, |key| std::env::var(key).ok())
    }

    /// Resolve from a parsed config file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if a backend or provider name is not recognized
    pub fn resolve(fc: VoiceNavConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let language = env("VOICENAV_LANGUAGE")
            .or(fc.recognition.language)
            .unwrap_or_else(|| RecognitionOptions::default().language);

        let recognition = RecognitionOptions {
            language: language.clone(),
            continuous: fc.recognition.continuous.unwrap_or(true),
            interim_results: fc.recognition.interim_results.unwrap_or(true),
        };

        let recognition_backend = env("VOICENAV_RECOGNITION")
            .or(fc.recognition.backend)
            .map(|s| s.parse())
            .transpose()?
            .unwrap_or_default();

        let mut update = VoiceConfigUpdate {
            voice_name: env("VOICENAV_VOICE").or(fc.voice.name),
            rate: parse_env_f32(&env, "VOICENAV_RATE").or(fc.voice.rate),
            pitch: parse_env_f32(&env, "VOICENAV_PITCH").or(fc.voice.pitch),
            volume: parse_env_f32(&env, "VOICENAV_VOLUME").or(fc.voice.volume),
            language: fc.voice.language,
        };
        if update.language.is_none() {
            update.language = Some(language);
        }
        let voice = VoiceConfig::default().merged(&update);

        let synthesis_backend = env("VOICENAV_SYNTHESIS")
            .or(fc.voice.backend)
            .map(|s| s.parse())
            .transpose()?
            .unwrap_or_default();

        let stt_provider = fc
            .stt
            .provider
            .map(|s| s.parse())
            .transpose()?
            .unwrap_or(SttProvider::Whisper);
        let stt = SttConfig {
            provider: stt_provider,
            model: env("VOICENAV_STT_MODEL")
                .or(fc.stt.model)
                .unwrap_or_else(|| {
                    match stt_provider {
                        SttProvider::Whisper => DEFAULT_WHISPER_MODEL,
                        SttProvider::Deepgram => DEFAULT_DEEPGRAM_MODEL,
                    }
                    .to_string()
                }),
        };

        let tts_provider = fc
            .tts
            .provider
            .map(|s| s.parse())
            .transpose()?
            .unwrap_or(TtsProvider::OpenAI);
        let (default_model, default_voice) = match tts_provider {
            TtsProvider::OpenAI => (DEFAULT_OPENAI_TTS_MODEL, DEFAULT_OPENAI_TTS_VOICE),
            TtsProvider::ElevenLabs => (DEFAULT_ELEVENLABS_MODEL, DEFAULT_ELEVENLABS_VOICE),
        };
        let tts = TtsConfig {
            provider: tts_provider,
            model: env("VOICENAV_TTS_MODEL")
                .or(fc.tts.model)
                .unwrap_or_else(|| default_model.to_string()),
            voice: fc.tts.voice.unwrap_or_else(|| default_voice.to_string()),
        };

        let api_keys = ApiKeys {
            openai: secret(env("OPENAI_API_KEY").or(fc.api_keys.openai)),
            deepgram: secret(env("DEEPGRAM_API_KEY").or(fc.api_keys.deepgram)),
            elevenlabs: secret(env("ELEVENLABS_API_KEY").or(fc.api_keys.elevenlabs)),
        };

        let page_path = env("VOICENAV_PAGE").map(PathBuf::from).or(fc.page.path);

        tracing::debug!(
            language = %recognition.language,
            recognition = %recognition_backend,
            synthesis = %synthesis_backend,
            "configuration resolved"
        );

        Ok(Self {
            recognition,
            recognition_backend,
            voice,
            synthesis_backend,
            stt,
            tts,
            api_keys,
            page_path,
        })
    }

    /// API key for the configured STT provider
    #[must_use]
    pub const fn stt_api_key(&self) -> Option<&SecretString> {
        match self.stt.provider {
            SttProvider::Whisper => self.api_keys.openai.as_ref(),
            SttProvider::Deepgram => self.api_keys.deepgram.as_ref(),
        }
    }

    /// API key for the configured TTS provider
    #[must_use]
    pub const fn tts_api_key(&self) -> Option<&SecretString> {
        match self.tts.provider {
            TtsProvider::OpenAI => self.api_keys.openai.as_ref(),
            TtsProvider::ElevenLabs => self.api_keys.elevenlabs.as_ref(),
        }
    }
}

fn parse_env_f32(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<f32> {
    let raw = env(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring non-numeric value");
            None
        }
    }
}

fn secret(value: Option<String>) -> Option<SecretString> {
    value
        .filter(|k| !k.trim().is_empty())
        .map(SecretString::from)
}
