//! Error types for the voice navigator

use thiserror::Error;

/// Result type alias for voice navigator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the voice navigator
#[derive(Debug, Error)]
pub enum Error {
    /// No speech recognition capability in this environment
    #[error("speech recognition is not supported in this environment")]
    Unsupported,

    /// Recognition engine failure
    #[error("recognition error: {0}")]
    Recognition(String),

    /// Speech synthesis failure
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Host page failure
    #[error("page error: {0}")]
    Page(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
