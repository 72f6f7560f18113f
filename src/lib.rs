//! Voice Nav - Hands-free page navigation by voice
//!
//! This library turns spoken (or typed) commands into page actions with
//! spoken confirmations:
//! - Speech recognition sessions over pluggable engines
//! - Command matching and dispatch against a document
//! - Text-to-speech feedback with adjustable voice parameters
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 Recognition engines                  │
//! │      Typed text  │  Microphone + STT (Whisper, ...)  │
//! └────────────────────┬────────────────────────────────┘
//!                      │ RecognitionEvent
//! ┌────────────────────▼────────────────────────────────┐
//! │                  VoiceNavigator                      │
//! │  RecognitionSession → CommandDispatcher → HostPage   │
//! │                           │                          │
//! │                  VoiceFeedbackEngine                 │
//! └────────────────────┬────────────────────────────────┘
//!                      │ Utterance
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Synthesis engines                    │
//! │      espeak-ng  │  Console  │  Cloud TTS + playback  │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod app;
pub mod audio;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod feedback;
pub mod page;
pub mod recognition;
pub mod synthesis;

pub use app::{TranscriptObserver, VoiceNavigator};
pub use config::Config;
pub use dispatch::{CommandDispatcher, CommandPattern, CommandRegistry, DispatchOutcome, default_registry};
pub use error::{Error, Result};
pub use feedback::{VoiceConfig, VoiceConfigUpdate, VoiceFeedbackEngine, VoiceInfo};
pub use page::{HostPage, HtmlPage};
pub use recognition::{
    RecognitionEvent, RecognitionOptions, RecognitionProvider, RecognitionSession, RunEvent,
    SessionState, TranscriptEvent,
};
pub use synthesis::{SynthesisEvent, SynthesisProvider};
