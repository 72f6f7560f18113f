//! Speech synthesis capability
//!
//! The feedback engine talks to a text-to-speech backend only through the
//! [`SynthesisProvider`] trait. Providers submit utterances to their own queue
//! and report progress back through a [`SynthesisSink`], so the engine never
//! blocks on playback.

mod console;
mod espeak;
mod tts;

#[cfg(feature = "audio")]
mod cloud;

use std::fmt;

use tokio::sync::mpsc;

pub use console::ConsoleSynthesis;
pub use espeak::{EspeakSynthesis, espeak_args, parse_voice_list};
pub use tts::{TextToSpeech, TtsProvider};

#[cfg(feature = "audio")]
pub use cloud::CloudSynthesis;

use crate::Result;

/// Channel on which providers report [`SynthesisEvent`]s
pub type SynthesisSink = mpsc::UnboundedSender<SynthesisEvent>;

/// Identifier assigned to each submitted utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtteranceId(pub u64);

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "utt-{}", self.0)
    }
}

/// A synthetic voice offered by a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    /// Display name, matched exactly against the configured voice name
    pub name: String,
    /// BCP-47 language tag
    pub language: String,
    /// Provider-specific identifier used when synthesizing
    pub id: String,
}

impl Voice {
    /// Create a voice entry
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        language: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
            id: id.into(),
        }
    }
}

/// A unit of speech submitted to a provider
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    /// Identifier used in progress events
    pub id: UtteranceId,
    /// Text to speak
    pub text: String,
    /// Resolved voice, or `None` for the provider default
    pub voice: Option<Voice>,
    /// Language tag
    pub language: String,
    /// Speech rate multiplier
    pub rate: f32,
    /// Pitch multiplier
    pub pitch: f32,
    /// Volume (0.0 to 1.0)
    pub volume: f32,
}

/// Progress notifications from a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisEvent {
    /// The voice catalog changed and should be re-read
    VoicesChanged,
    /// An utterance began playing
    Started(UtteranceId),
    /// An utterance played to completion
    Finished(UtteranceId),
    /// An utterance was dropped by `cancel`
    Cancelled(UtteranceId),
    /// An utterance could not be synthesized
    Failed {
        /// The failed utterance
        id: UtteranceId,
        /// Provider error message
        message: String,
    },
}

/// Text-to-speech backend
///
/// `speak` is a non-blocking submission: utterances queue up behind each other
/// in the provider and complete asynchronously. `cancel` must drop the current
/// and all queued utterances and must not fail when nothing is queued.
pub trait SynthesisProvider: Send {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// Current voice catalog snapshot (may be empty while loading)
    fn voices(&self) -> Vec<Voice>;

    /// Queue an utterance
    ///
    /// # Errors
    ///
    /// Returns error if the provider can no longer accept work
    fn speak(&mut self, utterance: Utterance) -> Result<()>;

    /// Drop the current and all queued utterances
    fn cancel(&mut self);
}
