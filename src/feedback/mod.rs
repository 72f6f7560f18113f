//! Spoken feedback
//!
//! [`VoiceFeedbackEngine`] owns the voice parameters, the voice catalog and the
//! "currently speaking" state. Nothing else writes these; callers go through
//! `configure`, `speak`, `announce` and `stop_speaking`, and route provider
//! events back in through `handle_event`.
//!
//! Content read aloud (`speak`) drives the speaking state. Short confirmations
//! (`announce`) share the same queue and voice but leave the speaking state
//! alone, so "stop" reports not-speaking even while "Stopping..." plays.

mod voice_config;

use std::collections::BTreeSet;

pub use voice_config::{
    DEFAULT_LANGUAGE, PITCH_RANGE, RATE_RANGE, VOLUME_RANGE, VoiceConfig, VoiceConfigUpdate,
};

use crate::synthesis::{SynthesisEvent, SynthesisProvider, Utterance, UtteranceId, Voice};

/// Catalog entry as exposed to callers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceInfo {
    /// Voice name
    pub name: String,
    /// BCP-47 language tag
    pub language: String,
}

/// Pick the voice used when none has been chosen
///
/// Prefers the first voice whose language starts with `en`, otherwise the
/// first voice in the catalog.
#[must_use]
pub fn select_default_voice(voices: &[Voice]) -> Option<&Voice> {
    voices
        .iter()
        .find(|v| v.language.starts_with("en"))
        .or_else(|| voices.first())
}

/// Text-to-speech front end with mutable voice parameters
pub struct VoiceFeedbackEngine {
    provider: Option<Box<dyn SynthesisProvider>>,
    config: VoiceConfig,
    voices: Vec<Voice>,
    reading: BTreeSet<UtteranceId>,
    announcing: BTreeSet<UtteranceId>,
    next_id: u64,
    last_feedback: Option<String>,
}

impl VoiceFeedbackEngine {
    /// Create an engine backed by a synthesis provider
    ///
    /// The catalog is read once immediately; providers that load voices lazily
    /// report a later [`SynthesisEvent::VoicesChanged`].
    #[must_use]
    pub fn new(provider: Box<dyn SynthesisProvider>, config: VoiceConfig) -> Self {
        tracing::debug!(provider = provider.name(), "voice feedback engine initialized");

        let mut engine = Self {
            provider: Some(provider),
            config,
            voices: Vec::new(),
            reading: BTreeSet::new(),
            announcing: BTreeSet::new(),
            next_id: 1,
            last_feedback: None,
        };
        engine.reload_voices();
        engine
    }

    /// Create an engine with no synthesis capability; `speak` does nothing
    #[must_use]
    pub fn silent(config: VoiceConfig) -> Self {
        tracing::info!("no speech synthesis available, feedback will be silent");

        Self {
            provider: None,
            config,
            voices: Vec::new(),
            reading: BTreeSet::new(),
            announcing: BTreeSet::new(),
            next_id: 1,
            last_feedback: None,
        }
    }

    /// Current voice parameters
    #[must_use]
    pub const fn config(&self) -> &VoiceConfig {
        &self.config
    }

    /// Merge a partial update into the voice parameters
    pub fn configure(&mut self, update: &VoiceConfigUpdate) {
        self.config = self.config.merged(update);
        tracing::debug!(
            voice = self.config.voice_name(),
            rate = self.config.rate(),
            pitch = self.config.pitch(),
            volume = self.config.volume(),
            language = self.config.language(),
            "voice config updated"
        );
    }

    /// Voice catalog snapshot as (name, language) pairs
    ///
    /// Empty until the provider has loaded its voices.
    #[must_use]
    pub fn list_available_voices(&self) -> Vec<VoiceInfo> {
        self.voices
            .iter()
            .map(|v| VoiceInfo {
                name: v.name.clone(),
                language: v.language.clone(),
            })
            .collect()
    }

    /// Whether content submitted through [`speak`](Self::speak) is still
    /// playing or queued
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        !self.reading.is_empty()
    }

    /// Whether any audio, content or confirmation, is still playing or queued
    #[must_use]
    pub fn is_busy(&self) -> bool {
        !self.reading.is_empty() || !self.announcing.is_empty()
    }

    /// Text of the last submitted utterance
    #[must_use]
    pub fn last_feedback(&self) -> Option<&str> {
        self.last_feedback.as_deref()
    }

    /// Read content aloud with the current voice parameters
    ///
    /// Does not cancel anything already queued. The speaking state holds until
    /// the utterance finishes or is cancelled. Returns the utterance id, or
    /// `None` when there is no provider or the provider rejected it.
    pub fn speak(&mut self, text: &str) -> Option<UtteranceId> {
        let id = self.submit(text)?;
        self.reading.insert(id);
        Some(id)
    }

    /// Speak a short confirmation without entering the speaking state
    pub fn announce(&mut self, text: &str) -> Option<UtteranceId> {
        let id = self.submit(text)?;
        self.announcing.insert(id);
        Some(id)
    }

    fn submit(&mut self, text: &str) -> Option<UtteranceId> {
        let provider = self.provider.as_mut()?;

        let id = UtteranceId(self.next_id);
        self.next_id += 1;

        let voice = self
            .voices
            .iter()
            .find(|v| v.name == self.config.voice_name())
            .cloned();

        let utterance = Utterance {
            id,
            text: text.to_string(),
            voice,
            language: self.config.language().to_string(),
            rate: self.config.rate(),
            pitch: self.config.pitch(),
            volume: self.config.volume(),
        };

        self.last_feedback = Some(text.to_string());

        match provider.speak(utterance) {
            Ok(()) => {
                tracing::debug!(%id, chars = text.len(), "utterance queued");
                Some(id)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to queue utterance");
                None
            }
        }
    }

    /// Cancel everything playing or queued
    ///
    /// Safe to call when nothing is speaking.
    pub fn stop_speaking(&mut self) {
        if let Some(provider) = self.provider.as_mut() {
            provider.cancel();
        }

        let cancelled = self.reading.len() + self.announcing.len();
        if cancelled > 0 {
            tracing::debug!(cancelled, "speech stopped");
        }
        self.reading.clear();
        self.announcing.clear();
    }

    /// Apply a provider progress event
    pub fn handle_event(&mut self, event: SynthesisEvent) {
        match event {
            SynthesisEvent::VoicesChanged => self.reload_voices(),
            SynthesisEvent::Started(id) => {
                tracing::trace!(%id, "utterance started");
            }
            SynthesisEvent::Finished(id) | SynthesisEvent::Cancelled(id) => {
                self.settle(id);
            }
            SynthesisEvent::Failed { id, message } => {
                tracing::warn!(%id, error = %message, "utterance failed");
                self.settle(id);
            }
        }
    }

    fn settle(&mut self, id: UtteranceId) {
        self.reading.remove(&id);
        self.announcing.remove(&id);
    }

    /// Re-read the provider catalog and resolve the default voice if unset
    pub fn reload_voices(&mut self) {
        let Some(provider) = self.provider.as_ref() else {
            return;
        };

        self.voices = provider.voices();
        tracing::debug!(count = self.voices.len(), "voice catalog loaded");

        if !self.config.voice_name().is_empty() {
            return;
        }

        if let Some(voice) = select_default_voice(&self.voices) {
            tracing::info!(voice = %voice.name, language = %voice.language, "default voice selected");
            let update = VoiceConfigUpdate::new().voice_name(voice.name.clone());
            self.config = self.config.merged(&update);
        }
    }
}

impl std::fmt::Debug for VoiceFeedbackEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceFeedbackEngine")
            .field("provider", &self.provider.as_ref().map(|p| p.name()))
            .field("config", &self.config)
            .field("voices", &self.voices.len())
            .field("reading", &self.reading)
            .field("announcing", &self.announcing)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_voice_prefers_english() {
        let voices = vec![
            Voice::new("Amélie", "fr-CA", "fr"),
            Voice::new("Daniel", "en-GB", "en-gb"),
            Voice::new("Samantha", "en-US", "en-us"),
        ];

        assert_eq!(select_default_voice(&voices).unwrap().name, "Daniel");
    }

    #[test]
    fn test_default_voice_falls_back_to_first() {
        let voices = vec![
            Voice::new("Amélie", "fr-CA", "fr"),
            Voice::new("Anna", "de-DE", "de"),
        ];

        assert_eq!(select_default_voice(&voices).unwrap().name, "Amélie");
        assert!(select_default_voice(&[]).is_none());
    }

    #[test]
    fn test_silent_engine() {
        let mut engine = VoiceFeedbackEngine::silent(VoiceConfig::default());

        assert!(engine.speak("hello").is_none());
        assert!(engine.announce("hello").is_none());
        assert!(!engine.is_speaking());
        assert!(!engine.is_busy());
        assert!(engine.list_available_voices().is_empty());

        engine.stop_speaking();
        assert!(!engine.is_speaking());
    }
}
