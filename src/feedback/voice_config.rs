//! Voice parameters and the merge-and-clamp update rule

use std::ops::RangeInclusive;

/// Allowed speech rate
pub const RATE_RANGE: RangeInclusive<f32> = 0.5..=2.0;

/// Allowed pitch
pub const PITCH_RANGE: RangeInclusive<f32> = 0.5..=2.0;

/// Allowed volume
pub const VOLUME_RANGE: RangeInclusive<f32> = 0.2..=1.0;

/// Default recognition and synthesis language
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Voice parameters applied to every utterance
///
/// Values can only change through [`VoiceConfig::merged`], which clamps each
/// numeric field into its range at merge time.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceConfig {
    voice_name: String,
    rate: f32,
    pitch: f32,
    volume: f32,
    language: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            voice_name: String::new(),
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl VoiceConfig {
    /// Selected voice name; empty until resolved against the catalog
    #[must_use]
    pub fn voice_name(&self) -> &str {
        &self.voice_name
    }

    /// Speech rate in [`RATE_RANGE`]
    #[must_use]
    pub const fn rate(&self) -> f32 {
        self.rate
    }

    /// Pitch in [`PITCH_RANGE`]
    #[must_use]
    pub const fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Volume in [`VOLUME_RANGE`]
    #[must_use]
    pub const fn volume(&self) -> f32 {
        self.volume
    }

    /// BCP-47 language tag
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Apply a partial update, clamping numeric fields
    ///
    /// Fields absent from `update` keep their current value. Non-finite numbers
    /// are ignored.
    #[must_use]
    pub fn merged(&self, update: &VoiceConfigUpdate) -> Self {
        Self {
            voice_name: update
                .voice_name
                .clone()
                .unwrap_or_else(|| self.voice_name.clone()),
            rate: clamp_field(self.rate, update.rate, &RATE_RANGE),
            pitch: clamp_field(self.pitch, update.pitch, &PITCH_RANGE),
            volume: clamp_field(self.volume, update.volume, &VOLUME_RANGE),
            language: update
                .language
                .clone()
                .unwrap_or_else(|| self.language.clone()),
        }
    }
}

fn clamp_field(current: f32, value: Option<f32>, range: &RangeInclusive<f32>) -> f32 {
    match value {
        Some(v) if v.is_finite() => v.clamp(*range.start(), *range.end()),
        _ => current,
    }
}

/// Partial [`VoiceConfig`] update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoiceConfigUpdate {
    /// New voice name
    pub voice_name: Option<String>,
    /// New speech rate
    pub rate: Option<f32>,
    /// New pitch
    pub pitch: Option<f32>,
    /// New volume
    pub volume: Option<f32>,
    /// New language tag
    pub language: Option<String>,
}

impl VoiceConfigUpdate {
    /// Empty update
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the voice name
    #[must_use]
    pub fn voice_name(mut self, name: impl Into<String>) -> Self {
        self.voice_name = Some(name.into());
        self
    }

    /// Set the speech rate
    #[must_use]
    pub const fn rate(mut self, rate: f32) -> Self {
        self.rate = Some(rate);
        self
    }

    /// Set the pitch
    #[must_use]
    pub const fn pitch(mut self, pitch: f32) -> Self {
        self.pitch = Some(pitch);
        self
    }

    /// Set the volume
    #[must_use]
    pub const fn volume(mut self, volume: f32) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Set the language tag
    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Whether the update changes nothing
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.voice_name.is_none()
            && self.rate.is_none()
            && self.pitch.is_none()
            && self.volume.is_none()
            && self.language.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VoiceConfig::default();
        assert_eq!(config.voice_name(), "");
        assert!((config.rate() - 1.0).abs() < f32::EPSILON);
        assert!((config.pitch() - 1.0).abs() < f32::EPSILON);
        assert!((config.volume() - 1.0).abs() < f32::EPSILON);
        assert_eq!(config.language(), "en-US");
    }

    #[test]
    fn test_merge_keeps_unspecified_fields() {
        let config = VoiceConfig::default().merged(&VoiceConfigUpdate::new().pitch(1.4));
        let config = config.merged(&VoiceConfigUpdate::new().voice_name("Samantha"));

        assert!((config.pitch() - 1.4).abs() < 1e-6);
        assert_eq!(config.voice_name(), "Samantha");
        assert!((config.rate() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_merge_clamps_out_of_range() {
        let update = VoiceConfigUpdate::new().rate(9.0).pitch(0.1).volume(0.0);
        let config = VoiceConfig::default().merged(&update);

        assert!((config.rate() - 2.0).abs() < f32::EPSILON);
        assert!((config.pitch() - 0.5).abs() < f32::EPSILON);
        assert!((config.volume() - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn test_merge_ignores_non_finite() {
        let update = VoiceConfigUpdate::new().rate(f32::NAN).volume(f32::INFINITY);
        let config = VoiceConfig::default().merged(&update);

        assert!((config.rate() - 1.0).abs() < f32::EPSILON);
        assert!((config.volume() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_empty_update() {
        assert!(VoiceConfigUpdate::new().is_empty());
        assert!(!VoiceConfigUpdate::new().language("fr-FR").is_empty());
    }
}
