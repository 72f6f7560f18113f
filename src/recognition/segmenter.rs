//! Utterance segmentation
//!
//! Splits a live sample stream into utterances with a simple energy gate:
//! speech starts on the first loud chunk and ends after a run of silence.

/// Minimum RMS energy to consider a chunk speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum voiced samples for an utterance (0.3s at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4800;

/// Trailing silence that ends an utterance (0.5s at 16kHz)
const SILENCE_SAMPLES: usize = 8000;

/// Output of [`UtteranceSegmenter::process`]
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentEvent {
    /// Speech began
    SpeechStarted,
    /// A complete utterance, including its trailing silence
    Utterance(Vec<f32>),
}

/// Energy-based utterance detector
#[derive(Debug, Default)]
pub struct UtteranceSegmenter {
    in_speech: bool,
    buffer: Vec<f32>,
    voiced: usize,
    silence: usize,
}

impl UtteranceSegmenter {
    /// Create an idle segmenter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of samples
    ///
    /// Utterances shorter than the minimum voiced length are discarded as
    /// noise once their trailing silence elapses.
    pub fn process(&mut self, samples: &[f32]) -> Option<SegmentEvent> {
        let energy = calculate_energy(samples);
        let is_speech = energy > ENERGY_THRESHOLD;

        if !self.in_speech {
            if !is_speech {
                return None;
            }
            self.in_speech = true;
            self.buffer.clear();
            self.buffer.extend_from_slice(samples);
            self.voiced = samples.len();
            self.silence = 0;
            tracing::trace!(energy, "speech detected");
            return Some(SegmentEvent::SpeechStarted);
        }

        self.buffer.extend_from_slice(samples);
        if is_speech {
            self.voiced += samples.len();
            self.silence = 0;
        } else {
            self.silence += samples.len();
        }

        if self.silence < SILENCE_SAMPLES {
            return None;
        }

        if self.voiced >= MIN_SPEECH_SAMPLES {
            tracing::debug!(samples = self.buffer.len(), "utterance complete");
            let utterance = std::mem::take(&mut self.buffer);
            self.reset();
            return Some(SegmentEvent::Utterance(utterance));
        }

        tracing::trace!(voiced = self.voiced, "speech too short, discarding");
        self.reset();
        None
    }

    /// Flush the utterance in progress at end of stream
    pub fn finish(&mut self) -> Option<Vec<f32>> {
        let complete = self.in_speech && self.voiced >= MIN_SPEECH_SAMPLES;
        let utterance = std::mem::take(&mut self.buffer);
        self.reset();
        complete.then_some(utterance)
    }

    /// Whether speech is in progress
    #[must_use]
    pub const fn in_speech(&self) -> bool {
        self.in_speech
    }

    /// Return to idle, dropping any buffered speech
    pub fn reset(&mut self) {
        self.in_speech = false;
        self.buffer.clear();
        self.voiced = 0;
        self.silence = 0;
    }
}

/// Calculate RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHUNK: usize = 1600;

    fn loud() -> Vec<f32> {
        vec![0.5; CHUNK]
    }

    fn quiet() -> Vec<f32> {
        vec![0.0; CHUNK]
    }

    #[test]
    fn test_energy_calculation() {
        assert!(calculate_energy(&quiet()) < 0.001);
        assert!(calculate_energy(&loud()) > 0.4);
        assert!(calculate_energy(&[]) < f32::EPSILON);
    }

    #[test]
    fn test_utterance_after_speech_and_silence() {
        let mut segmenter = UtteranceSegmenter::new();

        assert_eq!(segmenter.process(&quiet()), None);
        assert_eq!(segmenter.process(&loud()), Some(SegmentEvent::SpeechStarted));
        for _ in 0..3 {
            assert_eq!(segmenter.process(&loud()), None);
        }

        let mut completed = None;
        for _ in 0..5 {
            if let Some(event) = segmenter.process(&quiet()) {
                completed = Some(event);
            }
        }

        let Some(SegmentEvent::Utterance(samples)) = completed else {
            panic!("expected utterance");
        };
        assert_eq!(samples.len(), CHUNK * 9);
        assert!(!segmenter.in_speech());
    }

    #[test]
    fn test_short_burst_discarded() {
        let mut segmenter = UtteranceSegmenter::new();

        assert_eq!(segmenter.process(&loud()), Some(SegmentEvent::SpeechStarted));
        for _ in 0..5 {
            assert_eq!(segmenter.process(&quiet()), None);
        }
        assert!(!segmenter.in_speech());
    }

    #[test]
    fn test_finish_flushes_long_speech() {
        let mut segmenter = UtteranceSegmenter::new();
        for _ in 0..4 {
            segmenter.process(&loud());
        }

        assert_eq!(segmenter.finish().map(|s| s.len()), Some(CHUNK * 4));
        assert_eq!(segmenter.finish(), None);
    }
}
