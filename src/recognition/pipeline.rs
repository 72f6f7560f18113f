//! Segmentation plus transcription for streaming audio

use super::{
    RecognitionEvent, RecognitionSink, SegmentEvent, SpeechResult, Transcriber,
    UtteranceSegmenter,
};
use crate::audio::{SAMPLE_RATE, samples_to_wav};

/// Feeds captured audio through a segmenter and a [`Transcriber`]
///
/// Each completed utterance is transcribed in turn, so results reach the
/// sink in speaking order. Batch STT has no partial hypotheses; only final
/// results are produced.
pub struct TranscriptionPipeline<T> {
    segmenter: UtteranceSegmenter,
    transcriber: T,
    sink: RecognitionSink,
    results: Vec<SpeechResult>,
    failed: bool,
}

impl<T: Transcriber> TranscriptionPipeline<T> {
    /// Create a pipeline reporting to `sink`
    pub fn new(transcriber: T, sink: RecognitionSink) -> Self {
        Self {
            segmenter: UtteranceSegmenter::new(),
            transcriber,
            sink,
            results: Vec::new(),
            failed: false,
        }
    }

    /// Feed one chunk of 16kHz mono samples
    pub async fn push_samples(&mut self, samples: &[f32]) {
        match self.segmenter.process(samples) {
            Some(SegmentEvent::SpeechStarted) => tracing::trace!("speech started"),
            Some(SegmentEvent::Utterance(utterance)) => self.transcribe(&utterance).await,
            None => {}
        }
    }

    /// Transcribe any utterance still in progress
    pub async fn finish(&mut self) {
        if let Some(utterance) = self.segmenter.finish() {
            self.transcribe(&utterance).await;
        }
    }

    /// Final results produced so far
    #[must_use]
    pub fn results(&self) -> &[SpeechResult] {
        &self.results
    }

    /// Whether an error event has been reported; the run is over once set
    #[must_use]
    pub const fn has_failed(&self) -> bool {
        self.failed
    }

    async fn transcribe(&mut self, samples: &[f32]) {
        let wav = match samples_to_wav(samples, SAMPLE_RATE) {
            Ok(wav) => wav,
            Err(e) => {
                self.failed = true;
                let _ = self
                    .sink
                    .send(RecognitionEvent::error("audio-capture", e.to_string()));
                return;
            }
        };

        match self.transcriber.transcribe(&wav).await {
            Ok(text) => {
                let text = text.trim();
                if text.is_empty() {
                    tracing::debug!("utterance produced no transcript");
                    return;
                }

                self.results.push(SpeechResult::new(text, true));
                let _ = self.sink.send(RecognitionEvent::Result {
                    results: self.results.clone(),
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "transcription failed");
                self.failed = true;
                let _ = self
                    .sink
                    .send(RecognitionEvent::error("network", e.to_string()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use super::*;
    use crate::recognition::RecognitionReceiver;
    use crate::{Error, Result};

    fn channel() -> (RecognitionSink, RecognitionReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (RecognitionSink::new(tx, 1), rx)
    }

    struct ScriptedTranscriber {
        replies: Mutex<Vec<Result<String>>>,
    }

    impl ScriptedTranscriber {
        fn new(mut replies: Vec<Result<String>>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
            }
        }
    }

    #[async_trait]
    impl Transcriber for ScriptedTranscriber {
        async fn transcribe(&self, wav: &[u8]) -> Result<String> {
            assert_eq!(&wav[0..4], b"RIFF");
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(String::new()))
        }
    }

    async fn speak(pipeline: &mut TranscriptionPipeline<ScriptedTranscriber>) {
        for _ in 0..4 {
            pipeline.push_samples(&[0.5; 1600]).await;
        }
        for _ in 0..5 {
            pipeline.push_samples(&[0.0; 1600]).await;
        }
    }

    #[tokio::test]
    async fn test_results_accumulate_in_order() {
        let (tx, mut rx) = channel();
        let transcriber = ScriptedTranscriber::new(vec![
            Ok(" scroll down ".to_string()),
            Ok("read this".to_string()),
        ]);
        let mut pipeline = TranscriptionPipeline::new(transcriber, tx);

        speak(&mut pipeline).await;
        speak(&mut pipeline).await;

        let RecognitionEvent::Result { results } = rx.recv().await.unwrap().event else {
            panic!("expected result");
        };
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].transcript(), Some("scroll down"));

        let RecognitionEvent::Result { results } = rx.recv().await.unwrap().event else {
            panic!("expected result");
        };
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_final));
        assert_eq!(pipeline.results().len(), 2);
    }

    #[tokio::test]
    async fn test_failure_reported_as_error_event() {
        let (tx, mut rx) = channel();
        let transcriber =
            ScriptedTranscriber::new(vec![Err(Error::Stt("service unavailable".to_string()))]);
        let mut pipeline = TranscriptionPipeline::new(transcriber, tx);

        speak(&mut pipeline).await;

        let event = rx.recv().await.unwrap().event;
        assert!(matches!(event, RecognitionEvent::Error { ref code, .. } if code == "network"));
        assert!(pipeline.has_failed());
    }

    #[tokio::test]
    async fn test_empty_transcript_and_silence_produce_nothing() {
        let (tx, mut rx) = channel();
        let mut pipeline = TranscriptionPipeline::new(ScriptedTranscriber::new(vec![]), tx);

        pipeline.push_samples(&[0.0; 1600]).await;
        speak(&mut pipeline).await;
        pipeline.finish().await;

        assert!(rx.try_recv().is_err());
        assert!(!pipeline.has_failed());
    }
}
