//! Live microphone recognition

use std::sync::Arc;
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle as ThreadHandle;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{
    RecognitionEvent, RecognitionOptions, RecognitionProvider, RecognitionSink, Transcriber,
    TranscriptionPipeline,
};
use crate::audio::AudioCapture;
use crate::{Error, Result};

/// Recognition provider capturing from the default microphone
///
/// The cpal stream lives on a dedicated thread; chunks flow into a task that
/// segments and transcribes them.
pub struct MicrophoneRecognition {
    transcriber: Arc<dyn Transcriber>,
    capture: Option<(ThreadHandle<()>, std_mpsc::Sender<()>)>,
    task: Option<JoinHandle<()>>,
}

impl MicrophoneRecognition {
    /// Create a provider using `transcriber` for each utterance
    #[must_use]
    pub fn new(transcriber: Arc<dyn Transcriber>) -> Self {
        Self {
            transcriber,
            capture: None,
            task: None,
        }
    }

    /// Stop the capture thread; the task drains remaining chunks then ends
    fn stop_capture(&mut self) {
        if let Some((thread, stop_tx)) = self.capture.take() {
            let _ = stop_tx.send(());
            if thread.join().is_err() {
                tracing::warn!("audio capture thread panicked");
            }
        }
    }
}

struct SharedTranscriber(Arc<dyn Transcriber>);

#[async_trait::async_trait]
impl Transcriber for SharedTranscriber {
    async fn transcribe(&self, wav: &[u8]) -> Result<String> {
        self.0.transcribe(wav).await
    }
}

impl RecognitionProvider for MicrophoneRecognition {
    fn name(&self) -> &str {
        "microphone"
    }

    fn start(&mut self, options: &RecognitionOptions, sink: RecognitionSink) -> Result<()> {
        if self.task.as_ref().is_some_and(|t| !t.is_finished()) {
            return Ok(());
        }
        // A single-shot run leaves its capture thread behind
        self.stop_capture();

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Recognition(format!("microphone requires an async runtime: {e}")))?;

        let (chunk_tx, mut chunk_rx) = mpsc::unbounded_channel::<Vec<f32>>();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<()>>();

        let thread = std::thread::Builder::new()
            .name("voicenav-capture".to_string())
            .spawn(move || {
                let mut capture = match AudioCapture::new() {
                    Ok(capture) => capture,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                if let Err(e) = capture.start(chunk_tx) {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                // Dropping the sender also counts as a stop request
                let _ = stop_rx.recv();
                capture.stop();
            })?;

        ready_rx
            .recv()
            .map_err(|_| Error::Audio("audio capture thread exited".to_string()))??;

        let transcriber = SharedTranscriber(Arc::clone(&self.transcriber));
        let continuous = options.continuous;
        self.task = Some(runtime.spawn(async move {
            let mut pipeline = TranscriptionPipeline::new(transcriber, sink.clone());
            while let Some(chunk) = chunk_rx.recv().await {
                pipeline.push_samples(&chunk).await;
                if pipeline.has_failed() {
                    break;
                }
                if !continuous && !pipeline.results().is_empty() {
                    break;
                }
            }
            if !pipeline.has_failed() {
                pipeline.finish().await;
            }
            let _ = sink.send(RecognitionEvent::End);
        }));
        self.capture = Some((thread, stop_tx));

        tracing::debug!(language = %options.language, "microphone recognition started");
        Ok(())
    }

    fn stop(&mut self) {
        self.stop_capture();
        // The task ends once the chunk channel closes
        self.task = None;
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.stop_capture();
    }
}

impl Drop for MicrophoneRecognition {
    fn drop(&mut self) {
        self.abort();
    }
}
