//! Typed speech: one input line is one utterance

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;

use super::{
    RecognitionEvent, RecognitionOptions, RecognitionProvider, RecognitionSink, SpeechResult,
};
use crate::{Error, Result};

type SharedReader = Arc<Mutex<BufReader<Box<dyn AsyncRead + Unpin + Send>>>>;

/// Recognition provider reading utterances from a text stream
///
/// Each non-empty line becomes a final result. With interim results enabled,
/// the growing word prefixes of the line are reported first, the way a live
/// engine refines a hypothesis. The reader survives `stop` so a later `start`
/// continues where it left off.
pub struct TextRecognition {
    reader: SharedReader,
    task: Option<JoinHandle<()>>,
    stop_tx: Option<oneshot::Sender<()>>,
}

impl TextRecognition {
    /// Read utterances from stdin
    #[must_use]
    pub fn stdin() -> Self {
        Self::new(tokio::io::stdin())
    }

    /// Read utterances from any async reader
    #[must_use]
    pub fn new<R>(reader: R) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let boxed: Box<dyn AsyncRead + Unpin + Send> = Box::new(reader);
        Self {
            reader: Arc::new(Mutex::new(BufReader::new(boxed))),
            task: None,
            stop_tx: None,
        }
    }

    /// Running and not asked to stop
    fn is_listening(&self) -> bool {
        self.stop_tx.is_some() && self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl RecognitionProvider for TextRecognition {
    fn name(&self) -> &str {
        "text"
    }

    fn start(&mut self, options: &RecognitionOptions, sink: RecognitionSink) -> Result<()> {
        if self.is_listening() {
            return Ok(());
        }
        // A stopped run may not have seen its stop signal yet
        if let Some(task) = self.task.take() {
            task.abort();
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Recognition(format!("text input requires an async runtime: {e}")))?;

        let (stop_tx, stop_rx) = oneshot::channel();
        self.stop_tx = Some(stop_tx);
        self.task = Some(runtime.spawn(read_utterances(
            Arc::clone(&self.reader),
            options.clone(),
            sink,
            stop_rx,
        )));

        Ok(())
    }

    fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }

    fn abort(&mut self) {
        self.stop_tx = None;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for TextRecognition {
    fn drop(&mut self) {
        self.abort();
    }
}

async fn read_utterances(
    reader: SharedReader,
    options: RecognitionOptions,
    sink: RecognitionSink,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut reader = reader.lock().await;
    let mut results: Vec<SpeechResult> = Vec::new();
    let mut line = String::new();

    loop {
        line.clear();

        let read = tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            read = reader.read_line(&mut line) => read,
        };

        match read {
            Ok(0) => {
                tracing::debug!("text input closed");
                break;
            }
            Ok(_) => {
                let text = line.trim();
                if text.is_empty() {
                    continue;
                }

                if options.interim_results && !emit_interims(&sink, &results, text) {
                    return;
                }

                results.push(SpeechResult::new(text, true));
                let event = RecognitionEvent::Result {
                    results: results.clone(),
                };
                if sink.send(event).is_err() {
                    return;
                }

                if !options.continuous {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read text input");
                let _ = sink.send(RecognitionEvent::error("audio-capture", e.to_string()));
                break;
            }
        }
    }

    let _ = sink.send(RecognitionEvent::End);
}

/// Report each proper word prefix of `text` as an interim result
///
/// Returns `false` once the receiver is gone.
fn emit_interims(sink: &RecognitionSink, finals: &[SpeechResult], text: &str) -> bool {
    let words: Vec<&str> = text.split_whitespace().collect();

    for end in 1..words.len() {
        let mut results = finals.to_vec();
        results.push(SpeechResult::new(words[..end].join(" "), false));
        if sink.send(RecognitionEvent::Result { results }).is_err() {
            return false;
        }
    }

    true
}
