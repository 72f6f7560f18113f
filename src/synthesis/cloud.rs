//! Cloud speech: HTTP TTS with local playback

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::mpsc;

use super::{SynthesisEvent, SynthesisProvider, SynthesisSink, TextToSpeech, Utterance, Voice};
use crate::audio::{AudioPlayback, decode_mp3};
use crate::{Error, Result};

struct Job {
    utterance: Utterance,
    generation: u64,
}

/// Speech synthesis through a [`TextToSpeech`] backend and the default speaker
///
/// Pitch has no cloud equivalent and is ignored; volume scales the decoded
/// samples.
pub struct CloudSynthesis {
    jobs: mpsc::UnboundedSender<Job>,
    voices: Arc<std::sync::Mutex<Vec<Voice>>>,
    generation: Arc<AtomicU64>,
    interrupt: Arc<AtomicBool>,
}

impl CloudSynthesis {
    /// Start the speech worker and fetch the voice catalog
    ///
    /// # Errors
    ///
    /// Returns error if no runtime is available
    pub fn spawn(tts: TextToSpeech, sink: SynthesisSink) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Synthesis(format!("cloud speech requires an async runtime: {e}")))?;

        let tts = Arc::new(tts);
        let voices = Arc::new(std::sync::Mutex::new(Vec::new()));
        let generation = Arc::new(AtomicU64::new(0));
        let interrupt = Arc::new(AtomicBool::new(false));
        let (jobs, job_rx) = mpsc::unbounded_channel();

        {
            let tts = Arc::clone(&tts);
            let voices = Arc::clone(&voices);
            let sink = sink.clone();
            runtime.spawn(async move {
                match tts.list_voices().await {
                    Ok(list) => {
                        tracing::debug!(count = list.len(), "cloud voices loaded");
                        if let Ok(mut guard) = voices.lock() {
                            *guard = list;
                        }
                        let _ = sink.send(SynthesisEvent::VoicesChanged);
                    }
                    Err(e) => tracing::warn!(error = %e, "failed to load cloud voices"),
                }
            });
        }

        runtime.spawn(run_worker(
            tts,
            job_rx,
            Arc::clone(&generation),
            Arc::clone(&interrupt),
            sink,
        ));

        Ok(Self {
            jobs,
            voices,
            generation,
            interrupt,
        })
    }
}

impl SynthesisProvider for CloudSynthesis {
    fn name(&self) -> &str {
        "cloud"
    }

    fn voices(&self) -> Vec<Voice> {
        self.voices
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    fn speak(&mut self, utterance: Utterance) -> Result<()> {
        let job = Job {
            utterance,
            generation: self.generation.load(Ordering::SeqCst),
        };
        self.jobs
            .send(job)
            .map_err(|_| Error::Synthesis("cloud speech worker has stopped".to_string()))
    }

    fn cancel(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.interrupt.store(true, Ordering::SeqCst);
    }
}

async fn run_worker(
    tts: Arc<TextToSpeech>,
    mut jobs: mpsc::UnboundedReceiver<Job>,
    generation: Arc<AtomicU64>,
    interrupt: Arc<AtomicBool>,
    sink: SynthesisSink,
) {
    while let Some(job) = jobs.recv().await {
        let id = job.utterance.id;
        let is_stale = || job.generation != generation.load(Ordering::SeqCst);

        if is_stale() {
            let _ = sink.send(SynthesisEvent::Cancelled(id));
            continue;
        }
        interrupt.store(false, Ordering::SeqCst);
        let _ = sink.send(SynthesisEvent::Started(id));

        let event = match speak_once(&tts, &job.utterance, Arc::clone(&interrupt)).await {
            Ok(true) if !is_stale() => SynthesisEvent::Finished(id),
            Ok(_) => SynthesisEvent::Cancelled(id),
            Err(e) => SynthesisEvent::Failed {
                id,
                message: e.to_string(),
            },
        };
        let _ = sink.send(event);
    }

    tracing::debug!("cloud speech worker stopped");
}

/// Synthesize and play one utterance; `Ok(false)` when interrupted
async fn speak_once(
    tts: &TextToSpeech,
    utterance: &Utterance,
    interrupt: Arc<AtomicBool>,
) -> Result<bool> {
    let voice = utterance.voice.as_ref().map(|v| v.id.as_str());
    let mp3 = tts.synthesize(&utterance.text, voice, utterance.rate).await?;

    if interrupt.load(Ordering::SeqCst) {
        return Ok(false);
    }

    let volume = utterance.volume;
    tokio::task::spawn_blocking(move || {
        let samples: Vec<f32> = decode_mp3(&mp3)?
            .into_iter()
            .map(|s| s * volume)
            .collect();
        AudioPlayback::new()?.play_blocking(samples, &interrupt)
    })
    .await
    .map_err(|e| Error::Audio(format!("playback task failed: {e}")))?
}
