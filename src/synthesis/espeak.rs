//! Local speech through the `espeak-ng` binary
//!
//! Utterances run one at a time in a background task, each as a child
//! process fed through stdin. `cancel` bumps a generation counter: the running
//! child is killed and queued jobs from older generations are dropped.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::{mpsc, watch};

use super::{SynthesisEvent, SynthesisProvider, SynthesisSink, Utterance, Voice};
use crate::{Error, Result};

/// espeak-ng words per minute at rate 1.0
const BASE_WORDS_PER_MINUTE: f32 = 175.0;

/// espeak-ng pitch at pitch 1.0 (range 0-99)
const BASE_PITCH: f32 = 50.0;

/// espeak-ng amplitude at volume 1.0 (range 0-200)
const BASE_AMPLITUDE: f32 = 100.0;

struct Job {
    utterance: Utterance,
    generation: u64,
}

/// Speech synthesis via `espeak-ng`
pub struct EspeakSynthesis {
    jobs: mpsc::UnboundedSender<Job>,
    voices: Arc<Mutex<Vec<Voice>>>,
    generation: Arc<AtomicU64>,
    cancel_tx: watch::Sender<u64>,
}

impl EspeakSynthesis {
    /// Locate an espeak binary on `PATH`
    #[must_use]
    pub fn detect() -> Option<PathBuf> {
        which::which("espeak-ng")
            .or_else(|_| which::which("espeak"))
            .ok()
    }

    /// Start the speech worker and begin loading the voice catalog
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns error if no runtime is available
    pub fn spawn(program: PathBuf, sink: SynthesisSink) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Synthesis(format!("espeak requires an async runtime: {e}")))?;

        let voices = Arc::new(Mutex::new(Vec::new()));
        let generation = Arc::new(AtomicU64::new(0));
        let (cancel_tx, cancel_rx) = watch::channel(0);
        let (jobs, job_rx) = mpsc::unbounded_channel();

        runtime.spawn(load_voices(program.clone(), Arc::clone(&voices), sink.clone()));
        runtime.spawn(run_worker(
            program.clone(),
            job_rx,
            Arc::clone(&generation),
            cancel_rx,
            sink,
        ));

        tracing::debug!(program = %program.display(), "espeak synthesis started");

        Ok(Self {
            jobs,
            voices,
            generation,
            cancel_tx,
        })
    }
}

impl SynthesisProvider for EspeakSynthesis {
    fn name(&self) -> &str {
        "espeak"
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
            .map_err(|_| Error::Synthesis("espeak worker has stopped".to_string()))
    }

    fn cancel(&mut self) {
        let next = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.cancel_tx.send_replace(next);
    }
}

/// Build the espeak command line for an utterance (text goes on stdin)
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn espeak_args(utterance: &Utterance) -> Vec<String> {
    let voice = utterance
        .voice
        .as_ref()
        .map_or_else(|| utterance.language.to_lowercase(), |v| v.id.clone());

    let words_per_minute = (BASE_WORDS_PER_MINUTE * utterance.rate).round().clamp(80.0, 450.0) as u32;
    let pitch = (BASE_PITCH * utterance.pitch).round().clamp(0.0, 99.0) as u32;
    let amplitude = (BASE_AMPLITUDE * utterance.volume).round().clamp(0.0, 200.0) as u32;

    vec![
        "-v".to_string(),
        voice,
        "-s".to_string(),
        words_per_minute.to_string(),
        "-p".to_string(),
        pitch.to_string(),
        "-a".to_string(),
        amplitude.to_string(),
        "--stdin".to_string(),
    ]
}

/// Parse `espeak-ng --voices` output
///
/// Columns: `Pty Language Age/Gender VoiceName File [Other Languages]`. The
/// language column doubles as the identifier passed to `-v`.
#[must_use]
pub fn parse_voice_list(output: &str) -> Vec<Voice> {
    output
        .lines()
        .filter(|line| !line.trim_start().starts_with("Pty"))
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 5 {
                return None;
            }
            let language = fields[1];
            let name = fields[3].replace('_', " ");
            Some(Voice::new(name, language, language))
        })
        .collect()
}

async fn load_voices(program: PathBuf, voices: Arc<Mutex<Vec<Voice>>>, sink: SynthesisSink) {
    let output = match Command::new(&program)
        .arg("--voices")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await
    {
        Ok(output) if output.status.success() => output,
        Ok(output) => {
            tracing::warn!(status = %output.status, "espeak voice listing failed");
            return;
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to run espeak voice listing");
            return;
        }
    };

    let parsed = parse_voice_list(&String::from_utf8_lossy(&output.stdout));
    tracing::debug!(count = parsed.len(), "espeak voices loaded");

    if let Ok(mut guard) = voices.lock() {
        *guard = parsed;
    }
    let _ = sink.send(SynthesisEvent::VoicesChanged);
}

async fn run_worker(
    program: PathBuf,
    mut jobs: mpsc::UnboundedReceiver<Job>,
    generation: Arc<AtomicU64>,
    mut cancel_rx: watch::Receiver<u64>,
    sink: SynthesisSink,
) {
    while let Some(job) = jobs.recv().await {
        let id = job.utterance.id;

        if job.generation != generation.load(Ordering::SeqCst) {
            let _ = sink.send(SynthesisEvent::Cancelled(id));
            continue;
        }

        let _ = sink.send(SynthesisEvent::Started(id));

        let event = tokio::select! {
            result = speak_once(&program, &job.utterance) => match result {
                Ok(()) => SynthesisEvent::Finished(id),
                Err(e) => SynthesisEvent::Failed { id, message: e.to_string() },
            },
            () = cancelled(&mut cancel_rx, job.generation) => {
                tracing::debug!(%id, "utterance cancelled");
                SynthesisEvent::Cancelled(id)
            }
        };

        let _ = sink.send(event);
    }

    tracing::debug!("espeak worker stopped");
}

/// Resolve once the generation moves past `job_generation`
async fn cancelled(cancel_rx: &mut watch::Receiver<u64>, job_generation: u64) {
    if cancel_rx
        .wait_for(|current| *current != job_generation)
        .await
        .is_err()
    {
        std::future::pending::<()>().await;
    }
}

/// Run one espeak process to completion (killed if the future is dropped)
async fn speak_once(program: &Path, utterance: &Utterance) -> Result<()> {
    let mut child = Command::new(program)
        .args(espeak_args(utterance))
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::Synthesis(format!("failed to spawn espeak: {e}")))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(utterance.text.as_bytes())
            .await
            .map_err(|e| Error::Synthesis(format!("failed to write to espeak stdin: {e}")))?;
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| Error::Synthesis(format!("espeak failed: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Synthesis(format!(
            "espeak exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(())
}
