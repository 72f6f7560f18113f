//! Speech recognition ingestion
//!
//! A [`RecognitionProvider`] turns audio (or typed text) into
//! [`RecognitionEvent`]s delivered over a [`RecognitionSink`]. Every `start`
//! hands the provider a sink tagged with a fresh run number, so the owner of
//! the receiving end can route each [`RunEvent`] back into
//! [`RecognitionSession::handle_run_event`], which drops events from earlier
//! runs, keeps the listening state and yields [`TranscriptEvent`]s.

mod pipeline;
mod segmenter;
mod stt;
mod text;

#[cfg(feature = "audio")]
mod microphone;

use std::fmt;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

pub use pipeline::TranscriptionPipeline;
pub use segmenter::{SegmentEvent, UtteranceSegmenter};
pub use stt::{SpeechToText, SttProvider, Transcriber};
pub use text::TextRecognition;

#[cfg(feature = "audio")]
pub use microphone::MicrophoneRecognition;

use crate::feedback::DEFAULT_LANGUAGE;
use crate::{Error, Result};

/// Message recorded when no recognition provider exists
pub const UNSUPPORTED_MESSAGE: &str = "Speech recognition is not supported in this environment.";

/// Event tagged with the `start` call that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct RunEvent {
    /// Run number assigned by the session on `start`
    pub run: u64,
    /// The engine notification
    pub event: RecognitionEvent,
}

/// Receiving end of a session's event channel
pub type RecognitionReceiver = mpsc::UnboundedReceiver<RunEvent>;

/// Channel on which a provider reports [`RecognitionEvent`]s for one run
#[derive(Debug, Clone)]
pub struct RecognitionSink {
    tx: mpsc::UnboundedSender<RunEvent>,
    run: u64,
}

impl RecognitionSink {
    /// Sink tagging every event with `run`
    #[must_use]
    pub const fn new(tx: mpsc::UnboundedSender<RunEvent>, run: u64) -> Self {
        Self { tx, run }
    }

    /// Run number carried by events sent here
    #[must_use]
    pub const fn run(&self) -> u64 {
        self.run
    }

    /// Deliver an event
    ///
    /// # Errors
    ///
    /// Returns the tagged event if the receiver is gone
    pub fn send(
        &self,
        event: RecognitionEvent,
    ) -> std::result::Result<(), mpsc::error::SendError<RunEvent>> {
        self.tx.send(RunEvent {
            run: self.run,
            event,
        })
    }
}

/// Engine settings passed on every `start`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionOptions {
    /// BCP-47 language tag
    pub language: String,
    /// Keep listening across utterance boundaries
    pub continuous: bool,
    /// Report partial transcripts before the final one
    pub interim_results: bool,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            continuous: true,
            interim_results: true,
        }
    }
}

/// One recognition hypothesis
#[derive(Debug, Clone, PartialEq)]
pub struct Alternative {
    /// Recognized text
    pub transcript: String,
    /// Engine confidence in `[0, 1]`
    pub confidence: f32,
}

/// One spoken segment with its hypotheses, best first
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechResult {
    /// Hypotheses, best first
    pub alternatives: Vec<Alternative>,
    /// Whether the engine will not revise this segment
    pub is_final: bool,
}

impl SpeechResult {
    /// Single-alternative result with full confidence
    #[must_use]
    pub fn new(transcript: impl Into<String>, is_final: bool) -> Self {
        Self {
            alternatives: vec![Alternative {
                transcript: transcript.into(),
                confidence: 1.0,
            }],
            is_final,
        }
    }

    /// Best hypothesis text
    #[must_use]
    pub fn transcript(&self) -> Option<&str> {
        self.alternatives.first().map(|a| a.transcript.as_str())
    }
}

/// Notifications from a recognition engine
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEvent {
    /// Updated results for the session so far; the last entry is the newest segment
    Result {
        /// All segments recognized in this session
        results: Vec<SpeechResult>,
    },
    /// Engine failure
    Error {
        /// Short machine-readable code (e.g. `network`, `no-speech`)
        code: String,
        /// Human-readable detail
        message: String,
    },
    /// The engine stopped listening
    End,
}

impl RecognitionEvent {
    /// Engine error event
    #[must_use]
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Transcript surfaced to the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEvent {
    /// Text of the newest segment
    pub text: String,
    /// Final transcripts are dispatched; interim ones only update display
    pub is_final: bool,
    /// When the session processed the event
    pub received_at: DateTime<Utc>,
}

/// Speech-to-text engine
///
/// Implementations deliver events in order through the sink passed to
/// `start`. `stop` lets the current utterance finish and ends with
/// [`RecognitionEvent::End`]; `abort` drops everything with no further events.
/// Neither may fail when the engine is not running. `start` right after
/// `stop` must begin a new run even if the previous one has not wound down.
pub trait RecognitionProvider: Send {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// Begin listening
    ///
    /// # Errors
    ///
    /// Returns error if the engine cannot start
    fn start(&mut self, options: &RecognitionOptions, sink: RecognitionSink) -> Result<()>;

    /// Finish the current utterance and stop
    fn stop(&mut self);

    /// Stop immediately, discarding in-flight recognition
    fn abort(&mut self);
}

/// Listening state of a [`RecognitionSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not listening
    Idle,
    /// Engine running
    Listening,
    /// Not listening, with an error message retained
    Error,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Listening => write!(f, "listening"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Start/stop lifecycle and transcript state for one listening surface
pub struct RecognitionSession {
    provider: Option<Box<dyn RecognitionProvider>>,
    options: RecognitionOptions,
    events: mpsc::UnboundedSender<RunEvent>,
    run: u64,
    state: SessionState,
    recognized_text: String,
    error: Option<String>,
    aborted: bool,
}

impl RecognitionSession {
    /// Create a session
    ///
    /// `provider` is `None` when the environment has no recognition capability;
    /// the session then records [`UNSUPPORTED_MESSAGE`] and never starts.
    /// `events` is the sending half of the channel whose receiver feeds
    /// [`handle_run_event`](Self::handle_run_event).
    #[must_use]
    pub fn new(
        provider: Option<Box<dyn RecognitionProvider>>,
        options: RecognitionOptions,
        events: mpsc::UnboundedSender<RunEvent>,
    ) -> Self {
        let error = if let Some(provider) = &provider {
            tracing::debug!(
                provider = provider.name(),
                language = %options.language,
                continuous = options.continuous,
                interim = options.interim_results,
                "recognition session created"
            );
            None
        } else {
            tracing::warn!("{UNSUPPORTED_MESSAGE}");
            Some(UNSUPPORTED_MESSAGE.to_string())
        };

        Self {
            state: if error.is_some() {
                SessionState::Error
            } else {
                SessionState::Idle
            },
            provider,
            options,
            events,
            run: 0,
            recognized_text: String::new(),
            error,
            aborted: false,
        }
    }

    /// Begin listening
    ///
    /// A no-op while already listening or after [`abort`](Self::abort). An
    /// engine failure to start is recorded as the session error rather than
    /// returned; a successful start clears any earlier error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unsupported`] when no provider exists
    pub fn start(&mut self) -> Result<()> {
        let Some(provider) = self.provider.as_mut() else {
            return Err(Error::Unsupported);
        };

        if self.aborted || self.state == SessionState::Listening {
            return Ok(());
        }

        self.run += 1;
        let sink = RecognitionSink::new(self.events.clone(), self.run);

        match provider.start(&self.options, sink) {
            Ok(()) => {
                self.state = SessionState::Listening;
                self.error = None;
                tracing::info!(provider = provider.name(), run = self.run, "listening");
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to start recognition");
                self.error = Some(e.to_string());
                self.state = SessionState::Error;
            }
        }

        Ok(())
    }

    /// Ask the engine to finish the current utterance and go idle
    ///
    /// Safe to call when already idle.
    pub fn stop(&mut self) {
        if self.state != SessionState::Listening {
            return;
        }

        if let Some(provider) = self.provider.as_mut() {
            provider.stop();
        }
        self.state = SessionState::Idle;
        tracing::debug!("recognition stopped");
    }

    /// Discard in-flight recognition; every later event is ignored
    pub fn abort(&mut self) {
        if self.aborted {
            return;
        }

        if let Some(provider) = self.provider.as_mut() {
            provider.abort();
        }
        self.aborted = true;
        if self.state == SessionState::Listening {
            self.state = SessionState::Idle;
        }
        tracing::debug!("recognition aborted");
    }

    /// Apply a tagged engine event, ignoring those from earlier runs
    pub fn handle_run_event(&mut self, event: RunEvent) -> Option<TranscriptEvent> {
        if event.run != self.run {
            tracing::trace!(run = event.run, current = self.run, "stale recognition event");
            return None;
        }

        self.handle_event(event.event)
    }

    /// Apply an engine event from the current run
    ///
    /// Returns the transcript for result events. The newest segment is the
    /// last entry of the result list; its best alternative replaces
    /// `recognized_text`. An engine error stops the provider, and results are
    /// dropped until the next successful [`start`](Self::start).
    pub fn handle_event(&mut self, event: RecognitionEvent) -> Option<TranscriptEvent> {
        if self.aborted {
            return None;
        }

        match event {
            RecognitionEvent::Result { results } => {
                if self.state == SessionState::Error {
                    return None;
                }

                let latest = results.last()?;
                let text = latest.transcript()?.to_string();

                tracing::trace!(text = %text, is_final = latest.is_final, "transcript");
                self.recognized_text.clone_from(&text);

                Some(TranscriptEvent {
                    text,
                    is_final: latest.is_final,
                    received_at: Utc::now(),
                })
            }
            RecognitionEvent::Error { code, message } => {
                tracing::warn!(code = %code, message = %message, "recognition error");
                if let (SessionState::Listening, Some(provider)) =
                    (self.state, self.provider.as_mut())
                {
                    provider.stop();
                }
                self.error = Some(format!("Recognition error: {code}"));
                self.state = SessionState::Error;
                None
            }
            RecognitionEvent::End => {
                if self.state == SessionState::Listening {
                    self.state = SessionState::Idle;
                }
                tracing::debug!(state = %self.state, "recognition ended");
                None
            }
        }
    }

    /// Current listening state
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the engine is running
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.state == SessionState::Listening
    }

    /// Whether a provider exists
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        self.provider.is_some()
    }

    /// Whether [`abort`](Self::abort) has been called
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Most recent transcript, interim or final
    #[must_use]
    pub fn recognized_text(&self) -> &str {
        &self.recognized_text
    }

    /// Retained error message
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Run number of the latest `start`; zero before the first
    #[must_use]
    pub const fn run(&self) -> u64 {
        self.run
    }

    /// Engine settings
    #[must_use]
    pub const fn options(&self) -> &RecognitionOptions {
        &self.options
    }
}

impl Drop for RecognitionSession {
    fn drop(&mut self) {
        if self.state == SessionState::Listening {
            self.abort();
        }
    }
}

impl fmt::Debug for RecognitionSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecognitionSession")
            .field("provider", &self.provider.as_ref().map(|p| p.name()))
            .field("state", &self.state)
            .field("run", &self.run)
            .field("recognized_text", &self.recognized_text)
            .field("error", &self.error)
            .field("aborted", &self.aborted)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = RecognitionOptions::default();
        assert_eq!(options.language, "en-US");
        assert!(options.continuous);
        assert!(options.interim_results);
    }

    #[test]
    fn test_unsupported_is_sticky() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut session = RecognitionSession::new(None, RecognitionOptions::default(), tx);

        assert!(!session.is_supported());
        assert_eq!(session.error(), Some(UNSUPPORTED_MESSAGE));
        assert!(matches!(session.start(), Err(Error::Unsupported)));
        assert!(matches!(session.start(), Err(Error::Unsupported)));
        assert!(!session.is_listening());
    }

    #[test]
    fn test_empty_results_ignored() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut session = RecognitionSession::new(None, RecognitionOptions::default(), tx);

        let event = RecognitionEvent::Result { results: vec![] };
        assert!(session.handle_event(event).is_none());
        assert_eq!(session.recognized_text(), "");
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::Listening.to_string(), "listening");
        assert_eq!(SessionState::Error.to_string(), "error");
    }
}
