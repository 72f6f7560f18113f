//! Composition root and event loop
//!
//! [`VoiceNavigator`] owns the recognition session, the dispatcher (with its
//! page and feedback engine) and the receiving ends of both provider channels.
//! Everything runs on one task: provider events are applied one at a time, and
//! a final transcript is fully dispatched before the next event is read.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::Result;
use crate::dispatch::{CommandDispatcher, DispatchOutcome};
use crate::feedback::VoiceInfo;
use crate::page::HostPage;
use crate::recognition::{
    RecognitionEvent, RecognitionReceiver, RecognitionSession, RunEvent, SessionState,
    TranscriptEvent,
};
use crate::synthesis::SynthesisEvent;

/// Callback invoked for every transcript, with the dispatch outcome for finals
pub type TranscriptObserver = Box<dyn FnMut(&TranscriptEvent, Option<&DispatchOutcome>) + Send>;

/// The assembled voice navigator
pub struct VoiceNavigator<P> {
    session: RecognitionSession,
    dispatcher: CommandDispatcher<P>,
    recognition_rx: RecognitionReceiver,
    synthesis_rx: mpsc::UnboundedReceiver<SynthesisEvent>,
    observer: Option<TranscriptObserver>,
}

impl<P: HostPage + 'static> VoiceNavigator<P> {
    /// Assemble from parts
    ///
    /// `recognition_rx` and `synthesis_rx` must be the receiving ends of the
    /// channels handed to the session and the synthesis provider.
    #[must_use]
    pub fn new(
        session: RecognitionSession,
        dispatcher: CommandDispatcher<P>,
        recognition_rx: RecognitionReceiver,
        synthesis_rx: mpsc::UnboundedReceiver<SynthesisEvent>,
    ) -> Self {
        Self {
            session,
            dispatcher,
            recognition_rx,
            synthesis_rx,
            observer: None,
        }
    }

    /// Register a transcript observer (e.g. for on-screen display)
    pub fn on_transcript(&mut self, observer: TranscriptObserver) {
        self.observer = Some(observer);
    }

    /// The recognition session
    #[must_use]
    pub const fn session(&self) -> &RecognitionSession {
        &self.session
    }

    /// Mutable recognition session, for start/stop controls
    pub const fn session_mut(&mut self) -> &mut RecognitionSession {
        &mut self.session
    }

    /// The command dispatcher
    #[must_use]
    pub const fn dispatcher(&self) -> &CommandDispatcher<P> {
        &self.dispatcher
    }

    /// Mutable command dispatcher
    pub const fn dispatcher_mut(&mut self) -> &mut CommandDispatcher<P> {
        &mut self.dispatcher
    }

    /// Apply one event from the current recognition run, dispatching final transcripts
    pub fn process_recognition_event(&mut self, event: RecognitionEvent) -> Option<DispatchOutcome> {
        let transcript = self.session.handle_event(event)?;
        self.route_transcript(&transcript)
    }

    /// Apply one tagged recognition event; events from earlier runs are dropped
    pub fn process_run_event(&mut self, event: RunEvent) -> Option<DispatchOutcome> {
        let transcript = self.session.handle_run_event(event)?;
        self.route_transcript(&transcript)
    }

    fn route_transcript(&mut self, transcript: &TranscriptEvent) -> Option<DispatchOutcome> {
        let outcome = transcript
            .is_final
            .then(|| self.dispatcher.handle_transcript(transcript));

        if let Some(observer) = self.observer.as_mut() {
            observer(transcript, outcome.as_ref());
        }

        outcome
    }

    /// Apply one synthesis event
    pub fn process_synthesis_event(&mut self, event: SynthesisEvent) {
        self.dispatcher.voice_mut().handle_event(event);
    }

    /// Apply any synthesis events already delivered, without waiting
    pub fn pump_synthesis_events(&mut self) {
        while let Ok(event) = self.synthesis_rx.try_recv() {
            self.process_synthesis_event(event);
        }
    }

    /// Dispatch typed command text directly, bypassing recognition
    pub fn say(&mut self, text: &str) -> DispatchOutcome {
        self.pump_synthesis_events();
        self.dispatcher.handle_command(text)
    }

    /// Listen and dispatch until shutdown, an error, or the engine ends
    ///
    /// Speech still queued when listening ends is played out before
    /// returning; a shutdown request cancels it instead. Dropping the
    /// shutdown sender counts as a request.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unsupported`] if recognition is unavailable
    pub async fn run(&mut self, mut shutdown_rx: mpsc::Receiver<()>) -> Result<()> {
        self.session.start()?;
        if !self.session.is_listening() {
            tracing::error!(error = ?self.session.error(), "recognition did not start");
            return Ok(());
        }

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("shutdown requested");
                    self.shutdown();
                    return Ok(());
                }
                Some(event) = self.synthesis_rx.recv() => {
                    self.process_synthesis_event(event);
                }
                Some(event) = self.recognition_rx.recv() => {
                    self.process_run_event(event);
                    if self.session.state() != SessionState::Listening {
                        break;
                    }
                }
            }
        }

        match self.session.error() {
            Some(error) => tracing::warn!(error, "listening ended with error"),
            None => tracing::info!("listening ended"),
        }

        tokio::select! {
            _ = shutdown_rx.recv() => self.shutdown(),
            () = self.settle() => {}
        }
        Ok(())
    }

    /// Wait until all queued speech has finished or been cancelled
    pub async fn settle(&mut self) {
        self.pump_synthesis_events();
        while self.dispatcher.voice().is_busy() {
            match self.synthesis_rx.recv().await {
                Some(event) => self.process_synthesis_event(event),
                None => break,
            }
        }
    }

    /// Wait up to `timeout` for a non-empty voice catalog
    pub async fn wait_for_voices(&mut self, timeout: Duration) -> Vec<VoiceInfo> {
        self.pump_synthesis_events();

        let wait = async {
            while self.dispatcher.voice().list_available_voices().is_empty() {
                match self.synthesis_rx.recv().await {
                    Some(event) => self.process_synthesis_event(event),
                    None => break,
                }
            }
        };
        if tokio::time::timeout(timeout, wait).await.is_err() {
            tracing::debug!(?timeout, "voice catalog still empty");
        }

        self.dispatcher.voice().list_available_voices()
    }

    /// Abort recognition and cancel speech
    pub fn shutdown(&mut self) {
        self.session.abort();
        self.dispatcher.stop_speaking();
    }
}

impl<P> std::fmt::Debug for VoiceNavigator<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceNavigator")
            .field("session", &self.session)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}
