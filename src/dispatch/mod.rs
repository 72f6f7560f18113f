//! Command dispatch
//!
//! [`CommandDispatcher`] turns transcript text into page actions and spoken
//! confirmations. Nothing below it propagates: action failures become an
//! apology, unknown text becomes a suggestion.

pub mod action;
mod registry;

use std::sync::Arc;

pub use action::{ActionContext, ActionError, ActionFn, ActionResult};
pub use registry::{CommandPattern, CommandRegistry, ShadowedPhrase, default_registry};

use crate::feedback::VoiceFeedbackEngine;
use crate::page::HostPage;
use crate::recognition::TranscriptEvent;

/// Spoken when a matched action fails
pub const ERROR_FEEDBACK: &str = "Sorry, there was an error executing that command.";

/// Spoken when no command matches
pub const NOT_UNDERSTOOD_FEEDBACK: &str =
    "Sorry, I didn't understand that. Try saying 'scroll down' or 'read this section'.";

/// What [`CommandDispatcher::handle_command`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Empty input or an interim transcript; nothing ran, nothing spoken
    Ignored,
    /// The action succeeded and its confirmation was spoken
    Executed {
        /// Matched command
        command: String,
        /// Phrase found in the transcript
        phrase: String,
        /// Confirmation spoken
        feedback: String,
    },
    /// The action failed and the apology was spoken
    Failed {
        /// Matched command
        command: String,
        /// Failure description
        error: String,
    },
    /// No command matched and the suggestion was spoken
    NotUnderstood,
}

/// Matches transcripts against a registry and runs the winning action
pub struct CommandDispatcher<P> {
    registry: CommandRegistry,
    page: P,
    voice: VoiceFeedbackEngine,
}

impl<P: HostPage + 'static> CommandDispatcher<P> {
    /// Create a dispatcher; shadowed registry phrases are logged
    #[must_use]
    pub fn new(registry: CommandRegistry, page: P, voice: VoiceFeedbackEngine) -> Self {
        for shadowed in registry.shadowed_phrases() {
            tracing::warn!(%shadowed, "unreachable command phrase");
        }
        tracing::debug!(commands = registry.len(), "command dispatcher ready");

        Self {
            registry,
            page,
            voice,
        }
    }

    /// Handle one utterance of command text
    ///
    /// Text is lowercased and trimmed; the first command with a phrase
    /// contained in it runs, then its confirmation is spoken.
    pub fn handle_command(&mut self, raw: &str) -> DispatchOutcome {
        let normalized = raw.to_lowercase().trim().to_string();
        if normalized.is_empty() {
            return DispatchOutcome::Ignored;
        }

        let Some((command, phrase)) = self.registry.find_match(&normalized) else {
            tracing::info!(text = %normalized, "command not understood");
            self.voice.announce(NOT_UNDERSTOOD_FEEDBACK);
            return DispatchOutcome::NotUnderstood;
        };

        let name = command.name().to_string();
        let phrase = phrase.to_string();
        let feedback = command.feedback().to_string();
        let action = Arc::clone(command.action());

        let mut ctx = ActionContext {
            page: &mut self.page,
            voice: &mut self.voice,
        };

        match action(&mut ctx) {
            Ok(()) => {
                tracing::info!(command = %name, phrase = %phrase, "command executed");
                self.voice.announce(&feedback);
                DispatchOutcome::Executed {
                    command: name,
                    phrase,
                    feedback,
                }
            }
            Err(e) => {
                tracing::error!(command = %name, error = %e, "error executing command");
                self.voice.announce(ERROR_FEEDBACK);
                DispatchOutcome::Failed {
                    command: name,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Dispatch a final transcript; interim transcripts are ignored
    pub fn handle_transcript(&mut self, transcript: &TranscriptEvent) -> DispatchOutcome {
        if !transcript.is_final {
            return DispatchOutcome::Ignored;
        }
        self.handle_command(&transcript.text)
    }

    /// Cancel all speech
    pub fn stop_speaking(&mut self) {
        self.voice.stop_speaking();
    }

    /// The feedback engine
    #[must_use]
    pub const fn voice(&self) -> &VoiceFeedbackEngine {
        &self.voice
    }

    /// Mutable feedback engine, for configuration and provider events
    pub const fn voice_mut(&mut self) -> &mut VoiceFeedbackEngine {
        &mut self.voice
    }

    /// The command registry
    #[must_use]
    pub const fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// The controlled page
    #[must_use]
    pub const fn page(&self) -> &P {
        &self.page
    }
}

impl<P> std::fmt::Debug for CommandDispatcher<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("registry", &self.registry)
            .field("voice", &self.voice)
            .finish_non_exhaustive()
    }
}
