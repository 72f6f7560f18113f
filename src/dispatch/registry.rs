//! Command registry
//!
//! Matching is first-match-wins over registration order: a command matches
//! when any of its phrases is a substring of the normalized transcript. More
//! specific phrases must therefore be registered before general ones; see
//! [`CommandRegistry::shadowed_phrases`].

use std::fmt;
use std::sync::Arc;

use super::action::{self, ActionContext, ActionFn, ActionResult};

/// Trigger phrases bound to an action and its confirmation
#[derive(Clone)]
pub struct CommandPattern {
    name: String,
    phrases: Vec<String>,
    action: ActionFn,
    feedback: String,
}

impl CommandPattern {
    /// Create a command
    ///
    /// Phrases are lowercased and trimmed; empty and duplicate phrases are
    /// dropped.
    pub fn new<F>(name: impl Into<String>, phrases: &[&str], feedback: impl Into<String>, action: F) -> Self
    where
        F: Fn(&mut ActionContext<'_>) -> ActionResult + Send + Sync + 'static,
    {
        let mut normalized: Vec<String> = Vec::with_capacity(phrases.len());
        for phrase in phrases {
            let phrase = phrase.trim().to_lowercase();
            if !phrase.is_empty() && !normalized.contains(&phrase) {
                normalized.push(phrase);
            }
        }

        Self {
            name: name.into(),
            phrases: normalized,
            action: Arc::new(action),
            feedback: feedback.into(),
        }
    }

    /// Command name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Trigger phrases in matching order
    #[must_use]
    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    /// Confirmation spoken after the action succeeds
    #[must_use]
    pub fn feedback(&self) -> &str {
        &self.feedback
    }

    /// The bound action
    #[must_use]
    pub const fn action(&self) -> &ActionFn {
        &self.action
    }

    /// First phrase contained in `normalized`
    #[must_use]
    pub fn matches(&self, normalized: &str) -> Option<&str> {
        self.phrases
            .iter()
            .find(|p| normalized.contains(p.as_str()))
            .map(String::as_str)
    }
}

impl fmt::Debug for CommandPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandPattern")
            .field("name", &self.name)
            .field("phrases", &self.phrases)
            .field("feedback", &self.feedback)
            .finish_non_exhaustive()
    }
}

/// A phrase that can never trigger its own command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowedPhrase {
    /// Command owning the unreachable phrase
    pub command: String,
    /// The unreachable phrase
    pub phrase: String,
    /// Earlier command that always wins
    pub shadowed_by: String,
    /// Earlier phrase contained in `phrase`
    pub by_phrase: String,
}

impl fmt::Display for ShadowedPhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\"{}\" ({}) is shadowed by \"{}\" ({})",
            self.phrase, self.command, self.by_phrase, self.shadowed_by
        )
    }
}

/// Ordered command list
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: Vec<CommandPattern>,
}

impl CommandRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command (lowest priority so far)
    pub fn register(&mut self, command: CommandPattern) {
        self.commands.push(command);
    }

    /// Builder form of [`register`](Self::register)
    #[must_use]
    pub fn with(mut self, command: CommandPattern) -> Self {
        self.register(command);
        self
    }

    /// Commands in matching order
    pub fn iter(&self) -> impl Iterator<Item = &CommandPattern> {
        self.commands.iter()
    }

    /// Number of commands
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// First command with a phrase contained in `normalized`, and that phrase
    #[must_use]
    pub fn find_match(&self, normalized: &str) -> Option<(&CommandPattern, &str)> {
        self.commands
            .iter()
            .find_map(|c| c.matches(normalized).map(|phrase| (c, phrase)))
    }

    /// Phrases that an earlier command always intercepts
    #[must_use]
    pub fn shadowed_phrases(&self) -> Vec<ShadowedPhrase> {
        let mut shadowed = Vec::new();

        for (i, command) in self.commands.iter().enumerate() {
            for phrase in &command.phrases {
                let earlier = self.commands[..i]
                    .iter()
                    .find_map(|c| c.matches(phrase).map(|p| (c, p)));
                if let Some((winner, by_phrase)) = earlier {
                    shadowed.push(ShadowedPhrase {
                        command: command.name.clone(),
                        phrase: phrase.clone(),
                        shadowed_by: winner.name.clone(),
                        by_phrase: by_phrase.to_string(),
                    });
                }
            }
        }

        shadowed
    }
}

/// The built-in navigation, speech and voice-tuning commands
///
/// Stop and the voice-tuning commands come first so that "stop" is not taken
/// by "top" and "speak faster" is not taken by "speak". The lone `down` phrase
/// is over-broad ("calm down" scrolls the page) but kept for compatibility.
#[must_use]
pub fn default_registry() -> CommandRegistry {
    CommandRegistry::new()
        .with(CommandPattern::new(
            "stop",
            &["stop", "stop reading", "stop speaking"],
            "Stopping...",
            action::stop_speaking,
        ))
        .with(CommandPattern::new(
            "speak faster",
            &["speak faster", "increase speed", "faster voice"],
            "Speaking faster now",
            action::speak_faster,
        ))
        .with(CommandPattern::new(
            "speak slower",
            &["speak slower", "decrease speed", "slower voice"],
            "Speaking slower now",
            action::speak_slower,
        ))
        .with(CommandPattern::new(
            "higher pitch",
            &["higher pitch", "increase pitch"],
            "Increased pitch",
            action::raise_pitch,
        ))
        .with(CommandPattern::new(
            "lower pitch",
            &["lower pitch", "decrease pitch"],
            "Decreased pitch",
            action::lower_pitch,
        ))
        .with(CommandPattern::new(
            "increase volume",
            &["increase volume", "louder", "speak louder"],
            "Increased volume",
            action::raise_volume,
        ))
        .with(CommandPattern::new(
            "decrease volume",
            &["decrease volume", "quieter", "speak quieter"],
            "Decreased volume",
            action::lower_volume,
        ))
        .with(CommandPattern::new(
            "scroll down",
            &["go down", "move down", "down"],
            "Scrolling down...",
            action::scroll_down,
        ))
        .with(CommandPattern::new(
            "scroll up",
            &["scroll up", "move up", "go up"],
            "Scrolling up...",
            action::scroll_up,
        ))
        .with(CommandPattern::new(
            "top",
            &["top", "scroll to top", "go to top"],
            "Moving to top of page...",
            action::scroll_to_top,
        ))
        .with(CommandPattern::new(
            "back",
            &["back", "go back", "previous page"],
            "Going back...",
            action::go_back,
        ))
        .with(CommandPattern::new(
            "forward",
            &["forward", "go forward", "next page"],
            "Going forward...",
            action::go_forward,
        ))
        .with(CommandPattern::new(
            "click",
            &["click", "click first", "select first"],
            "Clicking first interactive element...",
            action::click_first,
        ))
        .with(CommandPattern::new(
            "highlight",
            &["highlight the headings", "mark headings", "highlight headings"],
            "Highlighting headings...",
            action::highlight_headings,
        ))
        .with(CommandPattern::new(
            "read",
            &["read", "read this", "read aloud", "speak"],
            "Reading content...",
            action::read_main_content,
        ))
        .with(CommandPattern::new(
            "article",
            &["article", "open article", "show article", "first article"],
            "Opening first article...",
            action::open_first_article,
        ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut ActionContext<'_>) -> ActionResult {
        Ok(())
    }

    #[test]
    fn test_phrases_normalized_and_deduplicated() {
        let command = CommandPattern::new("down", &["Go Down", " go down ", "", "DOWN"], "ok", noop);
        assert_eq!(command.phrases(), &["go down".to_string(), "down".to_string()]);
    }

    #[test]
    fn test_first_registered_command_wins() {
        let registry = CommandRegistry::new()
            .with(CommandPattern::new("general", &["stop"], "a", noop))
            .with(CommandPattern::new("specific", &["stop reading"], "b", noop));

        let (command, phrase) = registry.find_match("please stop reading").unwrap();
        assert_eq!(command.name(), "general");
        assert_eq!(phrase, "stop");
    }

    #[test]
    fn test_shadowing_report() {
        let registry = CommandRegistry::new()
            .with(CommandPattern::new("top", &["top"], "a", noop))
            .with(CommandPattern::new("stop", &["stop", "halt"], "b", noop));

        let shadowed = registry.shadowed_phrases();
        assert_eq!(shadowed.len(), 1);
        assert_eq!(shadowed[0].phrase, "stop");
        assert_eq!(shadowed[0].shadowed_by, "top");
        assert_eq!(shadowed[0].to_string(), "\"stop\" (stop) is shadowed by \"top\" (top)");
    }

    #[test]
    fn test_default_registry_has_no_shadowing() {
        let registry = default_registry();
        assert_eq!(registry.len(), 16);
        assert!(registry.shadowed_phrases().is_empty());
    }

    #[test]
    fn test_default_registry_routes_overlapping_phrases() {
        let registry = default_registry();
        let name = |text: &str| registry.find_match(text).map(|(c, _)| c.name().to_string());

        assert_eq!(name("stop").as_deref(), Some("stop"));
        assert_eq!(name("scroll to top").as_deref(), Some("top"));
        assert_eq!(name("speak faster").as_deref(), Some("speak faster"));
        assert_eq!(name("speak").as_deref(), Some("read"));
        assert_eq!(name("stop reading").as_deref(), Some("stop"));
        assert_eq!(name("calm down").as_deref(), Some("scroll down"));
        assert_eq!(name("xyz nonsense"), None);
    }
}
