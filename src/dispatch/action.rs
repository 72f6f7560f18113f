//! Command actions
//!
//! An action gets mutable access to the page and the feedback engine for the
//! duration of one command. Targets are looked up fresh on every call; a
//! missing target element is a no-op, not a failure.

use std::sync::Arc;

use thiserror::Error;

use crate::feedback::{VoiceConfigUpdate, VoiceFeedbackEngine};
use crate::page::{ElementRole, HostPage, ScrollBehavior, ScrollBlock};

/// Vertical distance of one scroll command, in pixels
pub const SCROLL_STEP: f64 = 600.0;

/// Rate, pitch and volume change per voice-tuning command
pub const VOICE_STEP: f32 = 0.2;

/// Background applied by the highlight command
pub const HIGHLIGHT_COLOR: &str = "yellow";

/// What an action may touch
pub struct ActionContext<'a> {
    /// The page being controlled
    pub page: &'a mut dyn HostPage,
    /// Spoken feedback and voice parameters
    pub voice: &'a mut VoiceFeedbackEngine,
}

/// Why an action failed
#[derive(Debug, Error)]
pub enum ActionError {
    /// The host page reported a failure
    #[error(transparent)]
    Page(#[from] crate::Error),

    /// A caller-registered action failed
    #[error("{0}")]
    Failed(String),
}

/// Outcome of an action
pub type ActionResult = std::result::Result<(), ActionError>;

/// Shared action callable
pub type ActionFn = Arc<dyn Fn(&mut ActionContext<'_>) -> ActionResult + Send + Sync>;

/// Scroll down one step
///
/// # Errors
///
/// Returns error if the page cannot scroll
pub fn scroll_down(ctx: &mut ActionContext<'_>) -> ActionResult {
    Ok(ctx.page.scroll_by(0.0, SCROLL_STEP, ScrollBehavior::Smooth)?)
}

/// Scroll up one step
///
/// # Errors
///
/// Returns error if the page cannot scroll
pub fn scroll_up(ctx: &mut ActionContext<'_>) -> ActionResult {
    Ok(ctx.page.scroll_by(0.0, -SCROLL_STEP, ScrollBehavior::Smooth)?)
}

/// Scroll to the top of the page
///
/// # Errors
///
/// Returns error if the page cannot scroll
pub fn scroll_to_top(ctx: &mut ActionContext<'_>) -> ActionResult {
    Ok(ctx.page.scroll_to(0.0, 0.0, ScrollBehavior::Smooth)?)
}

/// Navigate back in history
///
/// # Errors
///
/// Returns error if navigation fails
pub fn go_back(ctx: &mut ActionContext<'_>) -> ActionResult {
    Ok(ctx.page.history_back()?)
}

/// Navigate forward in history
///
/// # Errors
///
/// Returns error if navigation fails
pub fn go_forward(ctx: &mut ActionContext<'_>) -> ActionResult {
    Ok(ctx.page.history_forward()?)
}

/// Cancel all speech
///
/// # Errors
///
/// Never fails
pub fn stop_speaking(ctx: &mut ActionContext<'_>) -> ActionResult {
    ctx.voice.stop_speaking();
    Ok(())
}

/// Activate the first button or link
///
/// # Errors
///
/// Returns error if the page lookup or activation fails
pub fn click_first(ctx: &mut ActionContext<'_>) -> ActionResult {
    match ctx.page.find_first(ElementRole::Clickable)? {
        Some(id) => ctx.page.activate(id)?,
        None => tracing::debug!("no clickable element"),
    }
    Ok(())
}

/// Give every heading a highlight background
///
/// # Errors
///
/// Returns error if the page lookup or styling fails
pub fn highlight_headings(ctx: &mut ActionContext<'_>) -> ActionResult {
    let headings = ctx.page.find_all(ElementRole::Heading)?;
    for id in &headings {
        ctx.page.set_background(*id, HIGHLIGHT_COLOR)?;
    }
    tracing::debug!(count = headings.len(), "headings highlighted");
    Ok(())
}

/// Toggle reading the main content aloud
///
/// Stops instead when content is already being read.
///
/// # Errors
///
/// Returns error if the main content cannot be read from the page
pub fn read_main_content(ctx: &mut ActionContext<'_>) -> ActionResult {
    if ctx.voice.is_speaking() {
        ctx.voice.stop_speaking();
        return Ok(());
    }

    match ctx.page.main_text()? {
        Some(text) if !text.is_empty() => {
            ctx.voice.speak(&text);
        }
        _ => tracing::debug!("no main content to read"),
    }
    Ok(())
}

/// Scroll the first article into view
///
/// # Errors
///
/// Returns error if the page lookup or scroll fails
pub fn open_first_article(ctx: &mut ActionContext<'_>) -> ActionResult {
    match ctx.page.find_first(ElementRole::Article)? {
        Some(id) => ctx
            .page
            .scroll_into_view(id, ScrollBehavior::Smooth, ScrollBlock::Start)?,
        None => tracing::debug!("no article element"),
    }
    Ok(())
}

/// Raise the speech rate one step
///
/// # Errors
///
/// Never fails
pub fn speak_faster(ctx: &mut ActionContext<'_>) -> ActionResult {
    let rate = ctx.voice.config().rate() + VOICE_STEP;
    ctx.voice.configure(&VoiceConfigUpdate::new().rate(rate));
    Ok(())
}

/// Lower the speech rate one step
///
/// # Errors
///
/// Never fails
pub fn speak_slower(ctx: &mut ActionContext<'_>) -> ActionResult {
    let rate = ctx.voice.config().rate() - VOICE_STEP;
    ctx.voice.configure(&VoiceConfigUpdate::new().rate(rate));
    Ok(())
}

/// Raise the pitch one step
///
/// # Errors
///
/// Never fails
pub fn raise_pitch(ctx: &mut ActionContext<'_>) -> ActionResult {
    let pitch = ctx.voice.config().pitch() + VOICE_STEP;
    ctx.voice.configure(&VoiceConfigUpdate::new().pitch(pitch));
    Ok(())
}

/// Lower the pitch one step
///
/// # Errors
///
/// Never fails
pub fn lower_pitch(ctx: &mut ActionContext<'_>) -> ActionResult {
    let pitch = ctx.voice.config().pitch() - VOICE_STEP;
    ctx.voice.configure(&VoiceConfigUpdate::new().pitch(pitch));
    Ok(())
}

/// Raise the volume one step
///
/// # Errors
///
/// Never fails
pub fn raise_volume(ctx: &mut ActionContext<'_>) -> ActionResult {
    let volume = ctx.voice.config().volume() + VOICE_STEP;
    ctx.voice.configure(&VoiceConfigUpdate::new().volume(volume));
    Ok(())
}

/// Lower the volume one step
///
/// # Errors
///
/// Never fails
pub fn lower_volume(ctx: &mut ActionContext<'_>) -> ActionResult {
    let volume = ctx.voice.config().volume() - VOICE_STEP;
    ctx.voice.configure(&VoiceConfigUpdate::new().volume(volume));
    Ok(())
}
