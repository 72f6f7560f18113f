//! Host page capability
//!
//! Command actions read and mutate the page only through [`HostPage`]. The
//! dispatcher keeps no page state; every lookup goes back to the page.

mod html;

use std::fmt;

pub use html::{HtmlPage, VIEWPORT_HEIGHT};

use crate::Result;

/// Kinds of element a command can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementRole {
    /// Buttons and links
    Clickable,
    /// `h1` through `h6`
    Heading,
    /// `article`
    Article,
    /// The main content region
    Main,
}

impl ElementRole {
    /// Every role
    pub const ALL: [Self; 4] = [Self::Clickable, Self::Heading, Self::Article, Self::Main];

    /// CSS selector matching this role
    #[must_use]
    pub const fn selector(self) -> &'static str {
        match self {
            Self::Clickable => "button, a",
            Self::Heading => "h1, h2, h3, h4, h5, h6",
            Self::Article => "article",
            Self::Main => "main",
        }
    }
}

impl fmt::Display for ElementRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clickable => write!(f, "clickable"),
            Self::Heading => write!(f, "heading"),
            Self::Article => write!(f, "article"),
            Self::Main => write!(f, "main"),
        }
    }
}

/// Opaque handle to an element, valid for the page that returned it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub usize);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a scroll is animated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollBehavior {
    /// Animated
    #[default]
    Smooth,
    /// Jump
    Instant,
}

/// Where an element lands in the viewport after `scroll_into_view`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollBlock {
    /// Top edge
    #[default]
    Start,
    /// Middle
    Center,
    /// Bottom edge
    End,
    /// Only scroll if not already visible
    Nearest,
}

/// The page commands act on
pub trait HostPage: Send {
    /// Scroll relative to the current position
    ///
    /// # Errors
    ///
    /// Returns error if the page cannot scroll
    fn scroll_by(&mut self, dx: f64, dy: f64, behavior: ScrollBehavior) -> Result<()>;

    /// Scroll to an absolute position
    ///
    /// # Errors
    ///
    /// Returns error if the page cannot scroll
    fn scroll_to(&mut self, x: f64, y: f64, behavior: ScrollBehavior) -> Result<()>;

    /// Go back one history entry (no-op at the start of history)
    ///
    /// # Errors
    ///
    /// Returns error if navigation fails
    fn history_back(&mut self) -> Result<()>;

    /// Go forward one history entry (no-op at the end of history)
    ///
    /// # Errors
    ///
    /// Returns error if navigation fails
    fn history_forward(&mut self) -> Result<()>;

    /// All elements with `role`, in document order
    ///
    /// # Errors
    ///
    /// Returns error if the page cannot be queried
    fn find_all(&self, role: ElementRole) -> Result<Vec<ElementId>>;

    /// First element with `role` in document order
    ///
    /// # Errors
    ///
    /// Returns error if the page cannot be queried
    fn find_first(&self, role: ElementRole) -> Result<Option<ElementId>> {
        Ok(self.find_all(role)?.into_iter().next())
    }

    /// Trigger the element's default activation (click)
    ///
    /// # Errors
    ///
    /// Returns error if the element is gone or activation fails
    fn activate(&mut self, id: ElementId) -> Result<()>;

    /// Scroll so the element is visible
    ///
    /// # Errors
    ///
    /// Returns error if the element is gone
    fn scroll_into_view(
        &mut self,
        id: ElementId,
        behavior: ScrollBehavior,
        block: ScrollBlock,
    ) -> Result<()>;

    /// Set the element's background colour
    ///
    /// # Errors
    ///
    /// Returns error if the element is gone
    fn set_background(&mut self, id: ElementId, color: &str) -> Result<()>;

    /// Visible text of the main content region, `None` if there is none
    ///
    /// # Errors
    ///
    /// Returns error if the page cannot be queried
    fn main_text(&self) -> Result<Option<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_selectors() {
        assert_eq!(ElementRole::Clickable.selector(), "button, a");
        assert_eq!(ElementRole::Heading.selector(), "h1, h2, h3, h4, h5, h6");
        assert_eq!(ElementRole::Main.to_string(), "main");
    }
}
