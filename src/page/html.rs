//! Headless page model built from an HTML document

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::{ElementId, ElementRole, HostPage, ScrollBehavior, ScrollBlock};
use crate::{Error, Result};

/// Elements whose text is never rendered
const HIDDEN_TAGS: &[&str] = &["head", "script", "style", "title", "noscript", "template"];

/// Layout estimate: characters per rendered line
const CHARS_PER_LINE: usize = 80;

/// Layout estimate: pixels per rendered line
const LINE_HEIGHT: f64 = 24.0;

/// Viewport height in pixels
pub const VIEWPORT_HEIGHT: f64 = 800.0;

/// History entry for pages without a URL
const BLANK_URL: &str = "about:blank";

#[derive(Debug, Clone)]
struct PageElement {
    tag: String,
    href: Option<String>,
    top: f64,
}

/// A parsed document with simulated scrolling, history and styling
///
/// The document is parsed once; element roles, vertical offsets and the main
/// content text are computed up front. Offsets come from a simple line-based
/// layout estimate (fixed characters per line and line height). Following a
/// link pushes a history entry but keeps the same document.
#[derive(Debug, Clone)]
pub struct HtmlPage {
    elements: Vec<PageElement>,
    roles: BTreeMap<ElementRole, Vec<ElementId>>,
    title: Option<String>,
    main_text: Option<String>,
    document_height: f64,
    scroll_x: f64,
    scroll_y: f64,
    history: Vec<String>,
    cursor: usize,
    backgrounds: BTreeMap<ElementId, String>,
    activations: Vec<ElementId>,
}

impl HtmlPage {
    /// Parse a document
    ///
    /// # Errors
    ///
    /// Returns error if a role selector fails to parse
    #[allow(clippy::cast_precision_loss)]
    pub fn parse(html: &str, url: Option<&str>) -> Result<Self> {
        let document = Html::parse_document(html);

        let mut elements = Vec::new();
        let mut index = HashMap::new();
        let mut lines = 0usize;

        for node in document.root_element().descendants() {
            if let Some(el) = ElementRef::wrap(node) {
                index.insert(el.id(), ElementId(elements.len()));
                elements.push(PageElement {
                    tag: el.value().name().to_string(),
                    href: el.value().attr("href").map(String::from),
                    top: lines as f64 * LINE_HEIGHT,
                });
            } else if let Some(text) = node.value().as_text() {
                if node.parent().and_then(ElementRef::wrap).is_some_and(is_hidden) {
                    continue;
                }
                let chars: usize = text
                    .split_whitespace()
                    .map(|word| word.chars().count() + 1)
                    .sum();
                lines += chars.div_ceil(CHARS_PER_LINE);
            }
        }

        let mut roles = BTreeMap::new();
        for role in ElementRole::ALL {
            let ids = document
                .select(&selector(role.selector())?)
                .filter_map(|el| index.get(&el.id()).copied())
                .collect();
            roles.insert(role, ids);
        }

        let title = document
            .select(&selector("title")?)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty());

        let main_text = document
            .select(&selector(ElementRole::Main.selector())?)
            .next()
            .map(visible_text);

        tracing::debug!(
            elements = elements.len(),
            lines,
            has_main = main_text.is_some(),
            "page parsed"
        );

        Ok(Self {
            elements,
            roles,
            title,
            main_text,
            document_height: lines as f64 * LINE_HEIGHT,
            scroll_x: 0.0,
            scroll_y: 0.0,
            history: vec![url.unwrap_or(BLANK_URL).to_string()],
            cursor: 0,
            backgrounds: BTreeMap::new(),
            activations: Vec::new(),
        })
    }

    /// Load and parse a document from disk
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read
    pub fn from_file(path: &Path) -> Result<Self> {
        let html = std::fs::read_to_string(path)?;
        let url = std::fs::canonicalize(path)
            .ok()
            .and_then(|p| Url::from_file_path(p).ok())
            .map(String::from);

        tracing::info!(path = %path.display(), "page loaded");
        Self::parse(&html, url.as_deref())
    }

    /// A page with no content
    #[must_use]
    pub fn empty() -> Self {
        Self {
            elements: Vec::new(),
            roles: BTreeMap::new(),
            title: None,
            main_text: None,
            document_height: 0.0,
            scroll_x: 0.0,
            scroll_y: 0.0,
            history: vec![BLANK_URL.to_string()],
            cursor: 0,
            backgrounds: BTreeMap::new(),
            activations: Vec::new(),
        }
    }

    /// Document title
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Current scroll offset `(x, y)`
    #[must_use]
    pub const fn scroll_position(&self) -> (f64, f64) {
        (self.scroll_x, self.scroll_y)
    }

    /// Estimated document height in pixels
    #[must_use]
    pub const fn document_height(&self) -> f64 {
        self.document_height
    }

    /// Largest vertical offset: the last screen ends at the document bottom
    #[must_use]
    pub fn max_scroll_y(&self) -> f64 {
        (self.document_height - VIEWPORT_HEIGHT).max(0.0)
    }

    /// URL of the current history entry
    #[must_use]
    pub fn current_url(&self) -> &str {
        &self.history[self.cursor]
    }

    /// Every history entry, oldest first
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Tag name of an element
    #[must_use]
    pub fn tag(&self, id: ElementId) -> Option<&str> {
        self.elements.get(id.0).map(|e| e.tag.as_str())
    }

    /// Estimated top offset of an element
    #[must_use]
    pub fn element_top(&self, id: ElementId) -> Option<f64> {
        self.elements.get(id.0).map(|e| e.top)
    }

    /// Background colour set on an element
    #[must_use]
    pub fn background(&self, id: ElementId) -> Option<&str> {
        self.backgrounds.get(&id).map(String::as_str)
    }

    /// Elements activated so far, in order
    #[must_use]
    pub fn activations(&self) -> &[ElementId] {
        &self.activations
    }

    fn element(&self, id: ElementId) -> Result<&PageElement> {
        self.elements
            .get(id.0)
            .ok_or_else(|| Error::Page(format!("no element {id}")))
    }

    fn navigate(&mut self, url: String) {
        tracing::info!(url = %url, "navigated");
        self.history.truncate(self.cursor + 1);
        self.history.push(url);
        self.cursor += 1;
        self.scroll_x = 0.0;
        self.scroll_y = 0.0;
    }
}

impl HostPage for HtmlPage {
    fn scroll_by(&mut self, dx: f64, dy: f64, behavior: ScrollBehavior) -> Result<()> {
        self.scroll_to(self.scroll_x + dx, self.scroll_y + dy, behavior)
    }

    fn scroll_to(&mut self, x: f64, y: f64, behavior: ScrollBehavior) -> Result<()> {
        if !x.is_finite() || !y.is_finite() {
            return Err(Error::Page(format!("invalid scroll offset ({x}, {y})")));
        }

        self.scroll_x = x.max(0.0);
        self.scroll_y = y.clamp(0.0, self.max_scroll_y());
        tracing::debug!(x = self.scroll_x, y = self.scroll_y, ?behavior, "scrolled");
        Ok(())
    }

    fn history_back(&mut self) -> Result<()> {
        if self.cursor > 0 {
            self.cursor -= 1;
            tracing::debug!(url = %self.current_url(), "history back");
        }
        Ok(())
    }

    fn history_forward(&mut self) -> Result<()> {
        if self.cursor + 1 < self.history.len() {
            self.cursor += 1;
            tracing::debug!(url = %self.current_url(), "history forward");
        }
        Ok(())
    }

    fn find_all(&self, role: ElementRole) -> Result<Vec<ElementId>> {
        Ok(self.roles.get(&role).cloned().unwrap_or_default())
    }

    fn activate(&mut self, id: ElementId) -> Result<()> {
        let element = self.element(id)?;
        let link = (element.tag == "a").then(|| element.href.clone()).flatten();

        self.activations.push(id);
        tracing::debug!(element = %id, "activated");

        if let Some(href) = link {
            let target = match Url::parse(self.current_url()) {
                Ok(base) => base.join(&href),
                Err(_) => Url::parse(&href),
            }
            .map_err(|e| Error::Page(format!("cannot resolve link {href}: {e}")))?;
            self.navigate(target.into());
        }

        Ok(())
    }

    fn scroll_into_view(
        &mut self,
        id: ElementId,
        behavior: ScrollBehavior,
        block: ScrollBlock,
    ) -> Result<()> {
        let top = self.element(id)?.top;
        let bottom_aligned = top + LINE_HEIGHT - VIEWPORT_HEIGHT;

        let y = match block {
            ScrollBlock::Start => top,
            ScrollBlock::Center => top - VIEWPORT_HEIGHT / 2.0,
            ScrollBlock::End => bottom_aligned,
            ScrollBlock::Nearest if top < self.scroll_y => top,
            ScrollBlock::Nearest if top + LINE_HEIGHT > self.scroll_y + VIEWPORT_HEIGHT => {
                bottom_aligned
            }
            ScrollBlock::Nearest => self.scroll_y,
        };

        self.scroll_to(self.scroll_x, y, behavior)
    }

    fn set_background(&mut self, id: ElementId, color: &str) -> Result<()> {
        self.element(id)?;
        self.backgrounds.insert(id, color.to_string());
        Ok(())
    }

    fn main_text(&self) -> Result<Option<String>> {
        Ok(self.main_text.clone())
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Page(format!("invalid selector {css}: {e}")))
}

/// Whether an element or one of its ancestors is never rendered
fn is_hidden(el: ElementRef<'_>) -> bool {
    std::iter::once(el)
        .chain(el.ancestors().filter_map(ElementRef::wrap))
        .any(|e| HIDDEN_TAGS.contains(&e.value().name()))
}

/// Rendered text of an element with whitespace collapsed
fn visible_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();

    for node in el.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        if node.parent().and_then(ElementRef::wrap).is_some_and(is_hidden) {
            continue;
        }
        for word in text.split_whitespace() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(word);
        }
    }

    out
}
