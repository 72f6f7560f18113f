//! Headless page model integration tests

use std::io::Write;

use voice_nav::dispatch::action::SCROLL_STEP;
use voice_nav::page::{ElementRole, ScrollBehavior, ScrollBlock, VIEWPORT_HEIGHT};
use voice_nav::{
    CommandDispatcher, DispatchOutcome, HostPage, HtmlPage, VoiceConfig, VoiceFeedbackEngine,
    default_registry,
};

mod common;

use common::fake_voice;

/// A document tall enough to scroll: one line per paragraph, with a footer
/// a screen tall so the article can reach the top of the viewport
fn long_document(paragraphs: usize) -> String {
    let body: String = (0..paragraphs)
        .map(|i| format!("<p>Paragraph {i}</p>"))
        .collect();
    let footer = "<p>Footer note</p>".repeat(40);

    format!(
        r#"<html>
<head><title>Guide</title></head>
<body>
  <nav><a href="/home">Home</a> <button>Menu</button></nav>
  <h1>Guide</h1>
  <main>{body}<h2>Details</h2><article><h3>First story</h3><p>Story text.</p></article></main>
  <footer>{footer}</footer>
</body>
</html>"#
    )
}

#[test]
fn test_scroll_is_clamped_to_document() {
    let mut page = HtmlPage::parse(&long_document(100), None).unwrap();
    let height = page.document_height();
    let bottom = page.max_scroll_y();
    assert!(height > SCROLL_STEP * 3.0);
    assert!((bottom - (height - VIEWPORT_HEIGHT)).abs() < f64::EPSILON);

    page.scroll_by(0.0, SCROLL_STEP, ScrollBehavior::Smooth).unwrap();
    assert!((page.scroll_position().1 - SCROLL_STEP).abs() < f64::EPSILON);

    for _ in 0..20 {
        page.scroll_by(0.0, SCROLL_STEP, ScrollBehavior::Instant).unwrap();
    }
    assert!((page.scroll_position().1 - bottom).abs() < f64::EPSILON);

    page.scroll_to(0.0, -50.0, ScrollBehavior::Smooth).unwrap();
    assert_eq!(page.scroll_position(), (0.0, 0.0));

    assert!(page.scroll_by(0.0, f64::NAN, ScrollBehavior::Smooth).is_err());
}

#[test]
fn test_roles_in_document_order() {
    let page = HtmlPage::parse(&long_document(3), None).unwrap();

    let clickables = page.find_all(ElementRole::Clickable).unwrap();
    let tags: Vec<_> = clickables.iter().map(|id| page.tag(*id).unwrap()).collect();
    assert_eq!(tags, vec!["a", "button"]);

    let headings = page.find_all(ElementRole::Heading).unwrap();
    let tags: Vec<_> = headings.iter().map(|id| page.tag(*id).unwrap()).collect();
    assert_eq!(tags, vec!["h1", "h2", "h3"]);

    assert_eq!(page.find_all(ElementRole::Article).unwrap().len(), 1);
    assert_eq!(page.title(), Some("Guide"));
}

#[test]
fn test_scroll_into_view_positions_article() {
    let mut page = HtmlPage::parse(&long_document(100), None).unwrap();
    let article = page.find_first(ElementRole::Article).unwrap().unwrap();
    let top = page.element_top(article).unwrap();
    assert!(top > 0.0);

    page.scroll_into_view(article, ScrollBehavior::Smooth, ScrollBlock::Start)
        .unwrap();
    assert!((page.scroll_position().1 - top).abs() < f64::EPSILON);

    page.scroll_into_view(article, ScrollBehavior::Smooth, ScrollBlock::Nearest)
        .unwrap();
    assert!((page.scroll_position().1 - top).abs() < f64::EPSILON);
}

#[test]
fn test_link_activation_and_history() {
    let mut page =
        HtmlPage::parse(&long_document(3), Some("https://docs.example.com/guide/intro")).unwrap();
    page.scroll_by(0.0, 24.0, ScrollBehavior::Smooth).unwrap();

    let link = page.find_first(ElementRole::Clickable).unwrap().unwrap();
    page.activate(link).unwrap();
    assert_eq!(page.current_url(), "https://docs.example.com/home");
    assert_eq!(page.scroll_position(), (0.0, 0.0));
    assert_eq!(page.activations(), &[link]);

    page.history_back().unwrap();
    assert_eq!(page.current_url(), "https://docs.example.com/guide/intro");
    page.history_back().unwrap();
    assert_eq!(page.current_url(), "https://docs.example.com/guide/intro");

    page.history_forward().unwrap();
    page.history_forward().unwrap();
    assert_eq!(page.current_url(), "https://docs.example.com/home");
}

#[test]
fn test_button_activation_does_not_navigate() {
    let mut page = HtmlPage::parse("<main><button>Go</button></main>", None).unwrap();
    let button = page.find_first(ElementRole::Clickable).unwrap().unwrap();

    page.activate(button).unwrap();

    assert_eq!(page.history().len(), 1);
    assert_eq!(page.activations(), &[button]);
}

#[test]
fn test_commands_against_html_page() {
    let page = HtmlPage::parse(&long_document(100), Some("https://example.com/a/b")).unwrap();
    let (voice, log) = fake_voice();
    let mut dispatcher = CommandDispatcher::new(default_registry(), page, voice);

    dispatcher.handle_command("highlight the headings");
    let headings = dispatcher.page().find_all(ElementRole::Heading).unwrap();
    assert!(headings.iter().all(|id| dispatcher.page().background(*id) == Some("yellow")));

    dispatcher.handle_command("show article");
    let article = dispatcher.page().find_first(ElementRole::Article).unwrap().unwrap();
    assert_eq!(
        Some(dispatcher.page().scroll_position().1),
        dispatcher.page().element_top(article)
    );

    dispatcher.handle_command("go to top");
    assert_eq!(dispatcher.page().scroll_position(), (0.0, 0.0));

    dispatcher.handle_command("read aloud");
    let main = log.lock().unwrap().utterances[3].text.clone();
    assert!(main.starts_with("Paragraph 0 Paragraph 1"));
    assert!(main.ends_with("Details First story Story text."));
    assert!(!main.contains("Menu"));

    dispatcher.handle_command("click first");
    assert_eq!(dispatcher.page().current_url(), "https://example.com/home");

    assert!(matches!(
        dispatcher.handle_command("previous page"),
        DispatchOutcome::Executed { .. }
    ));
    assert_eq!(dispatcher.page().current_url(), "https://example.com/a/b");
}

#[test]
fn test_page_loaded_from_file() {
    let mut file = tempfile::Builder::new().suffix(".html").tempfile().unwrap();
    file.write_all(b"<html><body><main><p>From disk.</p></main></body></html>")
        .unwrap();

    let page = HtmlPage::from_file(file.path()).unwrap();

    assert!(page.current_url().starts_with("file://"));
    assert_eq!(page.main_text().unwrap().as_deref(), Some("From disk."));

    let voice = VoiceFeedbackEngine::silent(VoiceConfig::default());
    let mut dispatcher = CommandDispatcher::new(default_registry(), page, voice);
    assert!(matches!(dispatcher.handle_command("read"), DispatchOutcome::Executed { .. }));
}
