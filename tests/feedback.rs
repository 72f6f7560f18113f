//! Voice feedback engine integration tests

use voice_nav::synthesis::{SynthesisEvent, Voice};
use voice_nav::{VoiceConfig, VoiceConfigUpdate, VoiceFeedbackEngine};

mod common;

use common::{FakeSynthesis, finish};

fn catalog() -> Vec<Voice> {
    vec![
        Voice::new("Thomas", "fr-FR", "fr"),
        Voice::new("Karen", "en-AU", "en-au"),
        Voice::new("Samantha", "en-US", "en-us"),
    ]
}

#[test]
fn test_default_voice_selected_on_first_catalog() {
    let (synthesis, _log) = FakeSynthesis::new(catalog());
    let engine = VoiceFeedbackEngine::new(Box::new(synthesis), VoiceConfig::default());

    assert_eq!(engine.config().voice_name(), "Karen");
    assert_eq!(engine.list_available_voices().len(), 3);
    assert_eq!(engine.list_available_voices()[0].language, "fr-FR");
}

#[test]
fn test_catalog_loaded_later() {
    let (synthesis, log) = FakeSynthesis::new(Vec::new());
    let mut engine = VoiceFeedbackEngine::new(Box::new(synthesis), VoiceConfig::default());

    assert!(engine.list_available_voices().is_empty());
    assert_eq!(engine.config().voice_name(), "");

    let id = engine.speak("before voices").unwrap();
    assert!(log.lock().unwrap().utterances[0].voice.is_none());
    finish(&mut engine, id);

    log.lock().unwrap().voices = vec![Voice::new("Anna", "de-DE", "de")];
    engine.handle_event(SynthesisEvent::VoicesChanged);

    assert_eq!(engine.config().voice_name(), "Anna");
    engine.speak("after voices");
    let voice = log.lock().unwrap().last().unwrap().voice.clone();
    assert_eq!(voice.unwrap().id, "de");
}

#[test]
fn test_explicit_voice_kept_when_missing_from_catalog() {
    let (synthesis, log) = FakeSynthesis::new(catalog());
    let config = VoiceConfig::default().merged(&VoiceConfigUpdate::new().voice_name("Zarvox"));
    let mut engine = VoiceFeedbackEngine::new(Box::new(synthesis), config);

    assert_eq!(engine.config().voice_name(), "Zarvox");

    engine.speak("hello");
    assert!(log.lock().unwrap().last().unwrap().voice.is_none());
}

#[test]
fn test_utterance_carries_current_parameters() {
    let (synthesis, log) = FakeSynthesis::new(catalog());
    let mut engine = VoiceFeedbackEngine::new(Box::new(synthesis), VoiceConfig::default());

    engine.configure(
        &VoiceConfigUpdate::new()
            .voice_name("Samantha")
            .rate(5.0)
            .volume(0.5)
            .language("en-GB"),
    );
    engine.announce("configured");

    let log = log.lock().unwrap();
    let utterance = log.last().unwrap();
    assert_eq!(utterance.text, "configured");
    assert_eq!(utterance.voice.as_ref().unwrap().name, "Samantha");
    assert!((utterance.rate - 2.0).abs() < f32::EPSILON);
    assert!((utterance.pitch - 1.0).abs() < f32::EPSILON);
    assert!((utterance.volume - 0.5).abs() < f32::EPSILON);
    assert_eq!(utterance.language, "en-GB");
}

#[test]
fn test_speaking_state_follows_completion_events() {
    let (synthesis, _log) = FakeSynthesis::new(catalog());
    let mut engine = VoiceFeedbackEngine::new(Box::new(synthesis), VoiceConfig::default());

    let first = engine.speak("one").unwrap();
    let second = engine.speak("two").unwrap();
    assert!(engine.is_speaking());
    assert_eq!(engine.last_feedback(), Some("two"));

    engine.handle_event(SynthesisEvent::Started(first));
    finish(&mut engine, first);
    assert!(engine.is_speaking());

    engine.handle_event(SynthesisEvent::Failed {
        id: second,
        message: "device lost".to_string(),
    });
    assert!(!engine.is_speaking());
    assert!(!engine.is_busy());
}

#[test]
fn test_announce_does_not_set_speaking() {
    let (synthesis, _log) = FakeSynthesis::new(catalog());
    let mut engine = VoiceFeedbackEngine::new(Box::new(synthesis), VoiceConfig::default());

    let id = engine.announce("Scrolling down...").unwrap();
    assert!(!engine.is_speaking());
    assert!(engine.is_busy());

    engine.handle_event(SynthesisEvent::Cancelled(id));
    assert!(!engine.is_busy());
}

#[test]
fn test_stop_speaking_is_idempotent() {
    let (synthesis, log) = FakeSynthesis::new(catalog());
    let mut engine = VoiceFeedbackEngine::new(Box::new(synthesis), VoiceConfig::default());

    engine.stop_speaking();
    assert!(!engine.is_speaking());

    let id = engine.speak("long article").unwrap();
    engine.announce("Reading content...");
    engine.stop_speaking();
    engine.stop_speaking();

    assert!(!engine.is_speaking());
    assert!(!engine.is_busy());
    assert_eq!(log.lock().unwrap().cancels, 3);

    // late completion of a cancelled utterance changes nothing
    finish(&mut engine, id);
    assert!(!engine.is_speaking());
}
