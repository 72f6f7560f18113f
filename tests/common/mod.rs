//! Shared test utilities

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use voice_nav::page::{ElementId, ElementRole, HostPage, ScrollBehavior, ScrollBlock};
use voice_nav::recognition::{RecognitionOptions, RecognitionReceiver, RecognitionSink, RunEvent};
use voice_nav::synthesis::{SynthesisEvent, SynthesisSink, Utterance, UtteranceId, Voice};
use voice_nav::{
    CommandDispatcher, Error, RecognitionEvent, RecognitionProvider, Result, SynthesisProvider,
    VoiceConfig, VoiceFeedbackEngine, default_registry,
};

/// What a [`FakeSynthesis`] has been asked to do
#[derive(Debug, Default)]
pub struct SynthesisLog {
    pub utterances: Vec<Utterance>,
    pub cancels: usize,
    pub voices: Vec<Voice>,
}

impl SynthesisLog {
    /// Texts of every queued utterance, in order
    pub fn texts(&self) -> Vec<String> {
        self.utterances.iter().map(|u| u.text.clone()).collect()
    }

    /// The most recent utterance
    pub fn last(&self) -> Option<&Utterance> {
        self.utterances.last()
    }
}

/// Synthesis provider that records utterances and never completes them
/// on its own
pub struct FakeSynthesis {
    log: Arc<Mutex<SynthesisLog>>,
}

impl FakeSynthesis {
    pub fn new(voices: Vec<Voice>) -> (Self, Arc<Mutex<SynthesisLog>>) {
        let log = Arc::new(Mutex::new(SynthesisLog {
            voices,
            ..SynthesisLog::default()
        }));
        (Self { log: Arc::clone(&log) }, log)
    }
}

impl SynthesisProvider for FakeSynthesis {
    fn name(&self) -> &str {
        "fake"
    }

    fn voices(&self) -> Vec<Voice> {
        self.log.lock().unwrap().voices.clone()
    }

    fn speak(&mut self, utterance: Utterance) -> Result<()> {
        self.log.lock().unwrap().utterances.push(utterance);
        Ok(())
    }

    fn cancel(&mut self) {
        self.log.lock().unwrap().cancels += 1;
    }
}

/// Synthesis provider that reports every utterance finished as soon as it
/// is queued
pub struct InstantSynthesis {
    sink: SynthesisSink,
    spoken: Arc<Mutex<Vec<String>>>,
}

impl InstantSynthesis {
    pub fn new(sink: SynthesisSink) -> (Self, Arc<Mutex<Vec<String>>>) {
        let spoken = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                sink,
                spoken: Arc::clone(&spoken),
            },
            spoken,
        )
    }
}

impl SynthesisProvider for InstantSynthesis {
    fn name(&self) -> &str {
        "instant"
    }

    fn voices(&self) -> Vec<Voice> {
        vec![Voice::new("Samantha", "en-US", "samantha")]
    }

    fn speak(&mut self, utterance: Utterance) -> Result<()> {
        self.spoken.lock().unwrap().push(utterance.text.clone());
        let _ = self.sink.send(SynthesisEvent::Started(utterance.id));
        let _ = self.sink.send(SynthesisEvent::Finished(utterance.id));
        Ok(())
    }

    fn cancel(&mut self) {}
}

/// Calls made on a [`FakeRecognition`]
#[derive(Debug, Default)]
pub struct RecognitionLog {
    pub starts: Vec<RecognitionOptions>,
    pub stops: usize,
    pub aborts: usize,
    pub sink: Option<RecognitionSink>,
}

impl RecognitionLog {
    /// Deliver an event as the engine would
    pub fn emit(&self, event: RecognitionEvent) {
        self.sink
            .as_ref()
            .expect("recognition not started")
            .send(event)
            .expect("session receiver dropped");
    }
}

/// Recognition provider driven by the test through its log
pub struct FakeRecognition {
    log: Arc<Mutex<RecognitionLog>>,
    fail_start: bool,
}

impl FakeRecognition {
    pub fn new() -> (Self, Arc<Mutex<RecognitionLog>>) {
        let log = Arc::new(Mutex::new(RecognitionLog::default()));
        (
            Self {
                log: Arc::clone(&log),
                fail_start: false,
            },
            log,
        )
    }

    /// A provider whose `start` always fails
    pub fn failing() -> (Self, Arc<Mutex<RecognitionLog>>) {
        let (mut fake, log) = Self::new();
        fake.fail_start = true;
        (fake, log)
    }
}

impl RecognitionProvider for FakeRecognition {
    fn name(&self) -> &str {
        "fake"
    }

    fn start(&mut self, options: &RecognitionOptions, sink: RecognitionSink) -> Result<()> {
        if self.fail_start {
            return Err(Error::Recognition("microphone busy".to_string()));
        }
        let mut log = self.log.lock().unwrap();
        log.starts.push(options.clone());
        log.sink = Some(sink);
        Ok(())
    }

    fn stop(&mut self) {
        self.log.lock().unwrap().stops += 1;
    }

    fn abort(&mut self) {
        self.log.lock().unwrap().aborts += 1;
    }
}

/// Page call recorded by [`FakePage`]
#[derive(Debug, Clone, PartialEq)]
pub enum PageCall {
    ScrollBy(f64, f64, ScrollBehavior),
    ScrollTo(f64, f64, ScrollBehavior),
    Back,
    Forward,
    Activate(ElementId),
    ScrollIntoView(ElementId, ScrollBehavior, ScrollBlock),
    SetBackground(ElementId, String),
}

/// Page that records every call
#[derive(Debug, Default)]
pub struct FakePage {
    pub calls: Arc<Mutex<Vec<PageCall>>>,
    pub clickables: Vec<ElementId>,
    pub headings: Vec<ElementId>,
    pub articles: Vec<ElementId>,
    pub main_text: Option<String>,
    /// Fail every call with a page error
    pub broken: bool,
}

impl FakePage {
    /// A page with one of everything
    pub fn populated() -> Self {
        Self {
            clickables: vec![ElementId(1), ElementId(2)],
            headings: vec![ElementId(3), ElementId(4), ElementId(5)],
            articles: vec![ElementId(6)],
            main_text: Some("Welcome to the main content.".to_string()),
            ..Self::default()
        }
    }

    fn record(&self, call: PageCall) -> Result<()> {
        if self.broken {
            return Err(Error::Page("page unavailable".to_string()));
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

impl HostPage for FakePage {
    fn scroll_by(&mut self, dx: f64, dy: f64, behavior: ScrollBehavior) -> Result<()> {
        self.record(PageCall::ScrollBy(dx, dy, behavior))
    }

    fn scroll_to(&mut self, x: f64, y: f64, behavior: ScrollBehavior) -> Result<()> {
        self.record(PageCall::ScrollTo(x, y, behavior))
    }

    fn history_back(&mut self) -> Result<()> {
        self.record(PageCall::Back)
    }

    fn history_forward(&mut self) -> Result<()> {
        self.record(PageCall::Forward)
    }

    fn find_all(&self, role: ElementRole) -> Result<Vec<ElementId>> {
        if self.broken {
            return Err(Error::Page("page unavailable".to_string()));
        }
        Ok(match role {
            ElementRole::Clickable => self.clickables.clone(),
            ElementRole::Heading => self.headings.clone(),
            ElementRole::Article => self.articles.clone(),
            ElementRole::Main => Vec::new(),
        })
    }

    fn activate(&mut self, id: ElementId) -> Result<()> {
        self.record(PageCall::Activate(id))
    }

    fn scroll_into_view(
        &mut self,
        id: ElementId,
        behavior: ScrollBehavior,
        block: ScrollBlock,
    ) -> Result<()> {
        self.record(PageCall::ScrollIntoView(id, behavior, block))
    }

    fn set_background(&mut self, id: ElementId, color: &str) -> Result<()> {
        self.record(PageCall::SetBackground(id, color.to_string()))
    }

    fn main_text(&self) -> Result<Option<String>> {
        if self.broken {
            return Err(Error::Page("page unavailable".to_string()));
        }
        Ok(self.main_text.clone())
    }
}

/// Feedback engine over a [`FakeSynthesis`] with one English voice
pub fn fake_voice() -> (VoiceFeedbackEngine, Arc<Mutex<SynthesisLog>>) {
    let (synthesis, log) = FakeSynthesis::new(vec![Voice::new("Samantha", "en-US", "samantha")]);
    (
        VoiceFeedbackEngine::new(Box::new(synthesis), VoiceConfig::default()),
        log,
    )
}

/// Dispatcher over a populated [`FakePage`] with the default commands
pub fn fake_dispatcher() -> (
    CommandDispatcher<FakePage>,
    Arc<Mutex<Vec<PageCall>>>,
    Arc<Mutex<SynthesisLog>>,
) {
    let page = FakePage::populated();
    let calls = Arc::clone(&page.calls);
    let (voice, log) = fake_voice();
    (CommandDispatcher::new(default_registry(), page, voice), calls, log)
}

/// Complete an utterance as the provider would
pub fn finish(engine: &mut VoiceFeedbackEngine, id: UtteranceId) {
    engine.handle_event(SynthesisEvent::Finished(id));
}

/// Channel pair for recognition events
pub fn recognition_channel() -> (mpsc::UnboundedSender<RunEvent>, RecognitionReceiver) {
    mpsc::unbounded_channel()
}
