//! Console synthesis: prints utterances instead of speaking them

use std::io::Write;

use super::{SynthesisEvent, SynthesisProvider, SynthesisSink, Utterance, Voice};
use crate::{Error, Result};

/// Writes each utterance to a text stream and completes it immediately
///
/// Used on headless machines and when no speech engine is installed.
pub struct ConsoleSynthesis {
    out: Box<dyn Write + Send>,
    sink: SynthesisSink,
    voices: Vec<Voice>,
}

impl ConsoleSynthesis {
    /// Create a console provider writing to stdout
    #[must_use]
    pub fn new(sink: SynthesisSink) -> Self {
        Self::with_writer(Box::new(std::io::stdout()), sink)
    }

    /// Create a console provider writing to the given stream
    #[must_use]
    pub fn with_writer(out: Box<dyn Write + Send>, sink: SynthesisSink) -> Self {
        let voices = vec![Voice::new("Console", "en-US", "console")];

        // Catalog is static but still announced through the event channel
        let _ = sink.send(SynthesisEvent::VoicesChanged);

        Self { out, sink, voices }
    }
}

impl SynthesisProvider for ConsoleSynthesis {
    fn name(&self) -> &str {
        "console"
    }

    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn speak(&mut self, utterance: Utterance) -> Result<()> {
        let _ = self.sink.send(SynthesisEvent::Started(utterance.id));

        writeln!(self.out, "🔊 {}", utterance.text)
            .and_then(|()| self.out.flush())
            .map_err(|e| Error::Synthesis(e.to_string()))?;

        let _ = self.sink.send(SynthesisEvent::Finished(utterance.id));
        Ok(())
    }

    fn cancel(&mut self) {}
}
