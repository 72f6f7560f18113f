use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use voice_nav::config::{RecognitionBackend, SynthesisBackend};
use voice_nav::recognition::TextRecognition;
use voice_nav::synthesis::{ConsoleSynthesis, EspeakSynthesis, SynthesisSink};
use voice_nav::{
    CommandDispatcher, Config, DispatchOutcome, HtmlPage, RecognitionProvider, RecognitionSession,
    SynthesisProvider, VoiceConfigUpdate, VoiceFeedbackEngine, VoiceNavigator, default_registry,
};

/// How long `voices` waits for the catalog to load
const VOICE_CATALOG_TIMEOUT: Duration = Duration::from_secs(5);

/// Voicenav - Navigate a page hands-free with voice commands
#[derive(Parser)]
#[command(name = "voicenav", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// HTML file to control
    #[arg(long, global = true)]
    page: Option<PathBuf>,

    /// Voice name for spoken feedback
    #[arg(long, global = true)]
    voice: Option<String>,

    /// Speech rate (0.5 to 2.0)
    #[arg(long, global = true)]
    rate: Option<f32>,

    /// Pitch (0.5 to 2.0)
    #[arg(long, global = true)]
    pitch: Option<f32>,

    /// Volume (0.2 to 1.0)
    #[arg(long, global = true)]
    volume: Option<f32>,

    /// Recognition and synthesis language (e.g. "en-US")
    #[arg(long, global = true)]
    lang: Option<String>,

    /// Synthesis backend: auto, espeak, console or cloud
    #[arg(long, global = true)]
    synthesis: Option<SynthesisBackend>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Listen for commands until interrupted (default)
    Listen,
    /// Dispatch one command as if it had been spoken
    Say {
        /// Command text
        text: String,
    },
    /// List the synthesis voices
    Voices,
    /// List the recognized commands and their phrases
    Commands,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,voice_nav=info",
        1 => "info,voice_nav=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(mut cli: Cli) -> anyhow::Result<()> {
    match cli.command.take().unwrap_or(Command::Listen) {
        Command::Commands => {
            print_commands();
            Ok(())
        }
        Command::Listen => listen(&mut load_navigator(&cli, true)?).await,
        Command::Say { text } => {
            let mut navigator = load_navigator(&cli, false)?;
            let outcome = navigator.say(&text);
            report(&outcome);
            navigator.settle().await;
            Ok(())
        }
        Command::Voices => {
            let mut navigator = load_navigator(&cli, false)?;
            let voices = navigator.wait_for_voices(VOICE_CATALOG_TIMEOUT).await;
            if voices.is_empty() {
                println!("No voices available");
            }
            for voice in voices {
                println!("{:<32} {}", voice.name, voice.language);
            }
            Ok(())
        }
    }
}

/// Load configuration, apply flags and assemble the navigator
fn load_navigator(cli: &Cli, listening: bool) -> anyhow::Result<VoiceNavigator<HtmlPage>> {
    let mut config = Config::load()?;
    apply_overrides(&mut config, cli);
    tracing::debug!(?config, "loaded configuration");

    build_navigator(config, listening)
}

/// Apply command-line flags over the loaded configuration
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(path) = &cli.page {
        config.page_path = Some(path.clone());
    }
    if let Some(backend) = cli.synthesis {
        config.synthesis_backend = backend;
    }
    if let Some(lang) = &cli.lang {
        config.recognition.language.clone_from(lang);
    }

    let update = VoiceConfigUpdate {
        voice_name: cli.voice.clone(),
        rate: cli.rate,
        pitch: cli.pitch,
        volume: cli.volume,
        language: cli.lang.clone(),
    };
    if !update.is_empty() {
        config.voice = config.voice.merged(&update);
    }
}

fn build_navigator(mut config: Config, listening: bool) -> anyhow::Result<VoiceNavigator<HtmlPage>> {
    let page = match &config.page_path {
        Some(path) => HtmlPage::from_file(path)?,
        None => HtmlPage::empty(),
    };
    tracing::info!(url = page.current_url(), title = ?page.title(), "page loaded");

    let (synthesis_tx, synthesis_rx) = mpsc::unbounded_channel();
    let synthesis = build_synthesis(&mut config, synthesis_tx)?;
    let voice = VoiceFeedbackEngine::new(synthesis, config.voice.clone());

    let (recognition_tx, recognition_rx) = mpsc::unbounded_channel();
    let provider: Box<dyn RecognitionProvider> = if listening {
        build_recognition(&mut config)?
    } else {
        Box::new(TextRecognition::stdin())
    };
    let session = RecognitionSession::new(Some(provider), config.recognition.clone(), recognition_tx);

    let dispatcher = CommandDispatcher::new(default_registry(), page, voice);
    Ok(VoiceNavigator::new(session, dispatcher, recognition_rx, synthesis_rx))
}

fn build_synthesis(
    config: &mut Config,
    sink: SynthesisSink,
) -> anyhow::Result<Box<dyn SynthesisProvider>> {
    let provider: Box<dyn SynthesisProvider> = match config.synthesis_backend {
        SynthesisBackend::Auto => match EspeakSynthesis::detect() {
            Some(program) => Box::new(EspeakSynthesis::spawn(program, sink)?),
            None => {
                tracing::info!("espeak-ng not found, printing feedback to the console");
                Box::new(ConsoleSynthesis::new(sink))
            }
        },
        SynthesisBackend::Espeak => {
            let program = EspeakSynthesis::detect()
                .ok_or_else(|| anyhow::anyhow!("espeak-ng not found in PATH"))?;
            Box::new(EspeakSynthesis::spawn(program, sink)?)
        }
        SynthesisBackend::Console => Box::new(ConsoleSynthesis::new(sink)),
        SynthesisBackend::Cloud => cloud_synthesis(config, sink)?,
    };

    tracing::info!(backend = provider.name(), "speech synthesis ready");
    Ok(provider)
}

#[cfg(feature = "audio")]
fn cloud_synthesis(
    config: &mut Config,
    sink: SynthesisSink,
) -> anyhow::Result<Box<dyn SynthesisProvider>> {
    use secrecy::SecretString;
    use voice_nav::synthesis::{CloudSynthesis, TextToSpeech, TtsProvider};

    let tts = match config.tts.provider {
        TtsProvider::OpenAI => TextToSpeech::new_openai(
            config.api_keys.openai.take().unwrap_or_else(|| SecretString::from("")),
            config.tts.model.clone(),
            config.tts.voice.clone(),
        )?,
        TtsProvider::ElevenLabs => TextToSpeech::new_elevenlabs(
            config.api_keys.elevenlabs.take().unwrap_or_else(|| SecretString::from("")),
            config.tts.model.clone(),
            config.tts.voice.clone(),
        )?,
    };
    Ok(Box::new(CloudSynthesis::spawn(tts, sink)?))
}

#[cfg(not(feature = "audio"))]
fn cloud_synthesis(
    _config: &mut Config,
    _sink: SynthesisSink,
) -> anyhow::Result<Box<dyn SynthesisProvider>> {
    anyhow::bail!("cloud synthesis requires the `audio` feature")
}

fn build_recognition(config: &mut Config) -> anyhow::Result<Box<dyn RecognitionProvider>> {
    match config.recognition_backend {
        RecognitionBackend::Text => Ok(Box::new(TextRecognition::stdin())),
        RecognitionBackend::Microphone => microphone_recognition(config),
    }
}

#[cfg(feature = "audio")]
fn microphone_recognition(config: &mut Config) -> anyhow::Result<Box<dyn RecognitionProvider>> {
    use std::sync::Arc;

    use secrecy::SecretString;
    use voice_nav::recognition::{MicrophoneRecognition, SpeechToText, SttProvider};

    let stt = match config.stt.provider {
        SttProvider::Whisper => SpeechToText::new_whisper(
            config.api_keys.openai.take().unwrap_or_else(|| SecretString::from("")),
            config.stt.model.clone(),
            &config.recognition.language,
        )?,
        SttProvider::Deepgram => SpeechToText::new_deepgram(
            config.api_keys.deepgram.take().unwrap_or_else(|| SecretString::from("")),
            config.stt.model.clone(),
            &config.recognition.language,
        )?,
    };
    Ok(Box::new(MicrophoneRecognition::new(Arc::new(stt))))
}

#[cfg(not(feature = "audio"))]
fn microphone_recognition(_config: &mut Config) -> anyhow::Result<Box<dyn RecognitionProvider>> {
    anyhow::bail!("microphone recognition requires the `audio` feature")
}

async fn listen(navigator: &mut VoiceNavigator<HtmlPage>) -> anyhow::Result<()> {
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(()).await;
        }
    });

    navigator.on_transcript(Box::new(|transcript, outcome| {
        if let Some(outcome) = outcome {
            println!("> {}", transcript.text);
            report(outcome);
        } else {
            tracing::debug!(text = %transcript.text, "interim transcript");
        }
    }));

    tracing::info!(
        language = %navigator.session().options().language,
        "listening for commands (Ctrl-C to quit)"
    );
    navigator.run(shutdown_rx).await?;

    Ok(())
}

fn report(outcome: &DispatchOutcome) {
    match outcome {
        DispatchOutcome::Ignored => {}
        DispatchOutcome::Executed { command, phrase, .. } => {
            tracing::debug!(%command, %phrase, "dispatched");
        }
        DispatchOutcome::Failed { command, error } => {
            eprintln!("{command} failed: {error}");
        }
        DispatchOutcome::NotUnderstood => {
            eprintln!("command not understood");
        }
    }
}

fn print_commands() {
    let registry = default_registry();

    for command in registry.iter() {
        println!("{}", command.name());
        println!("  says:    {}", command.feedback());
        println!("  phrases: {}", command.phrases().join(", "));
    }

    for shadowed in registry.shadowed_phrases() {
        println!("warning: {shadowed}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_commands_listing_skips_configuration() {
        let cli = Cli::parse_from(["voicenav", "--synthesis", "cloud", "commands"]);
        assert!(run(cli).await.is_ok());
    }
}
