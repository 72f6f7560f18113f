//! Cloud text-to-speech (TTS) client

use secrecy::{ExposeSecret, SecretString};

use super::Voice;
use crate::{Error, Result};

/// Voices offered by the `OpenAI` speech endpoint
const OPENAI_VOICES: &[&str] = &["alloy", "echo", "fable", "onyx", "nova", "shimmer"];

/// TTS provider backend
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TtsProvider {
    /// `OpenAI` `/v1/audio/speech`
    OpenAI,
    /// `ElevenLabs` text-to-speech
    ElevenLabs,
}

/// Response from the `ElevenLabs` voice listing API
#[derive(serde::Deserialize)]
struct ElevenLabsVoices {
    voices: Vec<ElevenLabsVoice>,
}

#[derive(serde::Deserialize)]
struct ElevenLabsVoice {
    voice_id: String,
    name: String,
    #[serde(default)]
    fine_tuning: Option<ElevenLabsFineTuning>,
}

#[derive(serde::Deserialize)]
struct ElevenLabsFineTuning {
    #[serde(default)]
    language: Option<String>,
}

/// Synthesizes speech from text over HTTP
pub struct TextToSpeech {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    default_voice: String,
    provider: TtsProvider,
}

impl TextToSpeech {
    /// Create a new TTS instance using `OpenAI`
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_openai(api_key: SecretString, model: String, default_voice: String) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            default_voice,
            provider: TtsProvider::OpenAI,
        })
    }

    /// Create a new TTS instance using `ElevenLabs`
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_elevenlabs(
        api_key: SecretString,
        model: String,
        default_voice: String,
    ) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config(
                "ElevenLabs API key required for TTS".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            default_voice,
            provider: TtsProvider::ElevenLabs,
        })
    }

    /// Which backend this client talks to
    #[must_use]
    pub const fn provider(&self) -> TtsProvider {
        self.provider
    }

    /// Fetch the voice catalog
    ///
    /// # Errors
    ///
    /// Returns error if the listing request fails
    pub async fn list_voices(&self) -> Result<Vec<Voice>> {
        match self.provider {
            TtsProvider::OpenAI => Ok(OPENAI_VOICES
                .iter()
                .map(|name| Voice::new(*name, "en", *name))
                .collect()),
            TtsProvider::ElevenLabs => self.list_elevenlabs_voices().await,
        }
    }

    /// Synthesize text to speech
    ///
    /// `voice` is a provider voice id; `None` uses the configured default.
    /// `speed` is only honored by `OpenAI`.
    ///
    /// # Returns
    ///
    /// Audio bytes (MP3 format)
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    pub async fn synthesize(&self, text: &str, voice: Option<&str>, speed: f32) -> Result<Vec<u8>> {
        let voice = voice.unwrap_or(&self.default_voice);
        match self.provider {
            TtsProvider::OpenAI => self.synthesize_openai(text, voice, speed).await,
            TtsProvider::ElevenLabs => self.synthesize_elevenlabs(text, voice).await,
        }
    }

    /// Synthesize using `OpenAI` TTS
    async fn synthesize_openai(&self, text: &str, voice: &str, speed: f32) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice,
            speed,
        };

        tracing::debug!(voice, speed, chars = text.len(), "requesting OpenAI speech");

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/speech")
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("OpenAI TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }

    /// Synthesize using `ElevenLabs` TTS
    async fn synthesize_elevenlabs(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct ElevenLabsRequest<'a> {
            text: &'a str,
            model_id: &'a str,
        }

        let url = format!("https://api.elevenlabs.io/v1/text-to-speech/{voice}");

        let request = ElevenLabsRequest {
            text,
            model_id: &self.model,
        };

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("ElevenLabs TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }

    async fn list_elevenlabs_voices(&self) -> Result<Vec<Voice>> {
        let response = self
            .client
            .get("https://api.elevenlabs.io/v1/voices")
            .header("xi-api-key", self.api_key.expose_secret())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::Tts(format!("ElevenLabs voice listing error {status}")));
        }

        let listing: ElevenLabsVoices = response.json().await?;
        Ok(listing
            .voices
            .into_iter()
            .map(|v| {
                let language = v
                    .fine_tuning
                    .and_then(|f| f.language)
                    .unwrap_or_else(|| "en".to_string());
                Voice::new(v.name, language, v.voice_id)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_rejected() {
        let result = TextToSpeech::new_openai(
            SecretString::from(String::new()),
            "tts-1".to_string(),
            "alloy".to_string(),
        );
        assert!(matches!(result, Err(Error::Config(_))));

        let result = TextToSpeech::new_elevenlabs(
            SecretString::from(String::new()),
            "eleven_monolingual_v1".to_string(),
            "voice".to_string(),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_openai_voices_are_static() {
        let tts = TextToSpeech::new_openai(
            SecretString::from("sk-test".to_string()),
            "tts-1".to_string(),
            "alloy".to_string(),
        )
        .unwrap();

        let voices = tts.list_voices().await.unwrap();
        assert_eq!(voices.len(), OPENAI_VOICES.len());
        assert_eq!(tts.provider(), TtsProvider::OpenAI);
        assert!(voices.iter().all(|v| v.language == "en"));
    }
}
