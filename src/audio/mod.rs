//! Audio plumbing for the microphone and cloud speech adapters
//!
//! WAV encoding is always available (it feeds the STT upload). Device capture,
//! playback and MP3 decoding need the `audio` feature.

#[cfg(feature = "audio")]
mod capture;
#[cfg(feature = "audio")]
mod playback;
mod wav;

#[cfg(feature = "audio")]
pub use capture::AudioCapture;
#[cfg(feature = "audio")]
pub use playback::{AudioPlayback, decode_mp3};
pub use wav::{SAMPLE_RATE, samples_to_wav};
