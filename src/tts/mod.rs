//! Text-to-speech capability.
//!
//! The animation core only needs encoded audio bytes back from a voice
//! service. [`SpeechSynthesizer`] is that seam; [`GoogleCloudTts`] is the
//! production backend.

mod google;

pub use google::GoogleCloudTts;

use crate::config::{AudioEncoding, TtsConfig};
use crate::error::Result;
use async_trait::async_trait;

/// Voice parameters for one synthesis request.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSettings {
    pub voice_name: String,
    pub language_code: String,
    pub speaking_rate: f64,
    pub pitch: f64,
    pub encoding: AudioEncoding,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self::from(&TtsConfig::default())
    }
}

impl From<&TtsConfig> for VoiceSettings {
    fn from(config: &TtsConfig) -> Self {
        Self {
            voice_name: config.voice_name.clone(),
            language_code: config.language_code.clone(),
            speaking_rate: config.speaking_rate,
            pitch: config.pitch,
            encoding: config.audio_encoding,
        }
    }
}

/// A service that turns text into encoded audio.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Stable backend identifier for logs.
    fn name(&self) -> &'static str;

    /// Synthesize `text`, returning audio encoded as `voice.encoding`.
    ///
    /// # Errors
    ///
    /// Returns an error if the service is unreachable, rejects the request,
    /// or returns no audio.
    async fn synthesize(&self, text: &str, voice: &VoiceSettings) -> Result<Vec<u8>>;
}
