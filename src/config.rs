//! Configuration types for speech synthesis and facial animation.

use crate::error::{Result, VisageError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::warn;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VisageConfig {
    /// Text-to-speech settings.
    pub tts: TtsConfig,
    /// Facial animation timing settings.
    pub animation: AnimationConfig,
    /// Persisted audio settings.
    pub storage: StorageConfig,
}

/// Compressed audio encoding requested from the TTS service.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioEncoding {
    #[default]
    Mp3,
    OggOpus,
    Linear16,
}

impl AudioEncoding {
    /// Name used by the Google Cloud TTS API.
    pub fn api_name(self) -> &'static str {
        match self {
            AudioEncoding::Mp3 => "MP3",
            AudioEncoding::OggOpus => "OGG_OPUS",
            AudioEncoding::Linear16 => "LINEAR16",
        }
    }

    /// File extension for persisted audio.
    pub fn extension(self) -> &'static str {
        match self {
            AudioEncoding::Mp3 => "mp3",
            AudioEncoding::OggOpus => "ogg",
            AudioEncoding::Linear16 => "wav",
        }
    }
}

/// Text-to-speech configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Base URL of the Cloud Text-to-Speech REST API.
    pub endpoint: String,
    /// API key, sent as the `key` query parameter.
    pub api_key: Option<String>,
    /// OAuth access token, sent as a bearer token. Takes precedence over `api_key`.
    pub access_token: Option<String>,
    /// Voice name, e.g. `en-US-Neural2-F`.
    pub voice_name: String,
    /// BCP-47 language code.
    pub language_code: String,
    /// Speech rate multiplier. Slightly below 1.0 reads more clearly.
    pub speaking_rate: f64,
    /// Pitch offset in semitones.
    pub pitch: f64,
    /// Requested audio encoding.
    pub audio_encoding: AudioEncoding,
    /// Timeout for a single synthesis request.
    pub request_timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://texttospeech.googleapis.com/v1".to_owned(),
            api_key: None,
            access_token: None,
            voice_name: "en-US-Neural2-F".to_owned(),
            language_code: "en-US".to_owned(),
            speaking_rate: 0.9,
            pitch: 0.0,
            audio_encoding: AudioEncoding::default(),
            request_timeout_secs: 30,
        }
    }
}

impl fmt::Debug for TtsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("TtsConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &redact(&self.api_key))
            .field("access_token", &redact(&self.access_token))
            .field("voice_name", &self.voice_name)
            .field("language_code", &self.language_code)
            .field("speaking_rate", &self.speaking_rate)
            .field("pitch", &self.pitch)
            .field("audio_encoding", &self.audio_encoding)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl TtsConfig {
    /// Whether any credential is configured.
    pub fn has_credentials(&self) -> bool {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        set(&self.api_key) || set(&self.access_token)
    }
}

/// Animation timing constants.
///
/// The defaults were tuned by eye against a speaking avatar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Output frame rate.
    pub fps: u32,
    /// Neutral frames appended after speech.
    pub settle_frames: usize,
    /// Estimated speaking pace at rate 1.0.
    pub words_per_second: f64,
    /// Lower bound on estimated speech duration.
    pub min_duration_secs: f64,
    /// Longest speech duration a timeline will cover. Measured lengths above
    /// this are treated as unreadable.
    pub max_duration_secs: f64,
    /// Shortest dwell per phoneme in the cycle (8 frames ≈ 0.13 s at 60 fps).
    pub min_frames_per_phoneme: usize,
    /// Phoneme steps budgeted per word.
    pub phonemes_per_word: usize,
    /// Global multiplier applied to every speech frame.
    pub damping: f32,
    /// Intensity at dwell boundaries.
    pub base_intensity: f64,
    /// Extra intensity at the middle of a dwell.
    pub intensity_swing: f64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            fps: 60,
            settle_frames: 30,
            words_per_second: 2.0,
            min_duration_secs: 0.5,
            max_duration_secs: 600.0,
            min_frames_per_phoneme: 8,
            phonemes_per_word: 3,
            damping: 0.6,
            base_intensity: 0.3,
            intensity_swing: 0.2,
        }
    }
}

/// Persisted audio configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for synthesized audio files.
    pub audio_dir: PathBuf,
    /// Prefix of the reference returned to clients (`/audio/<file>`).
    pub url_prefix: String,
    /// Timeout for writing one audio file.
    pub write_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            audio_dir: PathBuf::from("audio_files"),
            url_prefix: "/audio".to_owned(),
            write_timeout_secs: 10,
        }
    }
}

impl VisageConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| VisageError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| VisageError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/visage/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("visage").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("visage")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/visage-config/config.toml")
        }
    }

    /// Apply `SPEAKING_RATE`, `VOICE_NAME`, `VOICE_PITCH` and
    /// `GOOGLE_TTS_API_KEY` from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup. Unparseable numbers are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("SPEAKING_RATE") {
            match raw.trim().parse::<f64>() {
                Ok(rate) => self.tts.speaking_rate = rate,
                Err(e) => warn!("ignoring SPEAKING_RATE={raw:?}: {e}"),
            }
        }
        if let Some(raw) = lookup("VOICE_PITCH") {
            match raw.trim().parse::<f64>() {
                Ok(pitch) => self.tts.pitch = pitch,
                Err(e) => warn!("ignoring VOICE_PITCH={raw:?}: {e}"),
            }
        }
        if let Some(name) = lookup("VOICE_NAME").filter(|n| !n.trim().is_empty()) {
            self.tts.voice_name = name.trim().to_owned();
        }
        if let Some(key) = lookup("GOOGLE_TTS_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.tts.api_key = Some(key.trim().to_owned());
        }
    }

    /// Check values that would make synthesis or animation meaningless.
    ///
    /// # Errors
    ///
    /// Returns [`VisageError::Config`] naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        let anim = &self.animation;
        if anim.fps == 0 {
            return Err(VisageError::Config("animation.fps must be positive".into()));
        }
        if !(anim.words_per_second.is_finite() && anim.words_per_second > 0.0) {
            return Err(VisageError::Config(
                "animation.words_per_second must be positive".into(),
            ));
        }
        if !(anim.max_duration_secs.is_finite()
            && anim.max_duration_secs >= anim.min_duration_secs)
        {
            return Err(VisageError::Config(
                "animation.max_duration_secs must be finite and at least min_duration_secs"
                    .into(),
            ));
        }
        if !(0.0..=1.0).contains(&anim.damping) {
            return Err(VisageError::Config(
                "animation.damping must be within [0, 1]".into(),
            ));
        }
        if !(self.tts.speaking_rate.is_finite() && self.tts.speaking_rate > 0.0) {
            return Err(VisageError::Config(
                "tts.speaking_rate must be positive".into(),
            ));
        }
        Ok(())
    }
}
