//! Google Cloud Text-to-Speech REST backend.

use super::{SpeechSynthesizer, VoiceSettings};
use crate::config::TtsConfig;
use crate::error::{Result, VisageError};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Maximum request size accepted by the API (5000 bytes of input text).
const MAX_TTS_INPUT_BYTES: usize = 5_000;

#[derive(Debug, Clone)]
enum Auth {
    ApiKey(String),
    Bearer(String),
}

/// Client for `POST {endpoint}/text:synthesize`.
#[derive(Debug, Clone)]
pub struct GoogleCloudTts {
    endpoint: String,
    auth: Auth,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfigBody,
}

#[derive(Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfigBody {
    audio_encoding: &'static str,
    speaking_rate: f64,
    pitch: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    #[serde(default)]
    audio_content: Option<String>,
}

impl GoogleCloudTts {
    /// Build a client from config.
    ///
    /// # Errors
    ///
    /// Returns [`VisageError::Config`] if no credential is configured or the
    /// HTTP client cannot be built.
    pub fn new(config: &TtsConfig) -> Result<Self> {
        let non_empty = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };
        let auth = if let Some(token) = non_empty(&config.access_token) {
            Auth::Bearer(token)
        } else if let Some(key) = non_empty(&config.api_key) {
            Auth::ApiKey(key)
        } else {
            return Err(VisageError::Config(
                "no TTS credential configured (set tts.api_key or tts.access_token)".into(),
            ));
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .map_err(|e| VisageError::Config(format!("failed to build HTTP client: {e}")))?;

        info!(endpoint = %config.endpoint, "Google Cloud TTS client ready");

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_owned(),
            auth,
            client,
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleCloudTts {
    fn name(&self) -> &'static str {
        "google-cloud-tts"
    }

    async fn synthesize(&self, text: &str, voice: &VoiceSettings) -> Result<Vec<u8>> {
        if text.len() > MAX_TTS_INPUT_BYTES {
            return Err(VisageError::Tts(format!(
                "text exceeds maximum size: {} bytes (limit: {MAX_TTS_INPUT_BYTES} bytes)",
                text.len()
            )));
        }

        let body = SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code: &voice.language_code,
                name: &voice.voice_name,
            },
            audio_config: AudioConfigBody {
                audio_encoding: voice.encoding.api_name(),
                speaking_rate: voice.speaking_rate,
                pitch: voice.pitch,
            },
        };

        let url = format!("{}/text:synthesize", self.endpoint);
        let mut request = self.client.post(&url).json(&body);
        request = match &self.auth {
            Auth::ApiKey(key) => request.query(&[("key", key)]),
            Auth::Bearer(token) => request.bearer_auth(token),
        };

        debug!(voice = %voice.voice_name, chars = text.chars().count(), "calling TTS API");
        let response = request
            .send()
            .await
            .map_err(|e| VisageError::Tts(format!("TTS request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(VisageError::Tts(format!(
                "TTS API returned {status}: {detail}"
            )));
        }

        let parsed: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| VisageError::Tts(format!("invalid TTS response: {e}")))?;

        let encoded = parsed
            .audio_content
            .filter(|c| !c.is_empty())
            .ok_or_else(|| VisageError::Tts("TTS API returned empty response".into()))?;

        let audio = base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| VisageError::Tts(format!("invalid audioContent encoding: {e}")))?;

        if audio.is_empty() {
            return Err(VisageError::Tts("TTS API returned empty response".into()));
        }

        Ok(audio)
    }
}
