//! Speech synthesis with a synchronised facial animation track.
//!
//! [`SpeechAnimator`] calls the TTS capability, persists the audio, measures
//! its real length when it can, and generates a timeline of matching length.
//! Measurement problems only cost accuracy: the timeline falls back to a
//! word-count estimate and the request still succeeds.

use crate::animation::{DurationSource, Timeline, TimelineGenerator};
use crate::audio::{AudioStore, DurationProbe, FsAudioStore, StoredAudio, SymphoniaProbe};
use crate::config::VisageConfig;
use crate::error::{Result, VisageError};
use crate::tts::{GoogleCloudTts, SpeechSynthesizer, VoiceSettings};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default bound on a single synthesis call.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A timeline paired with the audio it was built for.
///
/// Serializes as `{"blendData": [...], "filename": "/audio/<file>"}`.
#[derive(Debug, Clone, Serialize)]
pub struct SynthesisResult {
    #[serde(rename = "blendData")]
    pub timeline: Timeline,
    /// Client-facing reference to the persisted audio.
    #[serde(rename = "filename")]
    pub audio_ref: String,
    #[serde(skip)]
    pub audio_path: PathBuf,
    /// How the timeline length was decided.
    #[serde(skip)]
    pub duration_source: DurationSource,
}

/// Overall readiness reported by [`SpeechAnimator::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Readiness {
    Healthy,
    Degraded,
}

/// Which capabilities are wired up.
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityStatus {
    pub status: Readiness,
    pub tts_initialized: bool,
    pub tts_backend: Option<&'static str>,
    pub duration_probe: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Produces speech audio and its facial animation as one unit.
pub struct SpeechAnimator {
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    store: Arc<dyn AudioStore>,
    probe: Option<Arc<dyn DurationProbe>>,
    generator: TimelineGenerator,
    voice: VoiceSettings,
    request_timeout: Duration,
}

impl std::fmt::Debug for SpeechAnimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechAnimator")
            .field("synthesizer", &self.synthesizer.as_ref().map(|s| s.name()))
            .field("duration_probe", &self.probe.is_some())
            .field("voice", &self.voice)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl SpeechAnimator {
    /// An animator with storage only. Add a synthesizer with
    /// [`Self::with_synthesizer`] before use.
    pub fn new(store: Arc<dyn AudioStore>) -> Self {
        Self {
            synthesizer: None,
            store,
            probe: None,
            generator: TimelineGenerator::default(),
            voice: VoiceSettings::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Wire up the production stack from config.
    ///
    /// A TTS client that cannot be built is logged and left unset, so the
    /// failure surfaces per request and in [`Self::status`].
    pub fn from_config(config: &VisageConfig) -> Self {
        let synthesizer: Option<Arc<dyn SpeechSynthesizer>> =
            match GoogleCloudTts::new(&config.tts) {
                Ok(tts) => Some(Arc::new(tts)),
                Err(e) => {
                    warn!("Text-to-Speech client not initialized: {e}");
                    None
                }
            };

        let mut animator = Self::new(Arc::new(FsAudioStore::new(&config.storage)))
            .with_probe(Arc::new(SymphoniaProbe))
            .with_generator(TimelineGenerator::new(config.animation.clone()))
            .with_voice(VoiceSettings::from(&config.tts))
            .with_timeout(Duration::from_secs(config.tts.request_timeout_secs.max(1)));
        animator.synthesizer = synthesizer;
        animator
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn DurationProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn with_generator(mut self, generator: TimelineGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_voice(mut self, voice: VoiceSettings) -> Self {
        self.voice = voice;
        self
    }

    /// Bound on the TTS call. Storage writes carry their own timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn voice(&self) -> &VoiceSettings {
        &self.voice
    }

    /// Capability report, mirroring a health endpoint.
    pub fn status(&self) -> CapabilityStatus {
        let mut warnings = Vec::new();
        if self.synthesizer.is_none() {
            warnings.push("Text-to-Speech client not initialized - avatar cannot speak".into());
        }
        if self.probe.is_none() {
            warnings.push("no duration probe - animation timing is estimated".into());
        }
        CapabilityStatus {
            status: if self.synthesizer.is_some() {
                Readiness::Healthy
            } else {
                Readiness::Degraded
            },
            tts_initialized: self.synthesizer.is_some(),
            tts_backend: self.synthesizer.as_ref().map(|s| s.name()),
            duration_probe: self.probe.is_some(),
            warnings,
        }
    }

    /// Synthesize `text` and build its animation.
    ///
    /// # Errors
    ///
    /// - [`VisageError::Config`] if no synthesizer is configured.
    /// - [`VisageError::Tts`] or [`VisageError::Timeout`] if synthesis fails.
    /// - [`VisageError::Storage`] if the audio cannot be persisted.
    ///
    /// Duration measurement failures are never returned.
    pub async fn synthesize_and_animate(&self, text: &str) -> Result<SynthesisResult> {
        let synthesizer = self.synthesizer.as_ref().ok_or_else(|| {
            VisageError::Config(
                "Text-to-Speech client is not initialized. Cannot generate audio.".into(),
            )
        })?;

        info!(
            backend = synthesizer.name(),
            voice = %self.voice.voice_name,
            chars = text.chars().count(),
            "generating speech"
        );

        let audio = tokio::time::timeout(
            self.request_timeout,
            synthesizer.synthesize(text, &self.voice),
        )
        .await
        .map_err(|_| {
            VisageError::Timeout(format!(
                "TTS request exceeded {} seconds",
                self.request_timeout.as_secs()
            ))
        })??;

        if audio.is_empty() {
            return Err(VisageError::Tts("TTS API returned empty response".into()));
        }
        info!(bytes = audio.len(), "TTS returned audio");

        let stored = self.store.persist(&audio, self.voice.encoding).await?;
        let source = self.duration_source(&stored).await;
        let timeline = self.generator.generate(text, source);

        info!(
            frames = timeline.len(),
            audio = %stored.reference,
            "speech and animation ready ({:.2}s)",
            timeline.duration_secs()
        );

        Ok(SynthesisResult {
            timeline,
            audio_ref: stored.reference,
            audio_path: stored.path,
            duration_source: source,
        })
    }

    /// Measured duration if possible, otherwise an estimate at the configured rate.
    async fn duration_source(&self, stored: &StoredAudio) -> DurationSource {
        let estimate = DurationSource::Estimate {
            speaking_rate: self.voice.speaking_rate,
        };
        let Some(probe) = self.probe.clone() else {
            debug!("no duration probe, using estimated duration");
            return estimate;
        };

        let path = stored.path.clone();
        let max = self.generator.config().max_duration_secs;
        match tokio::task::spawn_blocking(move || probe.measure(&path)).await {
            Ok(Ok(seconds)) if seconds.is_finite() && seconds > 0.0 && seconds <= max => {
                info!("audio duration: {seconds:.2}s");
                DurationSource::Exact { seconds }
            }
            Ok(Ok(seconds)) => {
                warn!("implausible audio duration {seconds}s (limit {max}s), using estimated");
                estimate
            }
            Ok(Err(e)) => {
                warn!("could not get audio duration: {e}, using estimated");
                estimate
            }
            Err(e) => {
                warn!("duration probe task failed: {e}, using estimated");
                estimate
            }
        }
    }
}
