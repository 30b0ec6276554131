//! Facial animation timeline generation.
//!
//! Converts an utterance into a fixed-rate sequence of blend-shape frames
//! that covers the speech duration, followed by a short neutral hold so the
//! face settles after the audio ends.
//!
//! The mouth follows a fixed phoneme cycle rather than a real phonemization
//! of the text. Within each phoneme the intensity rises and falls on a half
//! sine, so consecutive phonemes meet at the baseline and there are no jumps.

use crate::blendshape::{BlendShape, FacialPose, build_pose};
use crate::config::AnimationConfig;
use crate::error::Result;
use crate::viseme::{Viseme, classify};
use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::f64::consts::PI;
use tracing::{debug, warn};

/// Phoneme cycle driven across every timeline.
pub const PHONEME_CYCLE: [&str; 6] = ["sil", "AA", "EH", "OW", "M", "sil"];

/// Where the speech duration comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DurationSource {
    /// Estimate from word count at the given speaking rate (1.0 = normal).
    Estimate { speaking_rate: f64 },
    /// Measured audio length in seconds.
    Exact { seconds: f64 },
}

/// One sampled instant of facial animation.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Frame {
    pub blendshapes: FacialPose,
}

impl Frame {
    /// Value of a single channel in this frame.
    pub fn get(&self, shape: BlendShape) -> f32 {
        self.blendshapes.get(shape)
    }

    /// True when the frame is the neutral resting face.
    pub fn is_neutral(&self) -> bool {
        self.blendshapes.is_neutral()
    }
}

/// An ordered, fixed-rate sequence of frames for one utterance.
///
/// The last `settle_frames` frames are always neutral.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    frames: Vec<Frame>,
    fps: u32,
    speech_frames: usize,
}

impl Timeline {
    /// All frames, in playback order.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Consume the timeline, returning its frames.
    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Frames covering speech, excluding the trailing neutral hold.
    pub fn speech_frames(&self) -> usize {
        self.speech_frames
    }

    /// Total playback length in seconds, including the trailing hold.
    pub fn duration_secs(&self) -> f64 {
        self.frames.len() as f64 / f64::from(self.fps)
    }

    /// Timestamp of frame `index` in seconds.
    pub fn frame_time(&self, index: usize) -> f64 {
        index as f64 / f64::from(self.fps)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }

    /// Serialize to the JSON array sent to avatar clients.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

impl Serialize for Timeline {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.frames.len()))?;
        for frame in &self.frames {
            seq.serialize_element(frame)?;
        }
        seq.end()
    }
}

/// Builds animation timelines from text.
///
/// Stateless between calls: identical inputs always produce identical
/// timelines.
#[derive(Debug, Clone)]
pub struct TimelineGenerator {
    config: AnimationConfig,
    cycle: [Viseme; PHONEME_CYCLE.len()],
}

impl Default for TimelineGenerator {
    fn default() -> Self {
        Self::new(AnimationConfig::default())
    }
}

impl TimelineGenerator {
    pub fn new(config: AnimationConfig) -> Self {
        Self {
            config,
            cycle: PHONEME_CYCLE.map(classify),
        }
    }

    pub fn config(&self) -> &AnimationConfig {
        &self.config
    }

    /// Speech duration in seconds for `text` under `source`.
    ///
    /// Estimates are floored at `min_duration_secs`, so empty text still
    /// animates briefly. Every result is capped at `max_duration_secs`.
    pub fn resolve_duration(&self, text: &str, source: DurationSource) -> f64 {
        let duration = match source {
            DurationSource::Exact { seconds } => {
                if seconds.is_finite() && seconds > 0.0 {
                    seconds
                } else {
                    warn!(seconds, "invalid exact duration, treating as zero");
                    0.0
                }
            }
            DurationSource::Estimate { speaking_rate } => {
                let rate = if speaking_rate.is_finite() && speaking_rate > 0.0 {
                    speaking_rate
                } else {
                    warn!(speaking_rate, "invalid speaking rate, using 1.0");
                    1.0
                };
                let words = word_count(text) as f64;
                let words_per_second = self.config.words_per_second * rate;
                (words / words_per_second).max(self.config.min_duration_secs)
            }
        };
        let max = self.config.max_duration_secs;
        if duration > max {
            warn!(duration, max, "speech duration above limit, capping");
            return max;
        }
        duration
    }

    /// How many frames each phoneme in the cycle is held for.
    pub fn frames_per_phoneme(&self, total_frames: usize, word_count: usize) -> usize {
        let divisor = word_count.max(1) * self.config.phonemes_per_word.max(1);
        self.config
            .min_frames_per_phoneme
            .max(total_frames / divisor)
            .max(1)
    }

    /// Mouth intensity at `frame`, given the dwell length.
    pub fn intensity_at(&self, frame: usize, frames_per_phoneme: usize) -> f64 {
        let phase = (frame % frames_per_phoneme) as f64 / frames_per_phoneme as f64;
        self.config.base_intensity + self.config.intensity_swing * (phase * PI).sin()
    }

    /// Generate the full timeline for `text`.
    pub fn generate(&self, text: &str, source: DurationSource) -> Timeline {
        let duration = self.resolve_duration(text, source);
        let fps = self.config.fps;
        let speech_frames = (duration * f64::from(fps)).floor() as usize;
        let words = word_count(text).max(1);
        let frames_per_phoneme = self.frames_per_phoneme(speech_frames, words);

        let mut frames =
            Vec::with_capacity(speech_frames.saturating_add(self.config.settle_frames));
        for frame in 0..speech_frames {
            let viseme = self.cycle[(frame / frames_per_phoneme) % self.cycle.len()];
            let intensity = self.intensity_at(frame, frames_per_phoneme);
            let pose = build_pose(viseme, intensity as f32).scaled(self.config.damping);
            frames.push(Frame { blendshapes: pose });
        }

        let settle = Frame {
            blendshapes: build_pose(Viseme::Sil, 1.0),
        };
        frames.extend(std::iter::repeat_n(settle, self.config.settle_frames));

        debug!(
            frames = frames.len(),
            speech_frames,
            frames_per_phoneme,
            "generated {:.2}s timeline for {duration:.2}s of speech",
            frames.len() as f64 / f64::from(fps)
        );

        Timeline {
            frames,
            fps,
            speech_frames,
        }
    }
}

/// Generate a timeline with the default animation settings.
pub fn generate(text: &str, source: DurationSource) -> Timeline {
    TimelineGenerator::default().generate(text, source)
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::blendshape::rule_for;

    #[test]
    fn exact_duration_frame_count() {
        let timeline = generate("some text here", DurationSource::Exact { seconds: 2.37 });
        assert_eq!(timeline.speech_frames(), 142);
        assert_eq!(timeline.len(), 172);
    }

    #[test]
    fn estimated_duration_six_words() {
        let text = "Hello there, nice to meet you";
        let timeline = generate(text, DurationSource::Estimate { speaking_rate: 1.0 });
        assert_eq!(timeline.speech_frames(), 180);
        assert_eq!(timeline.len(), 210);
    }

    #[test]
    fn empty_text_uses_duration_floor() {
        let generator = TimelineGenerator::default();
        for rate in [0.5, 0.9, 1.0, 2.0] {
            let source = DurationSource::Estimate { speaking_rate: rate };
            assert_eq!(generator.resolve_duration("", source), 0.5);
            let timeline = generator.generate("", source);
            assert_eq!(timeline.len(), 60);
        }
        assert_eq!(generator.frames_per_phoneme(30, 1), 10);
    }

    #[test]
    fn frames_per_phoneme_has_floor() {
        let generator = TimelineGenerator::default();
        assert_eq!(generator.frames_per_phoneme(180, 6), 10);
        assert_eq!(generator.frames_per_phoneme(60, 20), 8);
        assert_eq!(generator.frames_per_phoneme(0, 1), 8);
    }

    #[test]
    fn trailing_hold_is_neutral() {
        let timeline = generate("a b c", DurationSource::Exact { seconds: 1.0 });
        let tail = &timeline.frames()[timeline.speech_frames()..];
        assert_eq!(tail.len(), 30);
        assert!(tail.iter().all(Frame::is_neutral));
    }

    #[test]
    fn speech_frames_follow_scaling_invariant() {
        let generator = TimelineGenerator::default();
        let text = "Hello there, nice to meet you";
        let timeline = generator.generate(text, DurationSource::Exact { seconds: 3.0 });
        let fpp = generator.frames_per_phoneme(180, 6);

        for (i, frame) in timeline.frames()[..timeline.speech_frames()].iter().enumerate() {
            let viseme = classify(PHONEME_CYCLE[(i / fpp) % PHONEME_CYCLE.len()]);
            let phase = (i % fpp) as f64 / fpp as f64;
            let intensity = 0.3 + 0.2 * (phase * PI).sin();
            for shape in BlendShape::ALL {
                let weight = if viseme.is_silence() {
                    0.0
                } else {
                    rule_for(viseme)
                        .iter()
                        .find(|(s, _)| *s == shape)
                        .map_or(0.0, |(_, w)| f64::from(*w))
                };
                let expected = 0.6 * intensity * weight;
                let actual = f64::from(frame.get(shape));
                assert!((actual - expected).abs() < 1e-5, "frame {i} {shape:?}");
                assert!((0.0..=0.6 * 0.5 * 0.9 + 1e-6).contains(&actual));
            }
        }
    }

    #[test]
    fn cycle_starts_silent_then_opens() {
        let timeline = generate("one two", DurationSource::Exact { seconds: 2.0 });
        // 120 frames / (2 words * 3) = 20 frames per phoneme
        assert!(timeline.frames()[5].is_neutral());
        assert!(timeline.frames()[25].get(BlendShape::JawOpen) > 0.0);
        assert!(timeline.frames()[45].get(BlendShape::MouthSmileLeft) > 0.0);
        assert!(timeline.frames()[65].get(BlendShape::MouthPucker) > 0.0);
        assert!(timeline.frames()[85].get(BlendShape::MouthClose) > 0.0);
        assert!(timeline.frames()[105].is_neutral());
    }

    #[test]
    fn dwell_boundaries_return_to_baseline() {
        let generator = TimelineGenerator::default();
        assert!((generator.intensity_at(0, 10) - 0.3).abs() < 1e-12);
        assert!((generator.intensity_at(5, 10) - 0.5).abs() < 1e-12);
        assert!((generator.intensity_at(10, 10) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn identical_inputs_produce_identical_output() {
        let source = DurationSource::Estimate { speaking_rate: 0.9 };
        let a = generate("Tell me about yourself", source);
        let b = generate("Tell me about yourself", source);
        assert_eq!(a, b);
        assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
    }

    #[test]
    fn invalid_sources_are_sanitised() {
        let generator = TimelineGenerator::default();
        assert_eq!(
            generator.resolve_duration("x", DurationSource::Exact { seconds: -1.0 }),
            0.0
        );
        assert_eq!(
            generator.resolve_duration("x", DurationSource::Exact { seconds: f64::NAN }),
            0.0
        );
        assert_eq!(
            generator.resolve_duration("a b c d", DurationSource::Estimate { speaking_rate: 0.0 }),
            2.0
        );
        let timeline = generator.generate("x", DurationSource::Exact { seconds: 0.0 });
        assert_eq!(timeline.len(), 30);
    }

    #[test]
    fn oversized_durations_are_capped() {
        let generator = TimelineGenerator::default();
        assert_eq!(
            generator.resolve_duration("x", DurationSource::Exact { seconds: f64::MAX }),
            600.0
        );
        let timeline = generator.generate("x", DurationSource::Exact { seconds: 1e300 });
        assert_eq!(timeline.speech_frames(), 36_000);
        assert_eq!(timeline.len(), 36_030);
    }

    #[test]
    fn timestamps_follow_frame_rate() {
        let timeline = generate("hi", DurationSource::Exact { seconds: 1.0 });
        assert_eq!(timeline.fps(), 60);
        assert!((timeline.frame_time(30) - 0.5).abs() < 1e-12);
        assert!((timeline.duration_secs() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn serializes_as_blendshape_frames() {
        let timeline = generate("hi", DurationSource::Exact { seconds: 0.1 });
        let json: serde_json::Value = serde_json::from_str(&timeline.to_json().unwrap()).unwrap();
        let frames = json.as_array().unwrap();
        assert_eq!(frames.len(), 36);
        let first = frames[0]["blendshapes"].as_object().unwrap();
        assert_eq!(first.len(), BlendShape::COUNT);
        assert!(first.contains_key("jawOpen"));
    }

    #[test]
    fn custom_config_changes_constants() {
        let config = AnimationConfig {
            fps: 30,
            settle_frames: 10,
            ..AnimationConfig::default()
        };
        let timeline = TimelineGenerator::new(config).generate("x", DurationSource::Exact { seconds: 2.0 });
        assert_eq!(timeline.len(), 70);
        assert_eq!(timeline.fps(), 30);
    }
}
