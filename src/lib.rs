//! Visage: speech-driven facial animation for a talking interview avatar.
//!
//! Turns a line of interviewer dialogue into synthesized speech plus a
//! fixed-rate timeline of ARKit-style blend-shape frames of matching length:
//! Text → TTS → audio file → duration → phoneme cycle → viseme → facial pose
//!
//! # Architecture
//!
//! - **viseme**: phoneme symbol to viseme class lookup
//! - **blendshape**: the 52 facial channels and per-viseme poses
//! - **animation**: timeline generation from text and a duration source
//! - **tts**: the speech synthesis seam and the Google Cloud backend
//! - **audio**: audio persistence and duration measurement via `symphonia`
//! - **speech**: the end-to-end `synthesize_and_animate` operation
//! - **session**: per-connection interview state for the serving layer

pub mod animation;
pub mod audio;
pub mod blendshape;
pub mod config;
pub mod error;
pub mod session;
pub mod speech;
pub mod tts;
pub mod viseme;

pub use animation::{DurationSource, Frame, Timeline, TimelineGenerator};
pub use blendshape::{BlendShape, FacialPose, build_pose};
pub use config::VisageConfig;
pub use error::{Result, VisageError};
pub use session::SessionStore;
pub use speech::{CapabilityStatus, SpeechAnimator, SynthesisResult};
pub use viseme::{Viseme, classify};
