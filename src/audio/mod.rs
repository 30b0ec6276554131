//! Persisted audio: storage and duration measurement.

pub mod duration;
pub mod store;

pub use duration::{DurationProbe, SymphoniaProbe};
pub use store::{AudioStore, FsAudioStore, StoredAudio};
