//! Audio duration measurement.
//!
//! Measuring the real length of the synthesized file gives tighter lip-sync
//! than estimating from word count. Failure here is never fatal to the
//! caller; see [`crate::speech`].

use crate::error::{Result, VisageError};
use std::path::Path;
use symphonia::core::codecs::CodecParameters;
use symphonia::core::errors::Error as SymphError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Measures the playback length of a persisted audio file.
pub trait DurationProbe: Send + Sync {
    /// Duration of the audio at `path`, in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`VisageError::Duration`] if the file cannot be read or its
    /// length cannot be determined.
    fn measure(&self, path: &Path) -> Result<f64>;
}

/// Container-level duration probe backed by `symphonia`.
///
/// Uses the frame count declared in the stream header when present (WAV,
/// MP3 with a Xing/Info header) and otherwise sums packet durations without
/// decoding any audio.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaProbe;

impl DurationProbe for SymphoniaProbe {
    fn measure(&self, path: &Path) -> Result<f64> {
        let file = std::fs::File::open(path).map_err(|e| {
            VisageError::Duration(format!("failed to open {}: {e}", path.display()))
        })?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| VisageError::Duration(format!("failed to probe audio: {e}")))?;

        let mut format = probed.format;
        let track = format
            .default_track()
            .ok_or_else(|| VisageError::Duration("no default audio track".into()))?;
        let track_id = track.id;
        let params = track.codec_params.clone();

        let seconds = match params.n_frames.and_then(|n| ticks_to_seconds(&params, n)) {
            Some(s) => s,
            None => {
                let mut ticks: u64 = 0;
                loop {
                    match format.next_packet() {
                        Ok(packet) => {
                            if packet.track_id() == track_id {
                                ticks = ticks.saturating_add(packet.dur);
                            }
                        }
                        Err(SymphError::IoError(e))
                            if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                        {
                            break;
                        }
                        Err(e) => {
                            return Err(VisageError::Duration(format!("audio read error: {e}")));
                        }
                    }
                }
                ticks_to_seconds(&params, ticks)
                    .ok_or_else(|| VisageError::Duration("unknown time base".into()))?
            }
        };

        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(VisageError::Duration(format!(
                "audio has no measurable length ({seconds})"
            )));
        }
        Ok(seconds)
    }
}

fn ticks_to_seconds(params: &CodecParameters, ticks: u64) -> Option<f64> {
    if let Some(time_base) = params.time_base {
        let time = time_base.calc_time(ticks);
        return Some(time.seconds as f64 + time.frac);
    }
    params
        .sample_rate
        .filter(|sr| *sr > 0)
        .map(|sr| ticks as f64 / f64::from(sr))
}
