//! Maps a frame-rate parameter track onto the output sample clock.

use crate::config::{Interpolation, SynthConfig};
use crate::error::{SynthError, SynthResult};
use crate::frame::ControlFrame;

/// Control values for one output sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledFrame {
    /// interpolated (or held) parameters for this sample
    pub frame: ControlFrame,
    /// index of the track frame this sample belongs to
    pub frame_index: usize,
    /// position of this sample within its frame
    pub sample_in_frame: usize,
    /// false if the parameters are known to equal those of the previous sample
    pub changed: bool,
}

/// Iterator over the per-sample control values of a track.
///
/// Every frame covers `samples_per_frame` samples, except that a track with a single
/// frame covers `single_frame_samples`. With [`Interpolation::Linear`] sample `k` of
/// frame `i` gets `frame[i] + (frame[i + 1] - frame[i]) * k / samples_per_frame`.
/// The last frame has no successor and is held.
#[derive(Debug, Clone)]
pub struct FrameScheduler<'a> {
    track: &'a [ControlFrame],
    interpolation: Interpolation,
    samples_per_frame: usize,
    single_frame_samples: usize,
    total_samples: usize,
    frame_index: usize,
    sample_in_frame: usize,
    emitted: usize,
}

impl<'a> FrameScheduler<'a> {
    /// # Errors
    ///
    /// [`SynthError::EmptyTrack`] if `track` has no frames, or
    /// [`SynthError::Configuration`] if the track length in samples does not fit a `usize`.
    pub fn new(track: &'a [ControlFrame], config: &SynthConfig) -> SynthResult<Self> {
        if track.is_empty() {
            return Err(SynthError::EmptyTrack);
        }
        let samples_per_frame = config.samples_per_frame();
        let single_frame_samples = config.single_frame_samples();
        let total_samples = if track.len() == 1 {
            single_frame_samples
        } else {
            track.len().checked_mul(samples_per_frame).ok_or_else(|| {
                SynthError::configuration(
                    "frame_duration_ms",
                    "track is too long to count its samples",
                )
            })?
        };
        Ok(FrameScheduler {
            track,
            interpolation: config.interpolation,
            samples_per_frame,
            single_frame_samples,
            total_samples,
            frame_index: 0,
            sample_in_frame: 0,
            emitted: 0,
        })
    }

    /// Number of output samples frame `index` covers.
    #[must_use]
    pub fn samples_in_frame(&self, index: usize) -> usize {
        if index >= self.track.len() {
            0
        } else if self.track.len() == 1 {
            self.single_frame_samples
        } else {
            self.samples_per_frame
        }
    }

    /// Number of samples the whole track produces.
    #[must_use]
    pub fn total_samples(&self) -> usize {
        self.total_samples
    }

    /// Number of samples yielded so far.
    #[must_use]
    pub fn position(&self) -> usize {
        self.emitted
    }
}

impl Iterator for FrameScheduler<'_> {
    type Item = ScheduledFrame;

    fn next(&mut self) -> Option<ScheduledFrame> {
        let i = self.frame_index;
        let current = self.track.get(i)?;
        let k = self.sample_in_frame;

        let ramp_to = match self.interpolation {
            Interpolation::Linear => self.track.get(i + 1),
            Interpolation::Hold => None,
        };
        let (frame, changed) = match ramp_to {
            Some(next) => {
                let t = k as f64 / self.samples_per_frame as f64;
                (current.lerp(next, t), true)
            }
            None => (current.clone(), k == 0),
        };

        self.sample_in_frame += 1;
        self.emitted += 1;
        if self.sample_in_frame >= self.samples_in_frame(i) {
            self.frame_index += 1;
            self.sample_in_frame = 0;
        }

        Some(ScheduledFrame {
            frame,
            frame_index: i,
            sample_in_frame: k,
            changed,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total_samples - self.emitted;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FrameScheduler<'_> {}
