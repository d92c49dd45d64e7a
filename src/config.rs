//! Engine configuration.

use crate::error::{SynthError, SynthResult};
use crate::math::round;

/// Number of formant slots in a [`crate::ControlFrame`], and the upper bound for the
/// cascade and parallel formant counts.
pub const MAX_FORMANTS: usize = 6;

/// Lowest supported sample rate in Hz.
///
/// The noise coloring filter sits at 1 kHz and must stay below Nyquist.
pub const MIN_SAMPLE_RATE: u32 = 4000;

/// How control values move between two frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Interpolation {
    /// Per-sample linear ramp towards the next frame.
    #[default]
    Linear,
    /// Frame values are held until the next frame starts.
    Hold,
}

/// Output sample representation for [`crate::Synthesizer::render_output`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SampleFormat {
    /// `f64` samples clamped to [-1, 1].
    #[default]
    Float,
    /// 16 bit signed PCM, full scale 32767.
    Int16,
}

/// Shape of the glottal excitation pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum GlottalPulse {
    /// Impulse doublet smoothed by a low-pass resonator.
    Impulsive,
    /// KLGLOTT88 polynomial flow derivative.
    #[default]
    Polynomial,
    /// Differentiated raised-cosine glottal area (Fant model).
    Fant,
    /// Differentiated glottal area with a time-warped cosine closing (Maeda model).
    Maeda,
    /// White noise instead of a periodic pulse (whisper).
    Noise,
}

/// Parameters for the whole synthesis run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SynthConfig {
    /// sample rate in Hz
    pub sample_rate: u32,
    /// duration of one control frame in milliseconds
    pub frame_duration_ms: f64,
    /// number of formant resonators in the cascade branch, 0 disables the branch
    pub cascade_formants: usize,
    /// number of formant resonators in the parallel branch
    pub parallel_formants: usize,
    pub interpolation: Interpolation,
    /// seed for all noise sources
    pub seed: u64,
    pub sample_format: SampleFormat,
    pub glottal_pulse: GlottalPulse,
    /// duration of a track that consists of a single frame, in milliseconds
    pub single_frame_duration_ms: f64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        SynthConfig {
            sample_rate: 16000,
            frame_duration_ms: 10.0,
            cascade_formants: 5,
            parallel_formants: MAX_FORMANTS,
            interpolation: Interpolation::Linear,
            seed: 0,
            sample_format: SampleFormat::Float,
            glottal_pulse: GlottalPulse::Polynomial,
            single_frame_duration_ms: 500.0,
        }
    }
}

impl SynthConfig {
    /// Default configuration at the given sample rate.
    #[must_use]
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        SynthConfig {
            sample_rate,
            ..SynthConfig::default()
        }
    }

    /// Nyquist frequency in Hz.
    #[must_use]
    pub fn nyquist(&self) -> f64 {
        f64::from(self.sample_rate) / 2.0
    }

    /// Number of output samples covered by one control frame.
    #[must_use]
    pub fn samples_per_frame(&self) -> usize {
        duration_to_samples(self.sample_rate, self.frame_duration_ms)
    }

    /// Number of output samples produced for a track with a single frame.
    #[must_use]
    pub fn single_frame_samples(&self) -> usize {
        duration_to_samples(self.sample_rate, self.single_frame_duration_ms)
    }

    /// Checks every option.
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::Configuration`] naming the first rejected option.
    pub fn validate(&self) -> SynthResult<()> {
        if self.sample_rate == 0 {
            return Err(SynthError::configuration(
                "sample_rate",
                "sample rate must be positive",
            ));
        }
        if self.sample_rate < MIN_SAMPLE_RATE {
            return Err(SynthError::configuration(
                "sample_rate",
                "sample rate is below the supported minimum of 4000 Hz",
            ));
        }
        if !self.frame_duration_ms.is_finite() || self.frame_duration_ms <= 0.0 {
            return Err(SynthError::configuration(
                "frame_duration_ms",
                "frame duration must be positive",
            ));
        }
        if self.samples_per_frame() == 0 {
            return Err(SynthError::configuration(
                "frame_duration_ms",
                "frame duration is shorter than one sample",
            ));
        }
        if duration_in_samples(self.sample_rate, self.frame_duration_ms) > MAX_FRAME_SAMPLES {
            return Err(SynthError::configuration(
                "frame_duration_ms",
                "frame duration exceeds 2^32 - 1 samples",
            ));
        }
        if !self.single_frame_duration_ms.is_finite() || self.single_frame_samples() == 0 {
            return Err(SynthError::configuration(
                "single_frame_duration_ms",
                "single frame duration must cover at least one sample",
            ));
        }
        if duration_in_samples(self.sample_rate, self.single_frame_duration_ms) > MAX_FRAME_SAMPLES
        {
            return Err(SynthError::configuration(
                "single_frame_duration_ms",
                "single frame duration exceeds 2^32 - 1 samples",
            ));
        }
        if self.cascade_formants > MAX_FORMANTS {
            return Err(SynthError::configuration(
                "cascade_formants",
                "at most 6 cascade formants are supported",
            ));
        }
        if self.parallel_formants > MAX_FORMANTS {
            return Err(SynthError::configuration(
                "parallel_formants",
                "at most 6 parallel formants are supported",
            ));
        }
        Ok(())
    }
}

/// Longest accepted frame, in samples.
const MAX_FRAME_SAMPLES: f64 = u32::MAX as f64;

fn duration_in_samples(sample_rate: u32, duration_ms: f64) -> f64 {
    round(f64::from(sample_rate) * duration_ms / 1000.0)
}

fn duration_to_samples(sample_rate: u32, duration_ms: f64) -> usize {
    let samples = duration_in_samples(sample_rate, duration_ms);
    if samples.is_finite() && samples > 0.0 {
        samples as usize
    } else {
        0
    }
}
