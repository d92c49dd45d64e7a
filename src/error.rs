//! Error types for the synthesis engine.

use core::fmt;
use thiserror::Error;

/// Result type for synthesis operations.
pub type SynthResult<T> = Result<T, SynthError>;

/// Errors that can occur while configuring or running a synthesis.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SynthError {
    /// A control value is outside its physically valid range, or would make a filter
    /// section unstable.
    #[error("invalid parameter `{name}` = {value}{}: {reason}", in_frame(.frame))]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The rejected value.
        value: f64,
        /// Why the value was rejected.
        reason: &'static str,
        /// Index of the offending frame within the track, if it came from one.
        frame: Option<usize>,
    },

    /// The parameter track holds no frames.
    #[error("parameter track contains no frames")]
    EmptyTrack,

    /// Invalid engine configuration.
    #[error("invalid configuration `{option}`: {reason}")]
    Configuration {
        /// Configuration option name.
        option: &'static str,
        /// Why the option was rejected.
        reason: &'static str,
    },

    /// Synthesis aborted part-way through a track.
    #[error("synthesis aborted at sample {sample_index}: {reason}")]
    Fault {
        /// Index of the sample at which the fault was detected.
        sample_index: usize,
        /// What went wrong.
        reason: &'static str,
    },

    /// Synthesis stopped because its cancel token was triggered.
    #[error("synthesis cancelled at sample {sample_index}")]
    Cancelled {
        /// Index of the first sample that was not produced.
        sample_index: usize,
    },
}

impl SynthError {
    /// Creates an invalid parameter error that is not tied to a frame.
    #[must_use]
    pub fn invalid_param(name: &'static str, value: f64, reason: &'static str) -> Self {
        Self::InvalidParameter {
            name,
            value,
            reason,
            frame: None,
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(option: &'static str, reason: &'static str) -> Self {
        Self::Configuration { option, reason }
    }

    /// Attaches a frame index to an [`SynthError::InvalidParameter`]. Other variants
    /// pass through unchanged.
    #[must_use]
    pub fn in_frame(self, index: usize) -> Self {
        match self {
            Self::InvalidParameter {
                name,
                value,
                reason,
                ..
            } => Self::InvalidParameter {
                name,
                value,
                reason,
                frame: Some(index),
            },
            other => other,
        }
    }
}

struct InFrame(Option<usize>);

impl fmt::Display for InFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(index) => write!(f, " in frame {index}"),
            None => Ok(()),
        }
    }
}

#[allow(clippy::ref_option)]
fn in_frame(frame: &Option<usize>) -> InFrame {
    InFrame(*frame)
}
