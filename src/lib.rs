//! Cascade/parallel formant speech synthesis in Rust.
//!
//! *NOTE*: This is _not_ a text-to-speech engine.
//! It turns a track of acoustic control frames (formants, bandwidths, voicing and noise
//! amplitudes) into PCM samples. Reading parameter files and writing audio devices or
//! containers are left to the caller.
//!
//! ```
//! use formant_synth::{ControlFrame, SynthConfig, Synthesizer};
//!
//! let synth = Synthesizer::new(SynthConfig::default())?;
//! let track = vec![ControlFrame::default(); 20];
//! let samples = synth.render(&track)?;
//! assert_eq!(samples.len(), 20 * 160);
//! # Ok::<(), formant_synth::SynthError>(())
//! ```
//!
//! ## `no_std`
//!
//! The crate is `no_std` compatible when built with `default-features = false` and the
//! `libm` feature. `alloc` is required.

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(
    clippy::all,
    clippy::cargo,
    clippy::pedantic,
    unsafe_code,
    rustdoc::all
)]
// no public repository to point the manifest at yet
#![allow(clippy::cargo_common_metadata)]
// fine for us since loss of precision/sign is not that important, as long as it's the same every time.
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::module_name_repetitions
)]

#[cfg(all(feature = "std", feature = "libm"))]
compile_error!("Features \"std\" and \"libm\" are mutually exclusive.");

#[cfg(not(any(feature = "std", feature = "libm")))]
compile_error!("Must specify a math feature: either \"std\" or \"libm\".");

extern crate alloc;

mod config;
mod engine;
mod error;
mod filter;
mod frame;
mod math;
mod network;
mod scheduler;
mod source;

pub use config::{
    GlottalPulse, Interpolation, MAX_FORMANTS, MIN_SAMPLE_RATE, SampleFormat, SynthConfig,
};
pub use engine::{CancelToken, SampleStream, Samples, Synthesizer, synthesize, to_int16};
pub use error::{SynthError, SynthResult};
pub use filter::{AntiResonator, DifferencingFilter, Filter, LpFilter1, Resonator};
pub use frame::{ControlFrame, MAX_TILT_DB};
pub use math::{db_to_lin, perform_frequency_modulation};
pub use network::{NetworkTopology, ResonatorNetwork};
pub use scheduler::{FrameScheduler, ScheduledFrame};
pub use source::{Excitation, GlottalPhase, VoicingSource};
