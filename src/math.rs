//! Core math functions for the synthesis.
//! If the `libm` feature is enabled, this just exports the required functions.
//! If the `std` feature is enabled, this converts the syntax from the std variety: `f.sqrt()` into
//! the `libm` equiv. `sqrt(f)`.

use core::f64::consts::PI;

#[cfg(feature = "libm")]
pub(crate) use libm::{cos, exp, fabs, pow, round, sin, sqrt};

#[cfg(feature = "std")]
pub(crate) fn sqrt(f: f64) -> f64 {
    f.sqrt()
}
#[cfg(feature = "std")]
pub(crate) fn pow(f1: f64, f2: f64) -> f64 {
    f1.powf(f2)
}
#[cfg(feature = "std")]
pub(crate) fn cos(f: f64) -> f64 {
    f.cos()
}
#[cfg(feature = "std")]
pub(crate) fn sin(f: f64) -> f64 {
    f.sin()
}
#[cfg(feature = "std")]
pub(crate) fn exp(f: f64) -> f64 {
    f.exp()
}
#[cfg(feature = "std")]
pub(crate) fn round(f: f64) -> f64 {
    f.round()
}
#[cfg(feature = "std")]
pub(crate) fn fabs(f: f64) -> f64 {
    f.abs()
}

/// Convert a dB value into a linear value.
/// dB values of -99 and below or NaN are converted to 0.
#[must_use]
pub fn db_to_lin(db: f64) -> f64 {
    if db <= -99.0 || db.is_nan() {
        0.0
    } else {
        pow(10.0, db / 20.0)
    }
}

/// Modulates the fundamental frequency (F0).
///
/// Sine-wave frequencies of 12.7, 7.1 and 4.7 Hz were chosen so as to ensure
/// a long period before repetition of the perturbation that is introduced.
/// A flutter level of 0.25 results in synthetic vowels with a quite
/// realistic deviation from constant pitch.
///
/// ### params
/// ```text
///    f0 = Fundamental frequency.
///    flutter_level = Flutter level between 0 and 1.
///    time = Relative signal position in seconds.
/// ```
/// ### returns
///    Modulated fundamental frequency.
#[must_use]
pub fn perform_frequency_modulation(f0: f64, flutter_level: f64, time: f64) -> f64 {
    if flutter_level <= 0.0 {
        return f0;
    }
    let w = 2.0 * PI * time;
    let a = sin(12.7 * w) + sin(7.1 * w) + sin(4.7 * w);
    f0 * (1.0 + a * flutter_level / 50.0)
}
