//! Control frames: the acoustic parameters for one analysis instant.

use crate::config::{MAX_FORMANTS, SynthConfig};
use crate::error::{SynthError, SynthResult};
use crate::filter::pole_radius;

/// Largest accepted spectral tilt, in dB of attenuation at 3 kHz.
pub const MAX_TILT_DB: f64 = 41.0;

const FORMANT_FREQ_NAMES: [&str; MAX_FORMANTS] = [
    "formant_freq[0]",
    "formant_freq[1]",
    "formant_freq[2]",
    "formant_freq[3]",
    "formant_freq[4]",
    "formant_freq[5]",
];
const FORMANT_BW_NAMES: [&str; MAX_FORMANTS] = [
    "formant_bw[0]",
    "formant_bw[1]",
    "formant_bw[2]",
    "formant_bw[3]",
    "formant_bw[4]",
    "formant_bw[5]",
];
const FORMANT_AMP_NAMES: [&str; MAX_FORMANTS] = [
    "formant_amp[0]",
    "formant_amp[1]",
    "formant_amp[2]",
    "formant_amp[3]",
    "formant_amp[4]",
    "formant_amp[5]",
];

/// Parameters for one control frame.
///
/// Amplitudes are linear factors; use [`crate::db_to_lin`] to convert dB values.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ControlFrame {
    /// fundamental frequency in Hz
    pub f0: f64,
    /// relative length of the open phase of the glottis, 0 .. 1, typically 0.7
    pub open_quotient: f64,
    /// spectral tilt of the glottal source, attenuation at 3 kHz in dB, 0 = no tilt
    pub tilt_db: f64,
    /// F0 flutter level, 0 .. 1, typically 0.25
    pub flutter: f64,
    /// voicing amplitude for the cascade branch (AV)
    pub voicing_amp: f64,
    /// voicing amplitude for the parallel branch (AVP)
    pub parallel_voicing_amp: f64,
    /// aspiration amplitude (AH)
    pub aspiration_amp: f64,
    /// frication amplitude (AF)
    pub frication_amp: f64,
    /// parallel bypass amplitude (AB)
    pub bypass_amp: f64,

    /// oral formant frequencies F1..F6 in Hz
    pub formant_freq: [f64; MAX_FORMANTS],
    /// oral formant bandwidths B1..B6 in Hz
    pub formant_bw: [f64; MAX_FORMANTS],
    /// parallel branch formant amplitudes A1..A6
    pub formant_amp: [f64; MAX_FORMANTS],

    /// nasal pole frequency in Hz, shared by the cascade and the parallel nasal resonator
    pub nasal_pole_freq: f64,
    /// nasal pole bandwidth in Hz
    pub nasal_pole_bw: f64,
    /// nasal zero frequency in Hz, cancels the pole when both are equal
    pub nasal_zero_freq: f64,
    /// nasal zero bandwidth in Hz
    pub nasal_zero_bw: f64,
    /// parallel nasal formant amplitude (AN)
    pub nasal_amp: f64,

    /// overall output gain
    pub gain: f64,
}

impl Default for ControlFrame {
    /// A sustained /a/-like vowel on the cascade branch.
    fn default() -> Self {
        ControlFrame {
            f0: 120.0,
            open_quotient: 0.7,
            tilt_db: 0.0,
            flutter: 0.0,
            voicing_amp: 1.0,
            parallel_voicing_amp: 0.0,
            aspiration_amp: 0.0,
            frication_amp: 0.0,
            bypass_amp: 0.0,
            formant_freq: [520.0, 1006.0, 2831.0, 3168.0, 4135.0, 5020.0],
            formant_bw: [76.0, 102.0, 72.0, 102.0, 816.0, 596.0],
            formant_amp: [0.0; MAX_FORMANTS],
            nasal_pole_freq: 250.0,
            nasal_pole_bw: 100.0,
            nasal_zero_freq: 250.0,
            nasal_zero_bw: 100.0,
            nasal_amp: 0.0,
            gain: 1.0,
        }
    }
}

impl ControlFrame {
    /// Checks the frame against the physical limits of the given configuration.
    ///
    /// Only the formant slots used by the cascade or parallel branch are checked.
    ///
    /// # Errors
    ///
    /// [`SynthError::InvalidParameter`] for the first out-of-range value. Nothing is
    /// clamped.
    pub fn validate(&self, config: &SynthConfig) -> SynthResult<()> {
        let nyquist = config.nyquist();
        let sample_rate = f64::from(config.sample_rate);

        check_frequency("f0", self.f0, nyquist)?;
        if !(self.open_quotient > 0.0 && self.open_quotient < 1.0) {
            return Err(SynthError::invalid_param(
                "open_quotient",
                self.open_quotient,
                "open quotient must lie strictly between 0 and 1",
            ));
        }
        if !(0.0..=MAX_TILT_DB).contains(&self.tilt_db) {
            return Err(SynthError::invalid_param(
                "tilt_db",
                self.tilt_db,
                "spectral tilt must lie between 0 and 41 dB",
            ));
        }
        if !(0.0..=1.0).contains(&self.flutter) {
            return Err(SynthError::invalid_param(
                "flutter",
                self.flutter,
                "flutter must lie between 0 and 1",
            ));
        }
        check_amplitude("voicing_amp", self.voicing_amp)?;
        check_amplitude("parallel_voicing_amp", self.parallel_voicing_amp)?;
        check_amplitude("aspiration_amp", self.aspiration_amp)?;
        check_amplitude("frication_amp", self.frication_amp)?;
        check_amplitude("bypass_amp", self.bypass_amp)?;
        check_amplitude("nasal_amp", self.nasal_amp)?;
        check_amplitude("gain", self.gain)?;

        let used = config.cascade_formants.max(config.parallel_formants);
        for i in 0..used {
            check_frequency(FORMANT_FREQ_NAMES[i], self.formant_freq[i], nyquist)?;
            check_bandwidth(FORMANT_BW_NAMES[i], self.formant_bw[i], sample_rate)?;
            check_amplitude(FORMANT_AMP_NAMES[i], self.formant_amp[i])?;
        }

        check_frequency("nasal_pole_freq", self.nasal_pole_freq, nyquist)?;
        check_bandwidth("nasal_pole_bw", self.nasal_pole_bw, sample_rate)?;
        check_frequency("nasal_zero_freq", self.nasal_zero_freq, nyquist)?;
        check_bandwidth("nasal_zero_bw", self.nasal_zero_bw, sample_rate)?;
        Ok(())
    }

    /// Linear blend between `self` (t = 0) and `next` (t = 1).
    #[must_use]
    pub fn lerp(&self, next: &ControlFrame, t: f64) -> ControlFrame {
        let mix = |a: f64, b: f64| a + (b - a) * t;
        let mix_all = |a: &[f64; MAX_FORMANTS], b: &[f64; MAX_FORMANTS]| -> [f64; MAX_FORMANTS] {
            core::array::from_fn(|i| mix(a[i], b[i]))
        };
        ControlFrame {
            f0: mix(self.f0, next.f0),
            open_quotient: mix(self.open_quotient, next.open_quotient),
            tilt_db: mix(self.tilt_db, next.tilt_db),
            flutter: mix(self.flutter, next.flutter),
            voicing_amp: mix(self.voicing_amp, next.voicing_amp),
            parallel_voicing_amp: mix(self.parallel_voicing_amp, next.parallel_voicing_amp),
            aspiration_amp: mix(self.aspiration_amp, next.aspiration_amp),
            frication_amp: mix(self.frication_amp, next.frication_amp),
            bypass_amp: mix(self.bypass_amp, next.bypass_amp),
            formant_freq: mix_all(&self.formant_freq, &next.formant_freq),
            formant_bw: mix_all(&self.formant_bw, &next.formant_bw),
            formant_amp: mix_all(&self.formant_amp, &next.formant_amp),
            nasal_pole_freq: mix(self.nasal_pole_freq, next.nasal_pole_freq),
            nasal_pole_bw: mix(self.nasal_pole_bw, next.nasal_pole_bw),
            nasal_zero_freq: mix(self.nasal_zero_freq, next.nasal_zero_freq),
            nasal_zero_bw: mix(self.nasal_zero_bw, next.nasal_zero_bw),
            nasal_amp: mix(self.nasal_amp, next.nasal_amp),
            gain: mix(self.gain, next.gain),
        }
    }
}

fn check_frequency(name: &'static str, f: f64, nyquist: f64) -> SynthResult<()> {
    if f > 0.0 && f < nyquist {
        Ok(())
    } else {
        Err(SynthError::invalid_param(
            name,
            f,
            "frequency must lie between 0 Hz and the Nyquist frequency",
        ))
    }
}

fn check_bandwidth(name: &'static str, bw: f64, sample_rate: f64) -> SynthResult<()> {
    if !(bw > 0.0 && bw.is_finite()) {
        return Err(SynthError::invalid_param(
            name,
            bw,
            "bandwidth must be positive and finite",
        ));
    }
    // same stability limit the resonators apply when configured
    pole_radius(name, bw, sample_rate).map(drop)
}

fn check_amplitude(name: &'static str, amp: f64) -> SynthResult<()> {
    if amp >= 0.0 && amp.is_finite() {
        Ok(())
    } else {
        Err(SynthError::invalid_param(
            name,
            amp,
            "amplitude must be non-negative and finite",
        ))
    }
}
