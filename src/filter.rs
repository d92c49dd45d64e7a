//! Filter sections of the synthesizer: the two-pole resonator, the two-zero
//! anti-resonator, a first-order low-pass and a first-difference filter.

use core::f64::consts::PI;

use crate::error::{SynthError, SynthResult};
use crate::math::{cos, exp, fabs, pow, sin, sqrt};

/// A single filter section.
pub trait Filter {
    /// Performs one filter step.
    /// ### params
    /// ```text
    ///    x = Input signal value.
    /// ```
    /// ### returns
    ///    Output signal value.
    fn step(&mut self, x: f64) -> f64;

    /// Clears the delay registers, keeping the coefficients.
    fn reset(&mut self);

    /// Magnitude of the frequency response at `freq` Hz for the current coefficients.
    fn gain_at(&self, freq: f64) -> f64;
}

fn check_frequency(name: &'static str, f: f64, sample_rate: f64) -> SynthResult<()> {
    if f > 0.0 && f < sample_rate / 2.0 {
        Ok(())
    } else {
        Err(SynthError::invalid_param(
            name,
            f,
            "frequency must lie between 0 Hz and the Nyquist frequency",
        ))
    }
}

fn check_bandwidth(name: &'static str, bw: f64) -> SynthResult<()> {
    if bw > 0.0 && bw.is_finite() {
        Ok(())
    } else {
        Err(SynthError::invalid_param(
            name,
            bw,
            "bandwidth must be positive and finite",
        ))
    }
}

/// Pole radius for a bandwidth, rejected when the pole would not lie strictly inside
/// the unit circle.
pub(crate) fn pole_radius(name: &'static str, bw: f64, sample_rate: f64) -> SynthResult<f64> {
    let r = exp(-PI * bw / sample_rate);
    if r < 1.0 {
        Ok(r)
    } else {
        Err(SynthError::invalid_param(
            name,
            bw,
            "bandwidth too small, pole radius would reach 1",
        ))
    }
}

/// A first-order IIR LP filter.
///
/// # Formulas:
/// ## Variables:
/// ```text
///    x = input samples
///    y = output samples
///    a = first filter coefficient
///    b = second filter coefficient, >0 for LP filter, <0 for HP filter
///    f = frequency in Hz
///    w = 2 * PI * f / sampleRate
///    g = gain at frequency f
/// ```
/// ## Filter function:
/// ```text
///    y[n] = a * x[n] + b * y[n-1]
/// ```
/// ## Frequency response:
/// ```text
///    |H(w)| = a / sqrt(1 - 2b * cos(w) + b^2)
/// ```
/// ## Determine b for a given gain g at frequency f and |H(0)| = 1:
/// ```text
///    a = 1 - b
///    q = (1 - g^2 * cos(w)) / (1 - g^2)
///    b^2 - 2 * q * b + 1 = 0
///    b = q - sqrt(q^2 - 1)
/// ```
#[derive(Debug, Clone)]
pub struct LpFilter1 {
    sample_rate: f64,
    /// filter coefficient a
    a: f64,
    /// filter coefficient b
    b: f64,
    /// y[n-1], last output value
    y1: f64,
    passthrough: bool,
}

impl LpFilter1 {
    /// Creates a filter that passes its input through until [`LpFilter1::set`] is called.
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        LpFilter1 {
            sample_rate: f64::from(sample_rate),
            a: 0.0,
            b: 0.0,
            y1: 0.0,
            passthrough: true,
        }
    }

    /// Adjusts the filter parameters without resetting the inner state.
    /// ### params
    /// ```text
    ///    f = Frequency at which the gain is specified.
    ///    g = Gain at frequency f. Between 0 and 1.
    ///    extra_gain = Extra gain factor. This is the resulting DC gain.
    /// ```
    /// The resulting gain at `f` will be `g * extra_gain`.
    ///
    /// # Errors
    ///
    /// [`SynthError::InvalidParameter`] if `f` is not below Nyquist or `g` is not in (0, 1).
    pub fn set(&mut self, f: f64, g: f64, extra_gain: f64) -> SynthResult<()> {
        check_frequency("low_pass_frequency", f, self.sample_rate)?;
        if !(g > 0.0 && g < 1.0) {
            return Err(SynthError::invalid_param(
                "low_pass_gain",
                g,
                "gain must lie strictly between 0 and 1",
            ));
        }
        if !extra_gain.is_finite() {
            return Err(SynthError::invalid_param(
                "low_pass_extra_gain",
                extra_gain,
                "gain must be finite",
            ));
        }

        let w = 2.0 * PI * f / self.sample_rate;
        let q = (1.0 - pow(g, 2.0) * cos(w)) / (1.0 - pow(g, 2.0));
        self.b = q - sqrt(pow(q, 2.0) - 1.0);
        self.a = (1.0 - self.b) * extra_gain;
        self.passthrough = false;
        Ok(())
    }

    /// Makes the filter pass its input through unchanged and clears its state.
    pub fn set_passthrough(&mut self) {
        self.passthrough = true;
        self.y1 = 0.0;
    }
}

impl Filter for LpFilter1 {
    fn step(&mut self, x: f64) -> f64 {
        if self.passthrough {
            return x;
        }
        let y = self.a * x + self.b * self.y1;
        self.y1 = y;
        y
    }

    fn reset(&mut self) {
        self.y1 = 0.0;
    }

    fn gain_at(&self, freq: f64) -> f64 {
        if self.passthrough {
            return 1.0;
        }
        let w = 2.0 * PI * freq / self.sample_rate;
        fabs(self.a) / sqrt(1.0 - 2.0 * self.b * cos(w) + pow(self.b, 2.0))
    }
}

/// A Klatt resonator.
/// This is a second order IIR filter.
/// With f=0 it can also be used as a low-pass filter.
///
/// # Formulas:
/// ## Variables:
/// ```text
///    x = input samples
///    y = output samples
///    a/b/c = filter coefficients
///    f0 = resonator frequency in Hz
///    w0 = 2 * PI * f0 / sampleRate
///    bw = Bandwidth in Hz
///    r = exp(- PI * bw / sampleRate)
/// ```
/// ## Filter function:
/// ```text
///    y[n] = a * x[n] + b * y[n-1] + c * y[n-2]
/// ```
/// ## Frequency response:
/// ```text
///    |H(w)| = a / ( sqrt(1 + r^2 - 2 * r * cos(w - w0)) * sqrt(1 + r^2 - 2 * r * cos(w + w0)) )
/// ```
/// ## Gain at DC:
/// ```text
///    |H(0)| = a / (1 - c - b)
/// ```
/// ## Gain at the resonance frequency:
/// ```text
///    |H(f0)| = a / ( (1 - r) * sqrt(1 + r^2 - 2 * r * cos(2 * w0)) )
/// ```
#[derive(Debug, Clone)]
pub struct Resonator {
    sample_rate: f64,
    /// filter coefficient a
    a: f64,
    /// filter coefficient b
    b: f64,
    /// filter coefficient c
    c: f64,
    /// y[n-1], last output value
    y1: f64,
    /// y[n-2], second-last output value
    y2: f64,
    /// pole radius
    r: f64,
    /// pole angle
    w0: f64,
}

impl Resonator {
    /// A resonator with zeroed coefficients; it outputs silence until configured.
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        Resonator {
            sample_rate: f64::from(sample_rate),
            a: 0.0,
            b: 0.0,
            c: 0.0,
            y1: 0.0,
            y2: 0.0,
            r: 0.0,
            w0: 0.0,
        }
    }

    /// Adjusts the filter parameters without resetting the inner state.
    /// The DC gain is normalized to 1.
    /// ### params
    /// ```text
    ///    center_hz = Frequency of resonator in Hz, in (0, Nyquist).
    ///    bandwidth_hz = Bandwidth of resonator in Hz, > 0.
    /// ```
    ///
    /// # Errors
    ///
    /// [`SynthError::InvalidParameter`] if the values would not give a stable section.
    /// The resonator is left unchanged.
    pub fn configure(&mut self, center_hz: f64, bandwidth_hz: f64) -> SynthResult<()> {
        check_frequency("center_frequency", center_hz, self.sample_rate)?;
        check_bandwidth("bandwidth", bandwidth_hz)?;
        let r = pole_radius("bandwidth", bandwidth_hz, self.sample_rate)?;
        self.set_poles(r, 2.0 * PI * center_hz / self.sample_rate);
        Ok(())
    }

    /// Configures the resonator with its poles on the real axis (f = 0), which makes it a
    /// second order low-pass filter with unit DC gain.
    ///
    /// # Errors
    ///
    /// [`SynthError::InvalidParameter`] if the bandwidth is not positive.
    pub fn configure_low_pass(&mut self, bandwidth_hz: f64) -> SynthResult<()> {
        check_bandwidth("bandwidth", bandwidth_hz)?;
        let r = pole_radius("bandwidth", bandwidth_hz, self.sample_rate)?;
        self.set_poles(r, 0.0);
        Ok(())
    }

    fn set_poles(&mut self, r: f64, w0: f64) {
        self.r = r;
        self.w0 = w0;
        self.c = -pow(r, 2.0);
        self.b = 2.0 * r * cos(w0);
        self.a = 1.0 - self.b - self.c;
    }

    /// Overrides the input coefficient `a`.
    pub fn set_impulse_gain(&mut self, a: f64) {
        self.a = a;
    }

    /// Scales the input so that the gain at the resonance frequency is `peak_gain`.
    ///
    /// # Errors
    ///
    /// [`SynthError::InvalidParameter`] for a negative or non-finite gain.
    pub fn set_peak_gain(&mut self, peak_gain: f64) -> SynthResult<()> {
        if !(peak_gain >= 0.0 && peak_gain.is_finite()) {
            return Err(SynthError::invalid_param(
                "peak_gain",
                peak_gain,
                "gain must be non-negative and finite",
            ));
        }
        let r = self.r;
        let conjugate = sqrt(1.0 + r * r - 2.0 * r * cos(2.0 * self.w0));
        self.a = peak_gain * (1.0 - r) * conjugate;
        Ok(())
    }

    /// Radius of the conjugate pole pair; always below 1 once configured.
    #[must_use]
    pub fn pole_radius(&self) -> f64 {
        self.r
    }
}

impl Filter for Resonator {
    fn step(&mut self, x: f64) -> f64 {
        let y = self.a * x + self.b * self.y1 + self.c * self.y2;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }

    fn reset(&mut self) {
        self.y1 = 0.0;
        self.y2 = 0.0;
    }

    fn gain_at(&self, freq: f64) -> f64 {
        let w = 2.0 * PI * freq / self.sample_rate;
        let r = self.r;
        let lower = sqrt(1.0 + r * r - 2.0 * r * cos(w - self.w0));
        let upper = sqrt(1.0 + r * r - 2.0 * r * cos(w + self.w0));
        fabs(self.a) / (lower * upper)
    }
}

/// A Klatt anti-resonator.
/// This is a second order FIR filter, the inverse of a [`Resonator`] with the same
/// frequency and bandwidth.
///
/// # Formulas:
/// ```text
///    y[n] = a * x[n] + b * x[n-1] + c * x[n-2]
///    H(w) = a + b * e^(-jw) + c * e^(-2jw)
/// ```
#[derive(Debug, Clone)]
pub struct AntiResonator {
    sample_rate: f64,
    /// filter coefficient a
    a: f64,
    /// filter coefficient b
    b: f64,
    /// filter coefficient c
    c: f64,
    /// x[n-1], last input value
    x1: f64,
    /// x[n-2], second-last input value
    x2: f64,
}

impl AntiResonator {
    /// An anti-resonator that passes its input through until configured.
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        AntiResonator {
            sample_rate: f64::from(sample_rate),
            a: 1.0,
            b: 0.0,
            c: 0.0,
            x1: 0.0,
            x2: 0.0,
        }
    }

    /// Adjusts the filter parameters without resetting the inner state.
    ///
    /// # Errors
    ///
    /// [`SynthError::InvalidParameter`] for a frequency outside (0, Nyquist) or a
    /// non-positive bandwidth.
    pub fn configure(&mut self, center_hz: f64, bandwidth_hz: f64) -> SynthResult<()> {
        check_frequency("center_frequency", center_hz, self.sample_rate)?;
        check_bandwidth("bandwidth", bandwidth_hz)?;
        let r = pole_radius("bandwidth", bandwidth_hz, self.sample_rate)?;
        let w = 2.0 * PI * center_hz / self.sample_rate;
        let c0 = -(r * r);
        let b0 = 2.0 * r * cos(w);
        let a0 = 1.0 - b0 - c0;
        self.a = 1.0 / a0;
        self.b = -b0 / a0;
        self.c = -c0 / a0;
        Ok(())
    }
}

impl Filter for AntiResonator {
    fn step(&mut self, x: f64) -> f64 {
        let y = self.a * x + self.b * self.x1 + self.c * self.x2;
        self.x2 = self.x1;
        self.x1 = x;
        y
    }

    fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
    }

    fn gain_at(&self, freq: f64) -> f64 {
        let w = 2.0 * PI * freq / self.sample_rate;
        let re = self.a + self.b * cos(w) + self.c * cos(2.0 * w);
        let im = self.b * sin(w) + self.c * sin(2.0 * w);
        sqrt(re * re + im * im)
    }
}

/// A differencing filter.
/// This is a first-order FIR HP filter, used as the parallel branch correction
/// for the higher formants and as the radiation stage at the output.
///
/// # Formulas:
/// ```text
///    y[n] = x[n] - x[n-1]
///    |H(w)| = sqrt(2 - 2 * cos(w))
/// ```
#[derive(Debug, Clone)]
pub struct DifferencingFilter {
    sample_rate: f64,
    /// x[n-1], last input value
    x1: f64,
}

impl DifferencingFilter {
    /// A differencing filter with a cleared delay register.
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        DifferencingFilter {
            sample_rate: f64::from(sample_rate),
            x1: 0.0,
        }
    }
}

impl Filter for DifferencingFilter {
    fn step(&mut self, x: f64) -> f64 {
        let y = x - self.x1;
        self.x1 = x;
        y
    }

    fn reset(&mut self) {
        self.x1 = 0.0;
    }

    fn gain_at(&self, freq: f64) -> f64 {
        let w = 2.0 * PI * freq / self.sample_rate;
        sqrt(2.0 - 2.0 * cos(w))
    }
}
