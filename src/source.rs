//! Voicing source: glottal pulse generation plus aspiration and frication noise.

use core::f64::consts::PI;

use rand::Rng;
use rand_pcg::Pcg32;

use crate::config::{GlottalPulse, SynthConfig};
use crate::error::SynthResult;
use crate::filter::{Filter, LpFilter1, Resonator};
use crate::frame::ControlFrame;
use crate::math::{cos, db_to_lin, perform_frequency_modulation, pow, round, sqrt};

const ASPIRATION_STREAM: u64 = 1;
const FRICATION_STREAM: u64 = 2;
const GLOTTAL_NOISE_STREAM: u64 = 3;

/// Share of the open phase spent opening in the Fant model (0.36 / (0.36 + 0.26)).
const FANT_OPENING_SHARE: f64 = 0.58;
/// Share of the open phase spent opening in the Maeda model (0.5 / (0.5 + 0.2)).
const MAEDA_OPENING_SHARE: f64 = 0.5 / 0.7;

//--- Noise sources ------------------------------------------------------------

/// Returns a random number within the range -1 .. 1.
fn get_white_noise<R: Rng>(rng: &mut R) -> f64 {
    rng.random_range(-1.0..=1.0)
}

/// A low-pass filtered noise source.
#[derive(Debug, Clone)]
struct LpNoiseSource<R> {
    lp_filter: LpFilter1,
    rng: R,
}

impl<R: Rng> LpNoiseSource<R> {
    fn new(sample_rate: u32, rng: R) -> SynthResult<Self> {
        // Classic Klatt noise used a first order LP filter with b = 0.75 at 10 kHz.
        // Keep its gain at 1 kHz and reproduce it at our sample rate.
        let old_b = 0.75;
        let old_sample_rate = 10000.0;
        let f = 1000.0;
        let g = (1.0 - old_b)
            / sqrt(1.0 - 2.0 * old_b * cos(2.0 * PI * f / old_sample_rate) + pow(old_b, 2.0));

        // compensate amplitude for output range -1 .. +1
        let extra_gain = 2.5 * pow(f64::from(sample_rate) / 10000.0, 0.33);

        let mut lp_filter = LpFilter1::new(sample_rate);
        lp_filter.set(f, g, extra_gain)?;
        Ok(LpNoiseSource { lp_filter, rng })
    }

    /// Returns an LP-filtered random number.
    fn get_next(&mut self) -> f64 {
        let x = get_white_noise(&mut self.rng);
        self.lp_filter.step(x)
    }
}

//--- Glottal pulses -----------------------------------------------------------

/// Where the source is within the current glottal cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlottalPhase {
    /// Folds closed, no glottal flow.
    Closed,
    /// Folds open, the pulse is being emitted.
    Open,
}

/// Generates a glottal source signal by LP filtering a pulse train.
#[derive(Debug, Clone)]
struct ImpulsiveGlottalSource {
    /// resonator used as an LP filter
    resonator: Resonator,
    /// current sample position within F0 period
    position_in_period: usize,
}

impl ImpulsiveGlottalSource {
    fn start_period(&mut self, sample_rate: u32, open_phase_length: usize) -> SynthResult<()> {
        let bw = f64::from(sample_rate) / open_phase_length as f64;
        self.resonator.configure_low_pass(bw)?;
        self.resonator.set_impulse_gain(1.0);
        self.position_in_period = 0;
        Ok(())
    }

    fn get_next(&mut self) -> f64 {
        let pulse = match self.position_in_period {
            1 => 1.0,
            2 => -1.0,
            _ => 0.0,
        };
        self.position_in_period += 1;
        self.resonator.step(pulse)
    }
}

/// Generates a "natural" glottal source signal according to the KLGLOTT88 model.
/// Formula of the glottal flow: `t^2 - t^3`
/// Formula of the derivative: `2 * t - 3 * t^2`
/// The derivative is used as the glottal source.
///
/// At the end of the open glottal phase there is an abrupt jump from the minimum value to zero.
#[derive(Debug, Clone, Default)]
struct PolynomialGlottalSource {
    /// current signal value
    x: f64,
    /// current first derivative
    a: f64,
    /// current second derivative
    b: f64,
}

impl PolynomialGlottalSource {
    fn start_period(&mut self, open_phase_length: usize) {
        let amplification = 5.0;
        let n = open_phase_length as f64;
        self.x = 0.0;
        self.b = -amplification / (n * n);
        self.a = -self.b * n / 3.0;
    }

    fn get_next(&mut self, phase: GlottalPhase) -> f64 {
        if phase == GlottalPhase::Closed {
            self.x = 0.0;
            return 0.0;
        }
        self.a += self.b;
        self.x += self.a;
        self.x
    }
}

/// Closing curve of a [`GlottalAreaSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AreaModel {
    /// Fant: a shorter cosine segment.
    Fant,
    /// Maeda: a half cosine over a time axis warped by `t + warp * t^2`.
    Maeda,
}

impl AreaModel {
    /// Share of the open phase spent opening.
    fn opening_share(self) -> f64 {
        match self {
            AreaModel::Fant => FANT_OPENING_SHARE,
            AreaModel::Maeda => MAEDA_OPENING_SHARE,
        }
    }
}

/// Derivative of a glottal area model: a raised cosine opening followed by a closing
/// curve that reaches zero exactly at the end of the open phase.
#[derive(Debug, Clone)]
struct GlottalAreaSource {
    model: AreaModel,
    /// opening duration in samples
    opening: usize,
    /// closing duration in samples
    closing: usize,
    /// angular step, PI / opening
    step: f64,
    /// Fant: closing curve factor. Maeda: time warping factor.
    closing_factor: f64,
    /// output scale, keeps the derivative near unit amplitude
    scale: f64,
    /// previous flow value
    flow: f64,
    /// current sample position within F0 period
    position_in_period: usize,
}

impl GlottalAreaSource {
    fn new(model: AreaModel) -> Self {
        GlottalAreaSource {
            model,
            opening: 0,
            closing: 0,
            step: 0.0,
            closing_factor: 0.0,
            scale: 0.0,
            flow: 0.0,
            position_in_period: 0,
        }
    }

    fn start_period(&mut self, open_phase_length: usize) {
        self.opening = (round(open_phase_length as f64 * self.model.opening_share()) as usize)
            .clamp(1, open_phase_length);
        self.closing = open_phase_length - self.opening;
        self.step = PI / self.opening as f64;
        let closing = self.closing as f64;
        self.closing_factor = match self.model {
            _ if self.closing == 0 => 0.0,
            AreaModel::Fant => 1.0 / (1.0 - cos(self.step * closing)),
            // t + warp * t^2 reaches the opening length at the end of the closing
            AreaModel::Maeda => (self.opening as f64 - closing) / pow(closing, 2.0),
        };
        self.scale = open_phase_length as f64 / 2.0;
        self.flow = 0.0;
        self.position_in_period = 0;
    }

    fn closing_flow(&self, t: f64) -> f64 {
        match self.model {
            AreaModel::Fant => {
                1.0 - self.closing_factor + self.closing_factor * cos(self.step * t)
            }
            AreaModel::Maeda => {
                0.5 * (1.0 + cos(self.step * (t + self.closing_factor * pow(t, 2.0))))
            }
        }
    }

    fn get_next(&mut self, phase: GlottalPhase) -> f64 {
        let n = self.position_in_period;
        self.position_in_period += 1;
        let flow = if phase == GlottalPhase::Closed {
            0.0
        } else if n < self.opening {
            0.5 * (1.0 - cos(self.step * n as f64))
        } else if n < self.opening + self.closing {
            self.closing_flow((n - self.opening) as f64)
        } else {
            0.0
        };
        let derivative = flow - self.flow;
        self.flow = flow;
        derivative * self.scale
    }
}

#[derive(Debug, Clone)]
enum PulseGenerator {
    Impulsive(ImpulsiveGlottalSource),
    Polynomial(PolynomialGlottalSource),
    Area(GlottalAreaSource),
    Noise(Pcg32),
}

impl PulseGenerator {
    fn new(kind: GlottalPulse, sample_rate: u32, seed: u64) -> Self {
        match kind {
            GlottalPulse::Impulsive => PulseGenerator::Impulsive(ImpulsiveGlottalSource {
                resonator: Resonator::new(sample_rate),
                position_in_period: 0,
            }),
            GlottalPulse::Polynomial => {
                PulseGenerator::Polynomial(PolynomialGlottalSource::default())
            }
            GlottalPulse::Fant => PulseGenerator::Area(GlottalAreaSource::new(AreaModel::Fant)),
            GlottalPulse::Maeda => {
                PulseGenerator::Area(GlottalAreaSource::new(AreaModel::Maeda))
            }
            GlottalPulse::Noise => {
                PulseGenerator::Noise(Pcg32::new(seed, GLOTTAL_NOISE_STREAM))
            }
        }
    }

    fn start_period(&mut self, sample_rate: u32, open_phase_length: usize) -> SynthResult<()> {
        match self {
            PulseGenerator::Impulsive(source) => {
                source.start_period(sample_rate, open_phase_length)?;
            }
            PulseGenerator::Polynomial(source) => source.start_period(open_phase_length),
            PulseGenerator::Area(source) => source.start_period(open_phase_length),
            PulseGenerator::Noise(_) => {}
        }
        Ok(())
    }

    fn get_next(&mut self, phase: GlottalPhase) -> f64 {
        match self {
            PulseGenerator::Impulsive(source) => source.get_next(),
            PulseGenerator::Polynomial(source) => source.get_next(phase),
            PulseGenerator::Area(source) => source.get_next(phase),
            PulseGenerator::Noise(rng) => get_white_noise(rng),
        }
    }
}

//--- Voicing source -----------------------------------------------------------

/// One sample of excitation, split by destination in the resonator network.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Excitation {
    /// voicing scaled by AV plus aspiration, feeds the cascade branch
    pub cascade: f64,
    /// voicing scaled by AVP, feeds the parallel branch
    pub parallel: f64,
    /// frication noise scaled by AF, feeds the parallel branch only
    pub frication: f64,
}

/// Glottal excitation and noise generator.
///
/// F0, open quotient and spectral tilt are latched at the start of every glottal
/// period; amplitudes follow the frame on every sample.
#[derive(Debug, Clone)]
pub struct VoicingSource {
    sample_rate: u32,
    phase: GlottalPhase,
    /// period length in samples
    period_length: usize,
    /// open glottis phase length in samples
    open_phase_length: usize,
    /// current sample position within F0 period
    position_in_period: usize,
    /// current absolute sample position
    abs_position: usize,
    pulse: PulseGenerator,
    /// spectral tilt filter
    tilt_filter: LpFilter1,
    // Independent noise sources avoid cancellation effects of correlated signals.
    aspiration: LpNoiseSource<Pcg32>,
    frication: LpNoiseSource<Pcg32>,
}

impl VoicingSource {
    /// Creates a source in the closed phase; the first call to [`VoicingSource::step`]
    /// opens the first period.
    ///
    /// # Errors
    ///
    /// Fails if the sample rate is too low for the noise coloring filter.
    pub fn new(config: &SynthConfig) -> SynthResult<Self> {
        let sample_rate = config.sample_rate;
        Ok(VoicingSource {
            sample_rate,
            phase: GlottalPhase::Closed,
            period_length: 0,
            open_phase_length: 0,
            position_in_period: 0,
            abs_position: 0,
            pulse: PulseGenerator::new(config.glottal_pulse, sample_rate, config.seed),
            tilt_filter: LpFilter1::new(sample_rate),
            aspiration: LpNoiseSource::new(
                sample_rate,
                Pcg32::new(config.seed, ASPIRATION_STREAM),
            )?,
            frication: LpNoiseSource::new(sample_rate, Pcg32::new(config.seed, FRICATION_STREAM))?,
        })
    }

    #[must_use]
    pub fn phase(&self) -> GlottalPhase {
        self.phase
    }

    /// Length of the current glottal period in samples.
    #[must_use]
    pub fn period_length(&self) -> usize {
        self.period_length
    }

    /// Length of the open phase of the current period in samples.
    #[must_use]
    pub fn open_phase_length(&self) -> usize {
        self.open_phase_length
    }

    /// Produces one excitation sample and advances the glottal cycle by one sample.
    ///
    /// # Errors
    ///
    /// Fails if the latched tilt or pulse parameters cannot configure their filters,
    /// which validated frames rule out.
    pub fn step(&mut self, frame: &ControlFrame) -> SynthResult<Excitation> {
        if self.position_in_period >= self.period_length {
            self.start_period(frame)?;
        } else if self.phase == GlottalPhase::Open
            && self.position_in_period >= self.open_phase_length
        {
            self.phase = GlottalPhase::Closed;
        }

        let pulse = self.pulse.get_next(self.phase);
        let voice = self.tilt_filter.step(pulse);
        let aspiration = self.aspiration.get_next() * frame.aspiration_amp;
        let frication = self.frication.get_next() * frame.frication_amp;

        self.position_in_period += 1;
        self.abs_position += 1;

        Ok(Excitation {
            cascade: voice * frame.voicing_amp + aspiration,
            parallel: voice * frame.parallel_voicing_amp,
            frication,
        })
    }

    /// Starts a new F0 period.
    fn start_period(&mut self, frame: &ControlFrame) -> SynthResult<()> {
        let sample_rate = f64::from(self.sample_rate);
        let time = self.abs_position as f64 / sample_rate;
        let f0 = perform_frequency_modulation(frame.f0, frame.flutter, time);

        self.period_length = (round(sample_rate / f0) as usize).max(2);
        self.open_phase_length = (round(self.period_length as f64 * frame.open_quotient)
            as usize)
            .clamp(1, self.period_length - 1);
        self.position_in_period = 0;
        self.phase = GlottalPhase::Open;

        set_tilt_filter(&mut self.tilt_filter, frame.tilt_db, self.sample_rate)?;
        self.pulse
            .start_period(self.sample_rate, self.open_phase_length)
    }
}

fn set_tilt_filter(tilt_filter: &mut LpFilter1, tilt_db: f64, sample_rate: u32) -> SynthResult<()> {
    // tilts too small to move the gain below 1 leave the pulse untouched
    let gain = db_to_lin(-tilt_db);
    if gain >= 1.0 {
        tilt_filter.set_passthrough();
    } else {
        let corner = (0.375 * f64::from(sample_rate)).min(3000.0);
        tilt_filter.set(corner, gain, 1.0)?;
    }
    Ok(())
}
