//! The cascade/parallel resonator network.
//!
//! ```text
//!  cascade ─► nasal zero ─► nasal pole ─► F1 ─► F2 ─► … ─► FN ──────────────┐
//!                                                                          │
//!  parallel ─┬─► nasal (AN) ───────────────────────────────────────────(+)─┤
//!            ├─► F1 (A1) ──────────────────────────────────────────────(+)─┤
//!            └─► difference ─(+ frication)─┬─► F2 (A2) ────────────────(−)─┤
//!                                          ├─► F3 (A3) ────────────────(+)─┼─► radiation ─► out
//!                                          ├─► …                           │
//!                                          └─► bypass (AB) ────────────(+)─┘
//! ```

use alloc::vec::Vec;

use crate::config::{MAX_FORMANTS, SynthConfig};
use crate::error::SynthResult;
use crate::filter::{AntiResonator, DifferencingFilter, Filter, Resonator};
use crate::frame::ControlFrame;
use crate::source::Excitation;

/// Static wiring of the network, derived from the configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkTopology {
    sample_rate: u32,
    cascade_formants: usize,
    parallel_formants: usize,
    /// polarity of each parallel formant (refer to Klatt (1980) Fig. 13)
    parallel_signs: [f64; MAX_FORMANTS],
}

impl NetworkTopology {
    /// Formant counts from `config`, with signs alternating from + on F1.
    #[must_use]
    pub fn new(config: &SynthConfig) -> Self {
        NetworkTopology {
            sample_rate: config.sample_rate,
            cascade_formants: config.cascade_formants.min(MAX_FORMANTS),
            parallel_formants: config.parallel_formants.min(MAX_FORMANTS),
            parallel_signs: core::array::from_fn(|i| if i % 2 == 0 { 1.0 } else { -1.0 }),
        }
    }

    /// Number of formant resonators in the cascade branch. 0 disables the branch.
    #[must_use]
    pub fn cascade_formants(&self) -> usize {
        self.cascade_formants
    }

    /// Number of formant resonators in the parallel branch.
    #[must_use]
    pub fn parallel_formants(&self) -> usize {
        self.parallel_formants
    }

    /// Sign applied to parallel formant `index` (0 = F1) before summing.
    #[must_use]
    pub fn parallel_sign(&self, index: usize) -> f64 {
        self.parallel_signs[index]
    }
}

/// Resonator state for one synthesis run.
#[derive(Debug, Clone)]
pub struct ResonatorNetwork {
    topology: NetworkTopology,

    // Cascade branch:
    /// nasal antiformant filter for cascade branch
    nasal_zero: AntiResonator,
    /// nasal formant filter for cascade branch
    nasal_pole: Resonator,
    /// oral formant filters for cascade branch
    cascade: Vec<Resonator>,

    // Parallel branch:
    /// nasal formant filter for parallel branch
    nasal_parallel: Resonator,
    /// oral formant filters for parallel branch
    parallel: Vec<Resonator>,
    /// differencing filter feeding F2 and above and the bypass
    parallel_difference: DifferencingFilter,

    /// first difference at the output, approximates lip radiation
    radiation: DifferencingFilter,
}

impl ResonatorNetwork {
    /// Builds the network. All resonators output silence until
    /// [`ResonatorNetwork::configure`] has been called.
    #[must_use]
    pub fn new(config: &SynthConfig) -> Self {
        let topology = NetworkTopology::new(config);
        let sample_rate = topology.sample_rate;
        ResonatorNetwork {
            nasal_zero: AntiResonator::new(sample_rate),
            nasal_pole: Resonator::new(sample_rate),
            cascade: (0..topology.cascade_formants)
                .map(|_| Resonator::new(sample_rate))
                .collect(),
            nasal_parallel: Resonator::new(sample_rate),
            parallel: (0..topology.parallel_formants)
                .map(|_| Resonator::new(sample_rate))
                .collect(),
            parallel_difference: DifferencingFilter::new(sample_rate),
            radiation: DifferencingFilter::new(sample_rate),
            topology,
        }
    }

    #[must_use]
    pub fn topology(&self) -> &NetworkTopology {
        &self.topology
    }

    /// Recomputes all coefficients from `frame`. Filter registers are kept, so this can
    /// run on every sample.
    ///
    /// # Errors
    ///
    /// [`crate::SynthError::InvalidParameter`] if a frequency or bandwidth would make a
    /// section unstable. Frames that passed [`ControlFrame::validate`] never fail.
    pub fn configure(&mut self, frame: &ControlFrame) -> SynthResult<()> {
        if !self.cascade.is_empty() {
            self.nasal_zero
                .configure(frame.nasal_zero_freq, frame.nasal_zero_bw)?;
            self.nasal_pole
                .configure(frame.nasal_pole_freq, frame.nasal_pole_bw)?;
        }
        for (i, resonator) in self.cascade.iter_mut().enumerate() {
            resonator.configure(frame.formant_freq[i], frame.formant_bw[i])?;
        }

        self.nasal_parallel
            .configure(frame.nasal_pole_freq, frame.nasal_pole_bw)?;
        self.nasal_parallel.set_peak_gain(frame.nasal_amp)?;
        for (i, resonator) in self.parallel.iter_mut().enumerate() {
            let f = frame.formant_freq[i];
            resonator.configure(f, frame.formant_bw[i])?;
            // compensate differencing filter for F2 to F6
            let peak_gain = if i == 0 {
                frame.formant_amp[i]
            } else {
                frame.formant_amp[i] / self.parallel_difference.gain_at(f)
            };
            resonator.set_peak_gain(peak_gain)?;
        }
        Ok(())
    }

    /// Filters one excitation sample through both branches and the radiation stage.
    /// `frame` supplies the bypass amplitude; coefficients come from the last
    /// [`ResonatorNetwork::configure`].
    pub fn step(&mut self, excitation: &Excitation, frame: &ControlFrame) -> f64 {
        let cascade_out = self.step_cascade(excitation.cascade);
        let parallel_out = self.step_parallel(excitation, frame.bypass_amp);
        self.radiation.step(cascade_out + parallel_out)
    }

    fn step_cascade(&mut self, input: f64) -> f64 {
        if self.cascade.is_empty() {
            return 0.0;
        }
        let mut v = self.nasal_zero.step(input);
        v = self.nasal_pole.step(v);
        for resonator in &mut self.cascade {
            v = resonator.step(v);
        }
        v
    }

    fn step_parallel(&mut self, excitation: &Excitation, bypass_amp: f64) -> f64 {
        let source = excitation.parallel;
        // Klatt (1980): "... using a first difference calculation to remove low-frequency energy from
        // the higher formants; this energy would otherwise distort the spectrum in the region of F1 during
        // the synthesis of some vowels."
        let source_difference = self.parallel_difference.step(source) + excitation.frication;

        let mut v = self.nasal_parallel.step(source);
        for (i, resonator) in self.parallel.iter_mut().enumerate() {
            let input = if i == 0 { source } else { source_difference };
            v += self.topology.parallel_signs[i] * resonator.step(input);
        }
        v + bypass_amp * source_difference
    }

    /// Clears every filter register.
    pub fn reset(&mut self) {
        self.nasal_zero.reset();
        self.nasal_pole.reset();
        self.cascade.iter_mut().for_each(Filter::reset);
        self.nasal_parallel.reset();
        self.parallel.iter_mut().for_each(Filter::reset);
        self.parallel_difference.reset();
        self.radiation.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(cascade: usize, parallel: usize) -> SynthConfig {
        SynthConfig {
            cascade_formants: cascade,
            parallel_formants: parallel,
            ..SynthConfig::default()
        }
    }

    fn cascade_impulse(n: usize) -> Excitation {
        Excitation {
            cascade: if n == 0 { 1.0 } else { 0.0 },
            ..Excitation::default()
        }
    }

    #[test]
    fn parallel_polarity_alternates() {
        let topology = NetworkTopology::new(&SynthConfig::default());
        let signs: [f64; MAX_FORMANTS] = core::array::from_fn(|i| topology.parallel_sign(i));
        assert_eq!(signs, [1.0, -1.0, 1.0, -1.0, 1.0, -1.0]);
        assert_eq!(topology.cascade_formants(), 5);
        assert_eq!(topology.parallel_formants(), 6);
    }

    #[test]
    fn silence_in_silence_out() {
        let mut network = ResonatorNetwork::new(&SynthConfig::default());
        let frame = ControlFrame {
            formant_amp: [1.0; MAX_FORMANTS],
            nasal_amp: 1.0,
            bypass_amp: 1.0,
            ..ControlFrame::default()
        };
        network.configure(&frame).unwrap();
        for _ in 0..100 {
            assert_eq!(network.step(&Excitation::default(), &frame), 0.0);
        }
    }

    #[test]
    fn equal_nasal_pole_and_zero_cancel() {
        let config = config(1, 0);
        let frame = ControlFrame::default();
        let mut network = ResonatorNetwork::new(&config);
        network.configure(&frame).unwrap();

        let mut f1 = Resonator::new(config.sample_rate);
        f1.configure(frame.formant_freq[0], frame.formant_bw[0]).unwrap();
        let mut radiation = DifferencingFilter::new(config.sample_rate);

        for n in 0..400 {
            let exc = cascade_impulse(n);
            let expected = radiation.step(f1.step(exc.cascade));
            let actual = network.step(&exc, &frame);
            assert!((actual - expected).abs() < 1e-9, "sample {n}: {actual} != {expected}");
        }
    }

    #[test]
    fn disabled_cascade_ignores_cascade_excitation() {
        let mut network = ResonatorNetwork::new(&config(0, 6));
        let frame = ControlFrame::default();
        network.configure(&frame).unwrap();
        for n in 0..50 {
            assert_eq!(network.step(&cascade_impulse(n), &frame), 0.0);
        }
    }

    #[test]
    fn bypass_passes_frication_through_radiation() {
        let mut network = ResonatorNetwork::new(&SynthConfig::default());
        let frame = ControlFrame {
            bypass_amp: 1.0,
            ..ControlFrame::default()
        };
        network.configure(&frame).unwrap();
        let noise = |frication: f64| Excitation {
            frication,
            ..Excitation::default()
        };
        assert_eq!(network.step(&noise(0.5), &frame), 0.5);
        assert_eq!(network.step(&noise(0.0), &frame), -0.5);
        assert_eq!(network.step(&noise(0.0), &frame), 0.0);
    }

    #[test]
    fn parallel_formant_amplitude_scales_output() {
        let energy = |amp: f64| -> f64 {
            let mut network = ResonatorNetwork::new(&config(0, 3));
            let mut frame = ControlFrame::default();
            frame.formant_amp[1] = amp;
            network.configure(&frame).unwrap();
            (0..2000)
                .map(|n| {
                    let exc = Excitation {
                        parallel: if n % 100 == 0 { 1.0 } else { 0.0 },
                        ..Excitation::default()
                    };
                    network.step(&exc, &frame).powi(2)
                })
                .sum()
        };
        assert_eq!(energy(0.0), 0.0);
        let quiet = energy(0.1);
        let loud = energy(0.2);
        assert!(quiet > 0.0);
        assert!((loud / quiet - 4.0).abs() < 1e-6);
    }

    #[test]
    fn impulse_response_decays() {
        let mut network = ResonatorNetwork::new(&SynthConfig::default());
        let frame = ControlFrame::default();
        network.configure(&frame).unwrap();
        let mut last = 0.0;
        for n in 0..40_000 {
            last = network.step(&cascade_impulse(n), &frame);
            assert!(last.is_finite());
        }
        assert!(last.abs() < 1e-9);
    }

    #[test]
    fn per_sample_reconfiguration_stays_bounded() {
        let mut network = ResonatorNetwork::new(&SynthConfig::default());
        let mut peak: f64 = 0.0;
        for n in 0..16_000 {
            let t = n as f64 / 16_000.0;
            let mut frame = ControlFrame::default();
            frame.formant_freq[0] = 300.0 + 600.0 * t;
            frame.formant_freq[1] = 2200.0 - 1200.0 * t;
            frame.formant_bw[0] = 40.0 + 80.0 * t;
            network.configure(&frame).unwrap();
            let exc = Excitation {
                cascade: if n % 133 == 0 { 1.0 } else { 0.0 },
                ..Excitation::default()
            };
            peak = peak.max(network.step(&exc, &frame).abs());
        }
        assert!(peak.is_finite());
        assert!(peak < 100.0, "peak {peak}");
    }
}
