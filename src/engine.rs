//! The synthesis engine: ties scheduler, voicing source and resonator network together
//! and hands out samples.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, trace, warn};

use crate::config::{SampleFormat, SynthConfig};
use crate::error::{SynthError, SynthResult};
use crate::frame::ControlFrame;
use crate::math::round;
use crate::network::ResonatorNetwork;
use crate::scheduler::FrameScheduler;
use crate::source::VoicingSource;

/// Shared flag that stops a running [`SampleStream`].
///
/// Clones share the flag, so one clone can be moved to another thread and cancel a
/// stream owned elsewhere.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Takes effect before the next sample.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether [`CancelToken::cancel`] has been called on this token or a clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Rendered output in the configured [`SampleFormat`].
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    /// Samples clamped to [-1, 1].
    Float(Vec<f64>),
    /// 16 bit PCM.
    Int16(Vec<i16>),
}

impl Samples {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Samples::Float(samples) => samples.len(),
            Samples::Int16(samples) => samples.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Converts a sample to 16 bit PCM. Values beyond [-1, 1] saturate.
#[must_use]
pub fn to_int16(x: f64) -> i16 {
    round(x.clamp(-1.0, 1.0) * f64::from(i16::MAX)) as i16
}

/// A configured synthesizer.
///
/// The synthesizer itself holds no signal state; every call to
/// [`Synthesizer::synthesize`] starts from silence, so one instance can serve any
/// number of tracks, also from several threads.
#[derive(Debug, Clone)]
pub struct Synthesizer {
    config: SynthConfig,
}

impl Synthesizer {
    /// # Errors
    ///
    /// [`SynthError::Configuration`] if the configuration is invalid.
    pub fn new(config: SynthConfig) -> SynthResult<Self> {
        config.validate()?;
        Ok(Synthesizer { config })
    }

    #[must_use]
    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    /// Validates the whole track and returns a lazy stream of its samples.
    ///
    /// # Errors
    ///
    /// [`SynthError::EmptyTrack`] for a track without frames, or
    /// [`SynthError::InvalidParameter`] tagged with the index of the first bad frame.
    /// No sample is produced in either case.
    pub fn synthesize<'a>(&self, track: &'a [ControlFrame]) -> SynthResult<SampleStream<'a>> {
        let scheduler = FrameScheduler::new(track, &self.config)?;
        for (i, frame) in track.iter().enumerate() {
            frame.validate(&self.config).map_err(|e| e.in_frame(i))?;
        }
        let stream = SampleStream::new(scheduler, &self.config)?;
        debug!(
            "synthesizing {} frames into {} samples at {} Hz ({:?} pulse, {} cascade / {} parallel formants)",
            track.len(),
            stream.total_samples(),
            self.config.sample_rate,
            self.config.glottal_pulse,
            self.config.cascade_formants,
            self.config.parallel_formants,
        );
        Ok(stream)
    }

    /// Synthesizes the whole track into a buffer of unclamped samples.
    ///
    /// # Errors
    ///
    /// See [`Synthesizer::synthesize`]; additionally [`SynthError::Fault`] if the
    /// output diverges.
    pub fn render(&self, track: &[ControlFrame]) -> SynthResult<Vec<f64>> {
        let stream = self.synthesize(track)?;
        let mut out = Vec::with_capacity(stream.total_samples());
        for sample in stream {
            out.push(sample?);
        }
        Ok(out)
    }

    /// Synthesizes the whole track and formats it as configured by
    /// [`SynthConfig::sample_format`].
    ///
    /// # Errors
    ///
    /// Same as [`Synthesizer::render`].
    pub fn render_output(&self, track: &[ControlFrame]) -> SynthResult<Samples> {
        let samples = self.render(track)?;
        Ok(match self.config.sample_format {
            SampleFormat::Float => {
                Samples::Float(samples.into_iter().map(|x| x.clamp(-1.0, 1.0)).collect())
            }
            SampleFormat::Int16 => Samples::Int16(samples.into_iter().map(to_int16).collect()),
        })
    }
}

/// Streams `track` with the default configuration at `sample_rate`.
///
/// Use [`Synthesizer::render`] to collect the whole track into a buffer.
///
/// # Errors
///
/// Same as [`Synthesizer::new`] and [`Synthesizer::synthesize`].
pub fn synthesize(track: &[ControlFrame], sample_rate: u32) -> SynthResult<SampleStream<'_>> {
    Synthesizer::new(SynthConfig::with_sample_rate(sample_rate))?.synthesize(track)
}

/// Per-run synthesis state, yielding one sample per call to `next`.
///
/// After an error has been yielded the stream ends.
#[derive(Debug, Clone)]
pub struct SampleStream<'a> {
    scheduler: FrameScheduler<'a>,
    source: VoicingSource,
    network: ResonatorNetwork,
    cancel: Option<CancelToken>,
    finished: bool,
}

impl<'a> SampleStream<'a> {
    fn new(scheduler: FrameScheduler<'a>, config: &SynthConfig) -> SynthResult<Self> {
        Ok(SampleStream {
            scheduler,
            source: VoicingSource::new(config)?,
            network: ResonatorNetwork::new(config),
            cancel: None,
            finished: false,
        })
    }

    /// Attaches a cancel token, checked before every sample.
    #[must_use]
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Number of samples the full track produces.
    #[must_use]
    pub fn total_samples(&self) -> usize {
        self.scheduler.total_samples()
    }

    /// Number of samples produced so far.
    #[must_use]
    pub fn position(&self) -> usize {
        self.scheduler.position()
    }

    /// Writes the next samples into `buf` and returns how many were written. Fewer than
    /// `buf.len()` means the track is exhausted.
    ///
    /// # Errors
    ///
    /// The first error the stream yields. Samples already written stay in `buf`.
    pub fn fill(&mut self, buf: &mut [f64]) -> SynthResult<usize> {
        let mut written = 0;
        for slot in buf.iter_mut() {
            match self.next() {
                Some(sample) => *slot = sample?,
                None => break,
            }
            written += 1;
        }
        Ok(written)
    }

    fn fault(&mut self, sample_index: usize, reason: &'static str) -> SynthError {
        self.finished = true;
        warn!("synthesis aborted at sample {sample_index}: {reason}");
        SynthError::Fault {
            sample_index,
            reason,
        }
    }

    fn next_sample(&mut self) -> Option<SynthResult<f64>> {
        let sample_index = self.scheduler.position();
        let Some(scheduled) = self.scheduler.next() else {
            self.finished = true;
            debug!("synthesis finished after {sample_index} samples");
            return None;
        };
        let frame = &scheduled.frame;
        if scheduled.sample_in_frame == 0 {
            trace!(
                "frame {} starts at sample {sample_index}",
                scheduled.frame_index
            );
        }

        if scheduled.changed
            && let Err(err) = self.network.configure(frame)
        {
            warn!("{err}");
            return Some(Err(
                self.fault(sample_index, "resonator network reconfiguration failed")
            ));
        }
        let excitation = match self.source.step(frame) {
            Ok(excitation) => excitation,
            Err(err) => {
                warn!("{err}");
                return Some(Err(self.fault(sample_index, "voicing source update failed")));
            }
        };
        let sample = self.network.step(&excitation, frame) * frame.gain;
        if !sample.is_finite() {
            return Some(Err(self.fault(sample_index, "non-finite output sample")));
        }
        Some(Ok(sample))
    }
}

impl Iterator for SampleStream<'_> {
    type Item = SynthResult<f64>;

    fn next(&mut self) -> Option<SynthResult<f64>> {
        if self.finished {
            return None;
        }
        let cancelled = self.cancel.as_ref().is_some_and(CancelToken::is_cancelled);
        if cancelled && self.scheduler.len() > 0 {
            self.finished = true;
            let sample_index = self.scheduler.position();
            info!("synthesis cancelled at sample {sample_index}");
            return Some(Err(SynthError::Cancelled { sample_index }));
        }
        self.next_sample()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.finished {
            (0, Some(0))
        } else {
            (0, Some(self.scheduler.len()))
        }
    }
}

impl core::iter::FusedIterator for SampleStream<'_> {}
