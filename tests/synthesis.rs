use std::io::Cursor;

use formant_synth::{
    CancelToken, ControlFrame, GlottalPulse, Interpolation, SampleFormat, Samples, SynthConfig,
    SynthError, Synthesizer, synthesize,
};
use hound::{SampleFormat as WavSampleFormat, WavReader, WavSpec, WavWriter};

fn vowel(f0: f64) -> ControlFrame {
    ControlFrame {
        f0,
        ..ControlFrame::default()
    }
}

/// Voiced frames with a breathy, fricated mix so every noise source is active.
fn noisy_track(frames: usize) -> Vec<ControlFrame> {
    (0..frames)
        .map(|i| ControlFrame {
            f0: 110.0 + i as f64,
            aspiration_amp: 0.1,
            frication_amp: 0.05,
            formant_amp: [0.5, 0.3, 0.2, 0.1, 0.05, 0.02],
            flutter: 0.25,
            ..ControlFrame::default()
        })
        .collect()
}

/// A track whose F1 and F2 move by a fixed step every frame.
fn formant_ramp(frames: usize) -> Vec<ControlFrame> {
    (0..frames)
        .map(|i| {
            let mut frame = vowel(130.0);
            frame.formant_freq[0] = 300.0 + 50.0 * i as f64;
            frame.formant_freq[1] = 2200.0 - 100.0 * i as f64;
            frame
        })
        .collect()
}

#[test]
fn output_length_is_frames_times_samples_per_frame() {
    for (sample_rate, frame_ms, frames, expected) in [
        (16000, 10.0, 25, 4000),
        (22050, 5.0, 9, 9 * 110),
        (44100, 10.0, 3, 3 * 441),
    ] {
        let config = SynthConfig {
            sample_rate,
            frame_duration_ms: frame_ms,
            ..SynthConfig::default()
        };
        let synth = Synthesizer::new(config).unwrap();
        let track = noisy_track(frames);
        assert_eq!(synth.render(&track).unwrap().len(), expected);
        assert_eq!(synth.synthesize(&track).unwrap().total_samples(), expected);
    }
}

#[test]
fn single_frame_track_lasts_half_a_second() {
    let track = [vowel(120.0)];
    let stream = synthesize(&track, 16000).unwrap();
    assert_eq!(stream.total_samples(), 8000);
    assert_eq!(stream.count(), 8000);
}

#[test]
fn bulk_streaming_and_batched_output_are_identical() {
    let synth = Synthesizer::new(SynthConfig::default()).unwrap();
    let track = noisy_track(12);

    let bulk = synth.render(&track).unwrap();
    let streamed: Vec<f64> = synth
        .synthesize(&track)
        .unwrap()
        .map(Result::unwrap)
        .collect();

    let mut stream = synth.synthesize(&track).unwrap();
    let mut batched = Vec::new();
    let mut buf = [0.0; 97];
    loop {
        let n = stream.fill(&mut buf).unwrap();
        batched.extend_from_slice(&buf[..n]);
        if n < buf.len() {
            break;
        }
    }

    assert_eq!(bulk, streamed);
    assert_eq!(bulk, batched);
}

#[test]
fn fixed_seed_is_reproducible() {
    let config = SynthConfig {
        seed: 42,
        ..SynthConfig::default()
    };
    let track = noisy_track(10);
    let first = Synthesizer::new(config.clone()).unwrap().render(&track).unwrap();
    let second = Synthesizer::new(config).unwrap().render(&track).unwrap();
    assert_eq!(first, second);
}

#[test]
fn different_seed_changes_noisy_output() {
    let track = noisy_track(10);
    let render = |seed| {
        let config = SynthConfig {
            seed,
            ..SynthConfig::default()
        };
        Synthesizer::new(config).unwrap().render(&track).unwrap()
    };
    assert_ne!(render(1), render(2));
}

#[test]
fn every_pulse_shape_renders_finite_audio() {
    for glottal_pulse in [
        GlottalPulse::Impulsive,
        GlottalPulse::Polynomial,
        GlottalPulse::Fant,
        GlottalPulse::Maeda,
        GlottalPulse::Noise,
    ] {
        let config = SynthConfig {
            glottal_pulse,
            ..SynthConfig::default()
        };
        let samples = Synthesizer::new(config).unwrap().render(&noisy_track(8)).unwrap();
        assert!(samples.iter().all(|x| x.is_finite()), "{glottal_pulse:?}");
        assert!(samples.iter().any(|x| *x != 0.0), "{glottal_pulse:?}");
    }
}

#[test]
fn constant_vowel_is_periodic_at_f0() {
    // 100 Hz at 16 kHz is exactly 160 samples per period
    let track = [vowel(100.0)];
    let samples: Vec<f64> = synthesize(&track, 16000)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    let period = 160;
    let settled = &samples[4000..];

    for n in 0..settled.len() - period {
        assert!(
            (settled[n] - settled[n + period]).abs() < 1e-9,
            "sample {n} differs from one period later"
        );
    }

    let peak_positions: Vec<usize> = settled
        .chunks_exact(period)
        .map(|chunk| {
            (0..period)
                .max_by(|a, b| chunk[*a].abs().total_cmp(&chunk[*b].abs()))
                .unwrap()
        })
        .collect();
    assert!(peak_positions.windows(2).all(|w| w[0] == w[1]));

    let half_period_error = (0..settled.len() - period / 2)
        .map(|n| (settled[n] - settled[n + period / 2]).abs())
        .fold(0.0, f64::max);
    assert!(half_period_error > 0.01);
}

#[test]
fn linear_ramp_has_no_jumps_at_frame_boundaries() {
    let config = SynthConfig::default();
    let samples_per_frame = config.samples_per_frame();
    let samples = Synthesizer::new(config)
        .unwrap()
        .render(&formant_ramp(12))
        .unwrap();

    let mut boundary_max: f64 = 0.0;
    let mut interior_max: f64 = 0.0;
    for n in 1..samples.len() {
        let step = (samples[n] - samples[n - 1]).abs();
        if n % samples_per_frame == 0 {
            boundary_max = boundary_max.max(step);
        } else {
            interior_max = interior_max.max(step);
        }
    }
    assert!(interior_max > 0.0);
    assert!(
        boundary_max <= 1.25 * interior_max,
        "boundary step {boundary_max} exceeds interior bound {interior_max}"
    );
}

#[test]
fn hold_and_linear_agree_on_constant_track() {
    let track = vec![vowel(120.0); 6];
    let render = |interpolation| {
        let config = SynthConfig {
            interpolation,
            ..SynthConfig::default()
        };
        Synthesizer::new(config).unwrap().render(&track).unwrap()
    };
    assert_eq!(render(Interpolation::Linear), render(Interpolation::Hold));
}

#[test]
fn empty_track_is_rejected() {
    let synth = Synthesizer::new(SynthConfig::default()).unwrap();
    assert_eq!(synth.render(&[]).unwrap_err(), SynthError::EmptyTrack);
    assert!(matches!(synth.synthesize(&[]), Err(SynthError::EmptyTrack)));
}

#[test]
fn invalid_frames_are_rejected_before_any_output() {
    let synth = Synthesizer::new(SynthConfig::default()).unwrap();

    let mut track = vec![vowel(120.0); 4];
    track[2].formant_bw[0] = 0.0;
    match synth.synthesize(&track) {
        Err(SynthError::InvalidParameter { name, frame, .. }) => {
            assert_eq!(name, "formant_bw[0]");
            assert_eq!(frame, Some(2));
        }
        other => panic!("unexpected result {other:?}"),
    }

    let mut track = vec![vowel(120.0); 4];
    track[1].formant_freq[2] = -500.0;
    match synth.render(&track) {
        Err(SynthError::InvalidParameter {
            name, value, frame, ..
        }) => {
            assert_eq!(name, "formant_freq[2]");
            assert_eq!(value, -500.0);
            assert_eq!(frame, Some(1));
        }
        other => panic!("unexpected result {other:?}"),
    }

    let above_nyquist = vec![vowel(120.0); 2];
    let narrowband = Synthesizer::new(SynthConfig::with_sample_rate(8000)).unwrap();
    // F5 of the default vowel lies above 4 kHz
    assert!(matches!(
        narrowband.render(&above_nyquist),
        Err(SynthError::InvalidParameter {
            frame: Some(0),
            ..
        })
    ));
}

#[test]
fn frames_that_would_fail_mid_stream_are_caught_up_front() {
    let synth = Synthesizer::new(SynthConfig::default()).unwrap();

    // positive but so narrow that the pole radius rounds to 1
    let mut track = vec![vowel(120.0); 6];
    track[4].formant_bw[2] = 1e-13;
    match synth.render(&track) {
        Err(SynthError::InvalidParameter { name, frame, .. }) => {
            assert_eq!(name, "formant_bw[2]");
            assert_eq!(frame, Some(4));
        }
        other => panic!("unexpected result {other:?}"),
    }

    // a tilt too small to lower the gain renders like no tilt at all
    let flat = vec![vowel(120.0); 6];
    let mut barely_tilted = flat.clone();
    for frame in &mut barely_tilted {
        frame.tilt_db = 1e-17;
    }
    let samples = synth.render(&barely_tilted).unwrap();
    assert_eq!(samples.len(), 6 * 160);
    assert_eq!(samples, synth.render(&flat).unwrap());
}

#[test]
fn invalid_configuration_is_rejected() {
    for config in [
        SynthConfig::with_sample_rate(0),
        SynthConfig::with_sample_rate(2000),
        SynthConfig {
            frame_duration_ms: -1.0,
            ..SynthConfig::default()
        },
        SynthConfig {
            cascade_formants: 8,
            ..SynthConfig::default()
        },
        SynthConfig {
            frame_duration_ms: 1e300,
            ..SynthConfig::default()
        },
    ] {
        assert!(matches!(
            Synthesizer::new(config),
            Err(SynthError::Configuration { .. })
        ));
    }
}

#[test]
fn cancellation_from_another_thread_stops_the_stream() {
    let synth = Synthesizer::new(SynthConfig::default()).unwrap();
    let track = noisy_track(50);
    let token = CancelToken::new();
    let mut stream = synth.synthesize(&track).unwrap().with_cancel(token.clone());

    for _ in 0..1000 {
        stream.next().unwrap().unwrap();
    }
    std::thread::scope(|s| {
        s.spawn(|| token.cancel());
    });
    assert!(token.is_cancelled());
    assert_eq!(
        stream.next(),
        Some(Err(SynthError::Cancelled { sample_index: 1000 }))
    );
    assert_eq!(stream.next(), None);
}

#[test]
fn independent_tracks_render_concurrently() {
    let synth = Synthesizer::new(SynthConfig::default()).unwrap();
    let tracks = [noisy_track(20), formant_ramp(20), vec![vowel(200.0); 20]];
    let expected: Vec<Vec<f64>> = tracks.iter().map(|t| synth.render(t).unwrap()).collect();

    let synth = &synth;
    let rendered: Vec<Vec<f64>> = std::thread::scope(|s| {
        let handles: Vec<_> = tracks
            .iter()
            .map(|track| s.spawn(move || synth.render(track).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(rendered, expected);
}

#[test]
fn int16_output_round_trips_through_wav() {
    let config = SynthConfig {
        sample_format: SampleFormat::Int16,
        ..SynthConfig::default()
    };
    let sample_rate = config.sample_rate;
    let Samples::Int16(pcm) = Synthesizer::new(config)
        .unwrap()
        .render_output(&noisy_track(10))
        .unwrap()
    else {
        panic!("expected 16 bit output");
    };

    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: WavSampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
        for sample in &pcm {
            writer.write_sample(*sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    cursor.set_position(0);
    let mut reader = WavReader::new(cursor).unwrap();
    assert_eq!(reader.spec().sample_rate, 16000);
    let read_back: Vec<i16> = reader.samples::<i16>().map(Result::unwrap).collect();
    assert_eq!(read_back, pcm);
    assert!(read_back.iter().any(|x| *x != 0));
}
