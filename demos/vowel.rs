use formant_synth::{ControlFrame, SampleFormat, Samples, SynthConfig, Synthesizer, db_to_lin};
use hound::{SampleFormat as WavSampleFormat, WavSpec, WavWriter};

/// A 600 ms /ai/ glide with a falling pitch and a little breathiness.
fn diphthong() -> Vec<ControlFrame> {
    let frames = 60;
    (0..frames)
        .map(|i| {
            let t = i as f64 / (frames - 1) as f64;
            let mut frame = ControlFrame {
                f0: 140.0 - 30.0 * t,
                flutter: 0.25,
                tilt_db: 6.0,
                aspiration_amp: db_to_lin(-30.0),
                gain: db_to_lin(-6.0),
                ..ControlFrame::default()
            };
            frame.formant_freq[0] = 750.0 - 450.0 * t;
            frame.formant_freq[1] = 1150.0 + 1100.0 * t;
            frame.formant_freq[2] = 2500.0 + 500.0 * t;
            frame
        })
        .collect()
}

fn main() {
    let config = SynthConfig {
        sample_format: SampleFormat::Int16,
        ..SynthConfig::default()
    };
    let sample_rate = config.sample_rate;
    let synth = match Synthesizer::new(config) {
        Ok(synth) => synth,
        Err(error) => {
            println!("Error: {error}");
            std::process::exit(1);
        }
    };
    let samples = match synth.render_output(&diphthong()) {
        Ok(Samples::Int16(samples)) => samples,
        Ok(Samples::Float(_)) => unreachable!("configured for 16 bit output"),
        Err(error) => {
            println!("Error: {error}");
            std::process::exit(1);
        }
    };

    let mut wav = WavWriter::create(
        "out.wav",
        WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: WavSampleFormat::Int,
        },
    )
    .unwrap();
    for sample in samples {
        wav.write_sample(sample).unwrap();
    }
    wav.finalize().unwrap();
}
