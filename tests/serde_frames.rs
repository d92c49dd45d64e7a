#![cfg(feature = "serde")]

use formant_synth::{ControlFrame, GlottalPulse, Interpolation, SynthConfig, Synthesizer};
use pretty_assertions::assert_eq;

#[test]
fn track_loads_from_json_with_defaults() {
    let json = r#"[
        { "f0": 110.0, "formant_freq": [300.0, 870.0, 2240.0, 3168.0, 4135.0, 5020.0] },
        { "f0": 105.0, "aspiration_amp": 0.05 }
    ]"#;
    let track: Vec<ControlFrame> = serde_json::from_str(json).unwrap();
    assert_eq!(track.len(), 2);
    assert_eq!(track[0].formant_freq[1], 870.0);
    assert_eq!(track[0].formant_bw, ControlFrame::default().formant_bw);
    assert_eq!(track[1].aspiration_amp, 0.05);

    let samples = Synthesizer::new(SynthConfig::default())
        .unwrap()
        .render(&track)
        .unwrap();
    assert_eq!(samples.len(), 320);
}

#[test]
fn config_uses_snake_case_names() {
    let config: SynthConfig = serde_json::from_str(
        r#"{ "sample_rate": 22050, "interpolation": "hold", "glottal_pulse": "fant" }"#,
    )
    .unwrap();
    assert_eq!(
        config,
        SynthConfig {
            sample_rate: 22050,
            interpolation: Interpolation::Hold,
            glottal_pulse: GlottalPulse::Fant,
            ..SynthConfig::default()
        }
    );
    let json = serde_json::to_string(&config).unwrap();
    assert!(json.contains(r#""glottal_pulse":"fant""#));
}
