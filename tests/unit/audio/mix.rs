use super::*;

#[test]
fn graph_attenuates_background_and_keeps_primary_length() {
    let mix = BackgroundMix::new(0.15, 48_000, 2).unwrap();
    let graph = mix.filter_graph(0, 1);
    assert!(graph.starts_with("[0:a:0]aformat=sample_fmts=fltp:sample_rates=48000:channel_layouts=stereo[pri];"));
    assert!(graph.contains("[1:a:0]aformat=sample_fmts=fltp:sample_rates=48000:channel_layouts=stereo,volume=0.1500[bg];"));
    assert!(graph.contains("[pri][bg]amix=inputs=2:duration=first:dropout_transition=0:normalize=0"));
    assert!(graph.ends_with("aformat=sample_fmts=s16[mix]"));
}

#[test]
fn silent_primary_can_be_any_input() {
    let mix = BackgroundMix::new(1.0, 22_050, 1).unwrap();
    let graph = mix.filter_graph(2, 1);
    assert!(graph.starts_with("[2:a:0]"));
    assert!(graph.contains("channel_layouts=mono"));
    assert!(graph.contains("volume=1.0000"));
}

#[test]
fn invalid_mix_settings_are_rejected() {
    assert!(BackgroundMix::new(1.5, 48_000, 2).is_err());
    assert!(BackgroundMix::new(f32::NAN, 48_000, 2).is_err());
    assert!(BackgroundMix::new(0.5, 0, 2).is_err());
    assert!(BackgroundMix::new(0.5, 48_000, 6).is_err());
    assert_eq!(
        BackgroundMix::new(0.5, 48_000, 0).unwrap_err().kind(),
        crate::foundation::error::ErrorKind::Validation
    );
}
