use super::*;

#[test]
fn fps_rejects_zero() {
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(24, 0).is_err());
    assert!(Fps::integer(12).is_ok());
}

#[test]
fn secs_to_frames_rounds_up_but_absorbs_float_noise() {
    let fps = Fps::integer(12).unwrap();
    assert_eq!(fps.secs_to_frames_ceil(2.0), 24);
    assert_eq!(fps.secs_to_frames_ceil(1.0), 12);
    assert_eq!(fps.secs_to_frames_ceil(0.05), 1);
    assert_eq!(fps.secs_to_frames_ceil(1.01), 13);
    assert_eq!(fps.secs_to_frames_ceil(0.0), 0);
    assert_eq!(fps.secs_to_frames_ceil(f64::NAN), 0);

    let fps = Fps::integer(24).unwrap();
    assert_eq!(fps.secs_to_frames_ceil(0.1 * 3.0), 8);
}

#[test]
fn frames_to_secs_inverts_integer_rates() {
    let fps = Fps::integer(25).unwrap();
    assert!((fps.frames_to_secs(50) - 2.0).abs() < 1e-12);
    assert!((fps.frame_duration_secs() - 0.04).abs() < 1e-12);
}

#[test]
fn canvas_evenness() {
    assert!(Canvas { width: 64, height: 32 }.is_even());
    assert!(!Canvas { width: 63, height: 32 }.is_even());
    assert_eq!(Canvas { width: 8, height: 6 }.describe(), "8x6");
}
