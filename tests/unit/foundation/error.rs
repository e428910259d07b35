use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        ToonError::markers_not_found("a.png", "left marker absent")
            .to_string()
            .contains("markers not found in 'a.png'")
    );
    assert!(
        ToonError::missing_asset("bob/mouths/closed.png")
            .to_string()
            .contains("missing asset:")
    );
    assert!(
        ToonError::audio_decode("line.wav", "bad header")
            .to_string()
            .contains("audio decode error for 'line.wav'")
    );
    assert!(
        ToonError::segment_not_found("scene_4.mp4")
            .to_string()
            .contains("segment not found")
    );
    assert!(ToonError::encode("x").to_string().contains("encode error:"));
    assert!(
        ToonError::validation("x")
            .to_string()
            .contains("validation error:")
    );
}

#[test]
fn kind_matches_variant() {
    assert_eq!(
        ToonError::dimension_mismatch("opening clip", "64x64", "32x32").kind(),
        ErrorKind::DimensionMismatch
    );
    assert_eq!(ToonError::parse("?", "no colon").kind(), ErrorKind::Parse);
    assert_eq!(
        ToonError::segment_not_found("a.mp4").kind(),
        ErrorKind::SegmentNotFound
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = ToonError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
    assert_eq!(err.kind(), ErrorKind::Other);
}
