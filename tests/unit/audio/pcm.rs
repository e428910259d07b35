use super::*;

#[test]
fn silence_has_requested_length() {
    let pcm = AudioPcm::silence(48_000, 2, 24_000);
    assert_eq!(pcm.frames(), 24_000);
    assert_eq!(pcm.interleaved_f32.len(), 48_000);
    assert!((pcm.duration_secs() - 0.5).abs() < 1e-12);
    assert!(pcm.interleaved_f32.iter().all(|&s| s == 0.0));
}

#[test]
fn mono_at_averages_channels() {
    let pcm = AudioPcm {
        sample_rate: 10,
        channels: 2,
        interleaved_f32: vec![0.2, 0.4, -1.0, 0.0],
    };
    assert!((pcm.mono_at(0).unwrap() - 0.3).abs() < 1e-6);
    assert!((pcm.mono_at(1).unwrap() + 0.5).abs() < 1e-6);
    assert_eq!(pcm.mono_at(2), None);
}

#[test]
fn frame_at_floors_time() {
    let pcm = AudioPcm::silence(100, 1, 100);
    assert_eq!(pcm.frame_at(0.0), 0);
    assert_eq!(pcm.frame_at(0.255), 25);
    assert_eq!(pcm.frame_at(-1.0), 0);
}

#[test]
fn fit_to_frames_trims_and_pads() {
    let mut pcm = AudioPcm {
        sample_rate: 4,
        channels: 2,
        interleaved_f32: vec![0.5; 8],
    };
    pcm.fit_to_frames(2);
    assert_eq!(pcm.interleaved_f32, vec![0.5; 4]);
    pcm.fit_to_frames(3);
    assert_eq!(pcm.interleaved_f32, vec![0.5, 0.5, 0.5, 0.5, 0.0, 0.0]);
}

#[test]
fn check_layout_rejects_ragged_buffers() {
    let pcm = AudioPcm {
        sample_rate: 8,
        channels: 2,
        interleaved_f32: vec![0.0; 3],
    };
    assert!(pcm.check_layout().is_err());
    assert!(AudioPcm::silence(0, 1, 1).check_layout().is_err());
    assert!(AudioPcm::silence(8, 2, 4).check_layout().is_ok());
}

#[test]
fn write_f32le_round_trips_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/out.f32le");
    let pcm = AudioPcm {
        sample_rate: 8,
        channels: 1,
        interleaved_f32: vec![1.0, -0.5],
    };
    pcm.write_f32le(&path).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(bytes.len(), 8);
    assert_eq!(f32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), -0.5);
}

#[test]
fn dialogue_without_samples_is_an_audio_decode_error() {
    let path = Path::new("lines/bob_01.wav");
    let empty = AudioPcm {
        sample_rate: 48_000,
        channels: 2,
        interleaved_f32: Vec::new(),
    };
    let err = AudioTrack::from_decoded(path, empty).unwrap_err();
    assert_eq!(err.kind(), crate::foundation::error::ErrorKind::AudioDecode);
    assert!(err.to_string().contains("bob_01.wav"));

    let ragged = AudioPcm {
        sample_rate: 48_000,
        channels: 2,
        interleaved_f32: vec![0.1; 3],
    };
    assert_eq!(
        AudioTrack::from_decoded(path, ragged).unwrap_err().kind(),
        crate::foundation::error::ErrorKind::AudioDecode
    );

    let track = AudioTrack::from_decoded(path, AudioPcm::silence(48_000, 2, 10)).unwrap();
    assert_eq!(track.path, Path::new("lines/bob_01.wav"));
    assert_eq!(track.pcm.frames(), 10);
}
