use super::*;

#[test]
fn single_frame_is_repeated_for_every_output_frame() {
    for total in [0usize, 1, 24, 37] {
        let s = schedule_motion(1, total, 24).unwrap();
        assert_eq!(s.len(), total);
        assert!(s.iter().all(|&i| i == 0));
    }
}

#[test]
fn four_frames_complete_one_cycle_in_order() {
    // 2 s at 12 fps: 24 frames, cycle max(24, 8) = 24.
    let s = schedule_motion(4, 24, 24).unwrap();
    assert_eq!(s.len(), 24);
    let mut expected = Vec::new();
    for idx in 0..4 {
        expected.extend(std::iter::repeat_n(idx, 6));
    }
    assert_eq!(s, expected);
}

#[test]
fn schedule_loops_after_each_cycle() {
    let s = schedule_motion(4, 60, 24).unwrap();
    assert_eq!(&s[0..24], &s[24..48]);
    assert_eq!(&s[48..60], &s[0..12]);
}

#[test]
fn cycle_grows_with_many_frames() {
    assert_eq!(motion_cycle_len(4, 24), 24);
    assert_eq!(motion_cycle_len(20, 24), 40);

    let s = schedule_motion(20, 40, 24).unwrap();
    // Exactly two output frames per motion image.
    for idx in 0..20 {
        assert_eq!(s.iter().filter(|&&v| v == idx).count(), 2);
    }
}

#[test]
fn indices_never_exceed_last_frame_and_are_monotonic_within_a_cycle() {
    for n in 2..9 {
        let s = schedule_motion(n, 100, 24).unwrap();
        let cycle = motion_cycle_len(n, 24);
        for (i, &v) in s.iter().enumerate() {
            assert!(v < n);
            if i % cycle != 0 {
                assert!(v >= s[i - 1]);
            }
        }
    }
}

#[test]
fn schedule_is_deterministic() {
    assert_eq!(
        schedule_motion(3, 50, 24).unwrap(),
        schedule_motion(3, 50, 24).unwrap()
    );
}

#[test]
fn zero_motion_frames_is_an_error() {
    assert!(schedule_motion(0, 10, 24).is_err());
}
