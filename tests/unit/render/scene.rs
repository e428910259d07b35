use super::*;
use crate::encode::sink::InMemorySink;
use crate::script::parse_line;

fn save(path: &Path, img: &image::RgbaImage) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    img.save(path).unwrap();
}

fn motion(marker_y: u32, shade: u8) -> image::RgbaImage {
    let mut img = image::RgbaImage::from_pixel(8, 8, image::Rgba([shade, shade, shade, 255]));
    img.put_pixel(1, marker_y, image::Rgba([255, 0, 0, 255]));
    img.put_pixel(5, marker_y, image::Rgba([0, 0, 255, 255]));
    img
}

fn library(dir: &Path, motions: &[image::RgbaImage]) {
    let action = dir.join("bob/front/normal");
    if motions.len() == 1 {
        save(&action.join("base.png"), &motions[0]);
    } else {
        for (i, m) in motions.iter().enumerate() {
            save(&action.join(format!("base_{:02}.png", i + 1)), m);
        }
    }
    for (name, g) in [("closed", 255u8), ("open-small", 128), ("open-large", 64)] {
        save(
            &dir.join(format!("bob/mouths/{name}.png")),
            &image::RgbaImage::from_pixel(2, 2, image::Rgba([0, g, 0, 255])),
        );
    }
}

fn cfg() -> RenderConfig {
    let mut cfg = RenderConfig {
        fps: crate::foundation::core::Fps::integer(12).unwrap(),
        reference_distance: 4.0,
        chunk_size: 5,
        ..RenderConfig::default()
    };
    cfg.caption.enabled = false;
    cfg
}

fn renderer(dir: &Path, cfg: RenderConfig) -> SceneRenderer {
    SceneRenderer::new(cfg, AssetLibrary::open(dir).unwrap(), dir.join("out")).unwrap()
}

#[test]
fn prepare_resolves_frame_counts_from_duration() {
    let dir = tempfile::tempdir().unwrap();
    library(dir.path(), &[motion(4, 255)]);
    let r = renderer(dir.path(), cfg());
    let line = parse_line("bob: hello there").unwrap();
    let prepared = r
        .prepare(&SceneRequest {
            index: 0,
            line: &line,
            audio: None,
            duration_secs: Some(1.5),
        })
        .unwrap();
    assert_eq!(prepared.total_frames(), 18);
    assert_eq!(prepared.mouths.len(), 18);
    assert!(prepared.mouths.iter().all(|m| *m == MouthShape::Closed));
    // Silent track of matching length at the configured rate.
    assert_eq!(prepared.audio.frames(), 72_000);
    assert!(prepared.audio.interleaved_f32.iter().all(|s| *s == 0.0));
    assert_eq!(prepared.scene.dialogue, "hello there");
}

#[test]
fn duration_falls_back_to_line_then_default() {
    let dir = tempfile::tempdir().unwrap();
    library(dir.path(), &[motion(4, 255)]);
    let r = renderer(dir.path(), cfg());

    let with_own = parse_line("bob[normal||0.5]: hi").unwrap();
    let p = r
        .prepare(&SceneRequest {
            index: 0,
            line: &with_own,
            audio: None,
            duration_secs: None,
        })
        .unwrap();
    assert_eq!(p.total_frames(), 6);

    let plain = parse_line("bob: hi").unwrap();
    let p = r
        .prepare(&SceneRequest {
            index: 0,
            line: &plain,
            audio: None,
            duration_secs: None,
        })
        .unwrap();
    assert_eq!(p.total_frames(), 24);
}

#[test]
fn render_into_pushes_every_frame_in_order_and_reports_progress() {
    let dir = tempfile::tempdir().unwrap();
    library(dir.path(), &[motion(4, 255), motion(3, 200), motion(2, 150)]);
    let r = renderer(dir.path(), cfg());
    let line = parse_line("bob: hi").unwrap();
    let prepared = r
        .prepare(&SceneRequest {
            index: 3,
            line: &line,
            audio: None,
            duration_secs: Some(2.0),
        })
        .unwrap();

    let mut sink = InMemorySink::new();
    let mut events = Vec::new();
    let stats = r
        .render_into(&prepared, None, &mut sink, &mut |p| events.push(p))
        .unwrap();

    assert_eq!(stats.frames_total, 24);
    assert_eq!(stats.frames_rendered + stats.frames_elided, 24);
    assert!(stats.frames_elided > 0);
    assert!(sink.is_ended());
    assert_eq!(sink.frames().len(), 24);
    for (i, (idx, frame)) in sink.frames().iter().enumerate() {
        assert_eq!(idx.0, i as u64);
        let expected_shade = [255u8, 200, 150][prepared.schedule[i]];
        assert!(frame.pixel(7, 7)[0].abs_diff(expected_shade) <= 2);
    }
    assert_eq!(events.len(), 24);
    assert_eq!(
        events.last(),
        Some(&Progress::FrameComposited {
            done: 24,
            total: 24
        })
    );
}

#[test]
fn parallel_and_sequential_composition_agree() {
    let dir = tempfile::tempdir().unwrap();
    library(dir.path(), &[motion(4, 255), motion(3, 200)]);
    let line = parse_line("bob: hi").unwrap();
    let req = SceneRequest {
        index: 0,
        line: &line,
        audio: None,
        duration_secs: Some(1.0),
    };

    let mut frames = Vec::new();
    for parallel in [true, false] {
        let r = renderer(
            dir.path(),
            RenderConfig {
                parallel,
                ..cfg()
            },
        );
        let prepared = r.prepare(&req).unwrap();
        let mut sink = InMemorySink::new();
        r.render_into(&prepared, None, &mut sink, &mut crate::progress::ignore_progress)
            .unwrap();
        frames.push(sink.into_frames());
    }
    assert_eq!(frames[0], frames[1]);
}

#[test]
fn missing_mouth_shape_is_missing_asset() {
    let dir = tempfile::tempdir().unwrap();
    library(dir.path(), &[motion(4, 255)]);
    std::fs::remove_file(dir.path().join("bob/mouths/open-large.png")).unwrap();
    let r = renderer(dir.path(), cfg());
    let line = parse_line("bob: hi").unwrap();
    let err = r
        .prepare(&SceneRequest {
            index: 0,
            line: &line,
            audio: None,
            duration_secs: None,
        })
        .unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::MissingAsset);
    assert!(err.to_string().contains("open-large"));
}

#[test]
fn caption_font_is_required_only_for_spoken_text() {
    let dir = tempfile::tempdir().unwrap();
    library(dir.path(), &[motion(4, 255)]);
    let mut with_caption = cfg();
    with_caption.caption.enabled = true;
    let r = renderer(dir.path(), with_caption);

    let spoken = parse_line("bob: hello").unwrap();
    let err = r
        .prepare(&SceneRequest {
            index: 0,
            line: &spoken,
            audio: None,
            duration_secs: None,
        })
        .unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::MissingAsset);

    let cue_only = parse_line("bob: (sighs)").unwrap();
    assert!(
        r.prepare(&SceneRequest {
            index: 0,
            line: &cue_only,
            audio: None,
            duration_secs: None,
        })
        .is_ok()
    );
}

#[test]
fn failed_render_leaves_no_segment_file() {
    let dir = tempfile::tempdir().unwrap();
    library(dir.path(), &[image::RgbaImage::from_pixel(8, 8, image::Rgba([255, 255, 255, 255]))]);
    let r = renderer(dir.path(), cfg());
    let stale = r.segment_path(7);
    std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
    std::fs::write(&stale, b"previous render").unwrap();

    let line = parse_line("bob: hi").unwrap();
    let err = r
        .render(
            &SceneRequest {
                index: 7,
                line: &line,
                audio: None,
                duration_secs: None,
            },
            &mut crate::progress::ignore_progress,
        )
        .unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::MarkersNotFound);
    assert!(!r.segment_path(7).exists());
}

#[test]
fn output_guard_removes_uncommitted_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.mp4");
    {
        let guard = OutputGuard::new(path.clone());
        std::fs::write(guard.path(), b"partial").unwrap();
    }
    assert!(!path.exists());

    let dest = dir.path().join("final.mp4");
    let guard = OutputGuard::new(path.clone());
    std::fs::write(guard.path(), b"done").unwrap();
    guard.commit_to(&dest).unwrap();
    assert!(!path.exists());
    assert_eq!(std::fs::read(&dest).unwrap(), b"done");
}

#[test]
fn segment_paths_are_keyed_by_index() {
    let dir = tempfile::tempdir().unwrap();
    library(dir.path(), &[motion(4, 255)]);
    let r = renderer(dir.path(), cfg());
    assert_eq!(r.segment_path(12), dir.path().join("out").join("scene_12.mp4"));
}
