use super::*;

fn motion_frame(left: (u32, u32), right: (u32, u32)) -> Raster {
    let mut img = image::RgbaImage::from_pixel(8, 8, image::Rgba([255, 255, 255, 255]));
    img.put_pixel(left.0, left.1, image::Rgba([255, 0, 0, 255]));
    img.put_pixel(right.0, right.1, image::Rgba([0, 0, 255, 255]));
    Raster::new(format!("motion_{}_{}", left.0, left.1), img)
}

fn mouths() -> MouthSet {
    let solid = |rgb: [u8; 3]| {
        Raster::new(
            "mouth",
            image::RgbaImage::from_pixel(2, 2, image::Rgba([rgb[0], rgb[1], rgb[2], 255])),
        )
    };
    MouthSet::new(solid([0, 255, 0]), solid([0, 128, 0]), solid([0, 64, 0]))
}

fn cfg() -> RenderConfig {
    RenderConfig {
        reference_distance: 4.0,
        ..RenderConfig::default()
    }
}

fn close(a: [u8; 4], b: [u8; 4]) -> bool {
    a.iter().zip(b).all(|(x, y)| x.abs_diff(y) <= 3)
}

#[test]
fn mouth_is_placed_on_marker_midpoint() {
    let comp = SceneCompositor::new(&cfg(), &[motion_frame((1, 4), (5, 4))], &mouths(), None).unwrap();
    let t = comp.transform(0).unwrap();
    assert_eq!(t.scale, 1.0);
    assert_eq!(t.center.x, 3.0);

    let mut worker = comp.worker();
    let frame = comp.compose(&mut worker, 0, MouthShape::Closed).unwrap();
    assert_eq!((frame.width, frame.height), (8, 8));
    assert!(frame.premultiplied);
    // Mouth covers x in [2, 4), y in [3, 5).
    assert!(close(frame.pixel(2, 3), [0, 255, 0, 255]));
    assert!(close(frame.pixel(3, 4), [0, 255, 0, 255]));
    assert!(close(frame.pixel(7, 0), [255, 255, 255, 255]));
    assert!(close(frame.pixel(0, 7), [255, 255, 255, 255]));
}

#[test]
fn mouth_shape_selects_image() {
    let comp = SceneCompositor::new(&cfg(), &[motion_frame((1, 4), (5, 4))], &mouths(), None).unwrap();
    let mut worker = comp.worker();
    let large = comp.compose(&mut worker, 0, MouthShape::OpenLarge).unwrap();
    assert!(close(large.pixel(3, 4), [0, 64, 0, 255]));
}

#[test]
fn worker_reuse_does_not_leak_previous_frame() {
    let comp = SceneCompositor::new(&cfg(), &[motion_frame((1, 4), (5, 4))], &mouths(), None).unwrap();
    let mut worker = comp.worker();
    let a = comp.compose(&mut worker, 0, MouthShape::Closed).unwrap();
    let _ = comp.compose(&mut worker, 0, MouthShape::OpenLarge).unwrap();
    let again = comp.compose(&mut worker, 0, MouthShape::Closed).unwrap();
    assert_eq!(a, again);
}

#[test]
fn identical_motion_frames_share_a_transform() {
    let f = motion_frame((1, 4), (5, 4));
    let g = motion_frame((1, 2), (5, 2));
    let comp = SceneCompositor::new(&cfg(), &[f.clone(), g, f], &mouths(), None).unwrap();
    assert_eq!(comp.motion_count(), 3);
    assert_eq!(comp.transform(0), comp.transform(2));
    assert_eq!(comp.transform(1).unwrap().center.y, 2.0);
}

#[test]
fn missing_markers_fail_construction() {
    let plain = Raster::new(
        "plain",
        image::RgbaImage::from_pixel(8, 8, image::Rgba([255, 255, 255, 255])),
    );
    let err = SceneCompositor::new(&cfg(), &[plain], &mouths(), None).unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::MarkersNotFound);
}

#[test]
fn mixed_motion_frame_sizes_are_rejected() {
    let small = Raster::new("small", image::RgbaImage::new(4, 4));
    let err = SceneCompositor::new(&cfg(), &[motion_frame((1, 4), (5, 4)), small], &mouths(), None)
        .unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::DimensionMismatch);
}

#[test]
fn caption_layer_is_composited_over_every_frame() {
    let mut caption = vec![0u8; 8 * 8 * 4];
    let i = (7 * 8 + 7) * 4;
    caption[i..i + 4].copy_from_slice(&[255, 255, 0, 255]);
    let layer = CaptionLayer {
        lines: vec!["hi".to_string()],
        width: 8,
        height: 8,
        rgba_premul: Arc::new(caption),
    };
    let comp = SceneCompositor::new(&cfg(), &[motion_frame((1, 4), (5, 4))], &mouths(), Some(layer))
        .unwrap();
    let mut worker = comp.worker();
    for shape in MouthShape::ALL {
        let frame = comp.compose(&mut worker, 0, shape).unwrap();
        assert_eq!(frame.pixel(7, 7), [255, 255, 0, 255]);
    }
}

#[test]
fn out_of_range_motion_index_is_an_error() {
    let comp = SceneCompositor::new(&cfg(), &[motion_frame((1, 4), (5, 4))], &mouths(), None).unwrap();
    let mut worker = comp.worker();
    assert!(comp.compose(&mut worker, 3, MouthShape::Closed).is_err());
}
