use super::*;

fn solid(w: u32, h: u32, rgb: [u8; 3]) -> image::RgbaImage {
    image::RgbaImage::from_pixel(w, h, image::Rgba([rgb[0], rgb[1], rgb[2], 255]))
}

fn save(path: &Path, img: &image::RgbaImage) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    img.save(path).unwrap();
}

#[test]
fn numbered_sequence_is_sorted_numerically() {
    let dir = tempfile::tempdir().unwrap();
    let action = dir.path().join("bob/front/talk");
    save(&action.join("base_10.png"), &solid(4, 4, [10, 0, 0]));
    save(&action.join("base_2.png"), &solid(4, 4, [2, 0, 0]));
    save(&action.join("base_01.png"), &solid(4, 4, [1, 0, 0]));
    std::fs::write(action.join("notes.txt"), "ignored").unwrap();

    let lib = AssetLibrary::open(dir.path()).unwrap();
    let set = lib.motion_frames("bob", "front", "talk").unwrap();
    assert_eq!(set.action, "talk");
    let reds: Vec<u8> = set
        .frames
        .iter()
        .map(|f| f.image.get_pixel(0, 0).0[0])
        .collect();
    assert_eq!(reds, vec![1, 2, 10]);
}

#[test]
fn single_base_image_is_used_when_no_sequence() {
    let dir = tempfile::tempdir().unwrap();
    save(
        &dir.path().join("bob/front/normal/base.png"),
        &solid(6, 4, [0, 9, 0]),
    );
    let lib = AssetLibrary::open(dir.path()).unwrap();
    let set = lib.motion_frames("bob", "front", "normal").unwrap();
    assert_eq!(set.frames.len(), 1);
    assert_eq!(set.frames[0].canvas().width, 6);
}

#[test]
fn missing_action_falls_back_to_normal() {
    let dir = tempfile::tempdir().unwrap();
    save(
        &dir.path().join("bob/left/normal/base.png"),
        &solid(4, 4, [0, 0, 7]),
    );
    let lib = AssetLibrary::open(dir.path()).unwrap();
    let set = lib.motion_frames("bob", "left", "furious").unwrap();
    assert_eq!(set.action, DEFAULT_ACTION);
    assert_eq!(set.frames.len(), 1);
}

#[test]
fn missing_pose_is_missing_asset() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("bob/front/empty")).unwrap();
    let lib = AssetLibrary::open(dir.path()).unwrap();

    let err = lib.motion_frames("bob", "back", "normal").unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::MissingAsset);

    let err = lib.motion_frames("bob", "front", "empty").unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::MissingAsset);
}

#[test]
fn odd_frames_are_cropped_on_load() {
    let dir = tempfile::tempdir().unwrap();
    save(
        &dir.path().join("bob/front/normal/base.png"),
        &solid(7, 5, [1, 1, 1]),
    );
    let lib = AssetLibrary::open(dir.path()).unwrap();
    let set = lib.motion_frames("bob", "front", "normal").unwrap();
    assert_eq!(set.frames[0].image.dimensions(), (6, 4));
}

#[test]
fn mouth_set_loads_every_shape() {
    let dir = tempfile::tempdir().unwrap();
    let mouths = dir.path().join("bob/mouths");
    save(&mouths.join("closed.png"), &solid(2, 2, [1, 0, 0]));
    save(&mouths.join("open-small.png"), &solid(2, 2, [2, 0, 0]));
    save(&mouths.join("open-large.png"), &solid(2, 2, [3, 0, 0]));

    let lib = AssetLibrary::open(dir.path()).unwrap();
    let set = lib.mouth_set("bob").unwrap();
    assert_eq!(set.get(MouthShape::Closed).image.get_pixel(0, 0).0[0], 1);
    assert_eq!(set.get(MouthShape::OpenSmall).image.get_pixel(0, 0).0[0], 2);
    assert_eq!(set.get(MouthShape::OpenLarge).image.get_pixel(0, 0).0[0], 3);
}

#[test]
fn missing_mouth_shape_is_missing_asset() {
    let dir = tempfile::tempdir().unwrap();
    let mouths = dir.path().join("bob/mouths");
    save(&mouths.join("closed.png"), &solid(2, 2, [1, 0, 0]));
    save(&mouths.join("open-large.png"), &solid(2, 2, [3, 0, 0]));

    let lib = AssetLibrary::open(dir.path()).unwrap();
    let err = lib.mouth_set("bob").unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::MissingAsset);
    assert!(err.to_string().contains("open-small"));
}

#[test]
fn open_requires_a_directory() {
    assert!(AssetLibrary::open("/nonexistent/toonreel-assets").is_err());
}
