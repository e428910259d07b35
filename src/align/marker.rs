use crate::{
    config::MarkerColors,
    foundation::error::{ToonError, ToonResult},
};

/// Pixel coordinate (column, row).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PixelPos {
    pub x: u32,
    pub y: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MarkerPair {
    pub left: PixelPos,
    pub right: PixelPos,
}

/// Find the first pixel (row-major) of each reserved marker colour. Alpha is ignored.
pub fn locate_markers(
    image: &image::RgbaImage,
    colors: &MarkerColors,
    frame_label: &str,
) -> ToonResult<MarkerPair> {
    let mut left = None;
    let mut right = None;

    for (x, y, px) in image.enumerate_pixels() {
        let rgb = [px.0[0], px.0[1], px.0[2]];
        if left.is_none() && rgb == colors.left {
            left = Some(PixelPos { x, y });
        } else if right.is_none() && rgb == colors.right {
            right = Some(PixelPos { x, y });
        }
        if left.is_some() && right.is_some() {
            break;
        }
    }

    match (left, right) {
        (Some(left), Some(right)) => Ok(MarkerPair { left, right }),
        (None, None) => Err(ToonError::markers_not_found(
            frame_label,
            "neither marker colour is present",
        )),
        (None, Some(_)) => Err(ToonError::markers_not_found(
            frame_label,
            format!("left marker colour {:?} is absent", colors.left),
        )),
        (Some(_), None) => Err(ToonError::markers_not_found(
            frame_label,
            format!("right marker colour {:?} is absent", colors.right),
        )),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/align/marker.rs"]
mod tests;
