use crate::{
    align::marker::MarkerPair,
    foundation::core::{Affine, Point, Vec2},
    foundation::error::{ToonError, ToonResult},
};

/// Placement of an overlay relative to a motion frame's marker pair.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AlignmentTransform {
    /// Marker separation divided by the reference distance.
    pub scale: f64,
    /// Counter-clockwise rotation in degrees that levels the marker line
    /// (screen space, y down).
    pub angle_deg: f64,
    /// Midpoint between the markers.
    pub center: Point,
}

impl AlignmentTransform {
    pub fn derive(
        markers: &MarkerPair,
        reference_distance: f64,
        frame_label: &str,
    ) -> ToonResult<Self> {
        if !(reference_distance.is_finite() && reference_distance > 0.0) {
            return Err(ToonError::validation(
                "reference_distance must be finite and > 0",
            ));
        }
        let left = Point::new(f64::from(markers.left.x), f64::from(markers.left.y));
        let right = Point::new(f64::from(markers.right.x), f64::from(markers.right.y));
        let d = right - left;
        let distance = d.hypot();
        if distance == 0.0 {
            return Err(ToonError::markers_not_found(
                frame_label,
                "left and right markers coincide",
            ));
        }

        Ok(Self {
            scale: distance / reference_distance,
            angle_deg: -d.y.atan2(d.x).to_degrees(),
            center: left.midpoint(right),
        })
    }

    /// Affine mapping an `overlay_w x overlay_h` image onto the frame: scaled by `scale`,
    /// rotated by `angle_deg`, and centred on `center`.
    pub fn overlay_affine(&self, overlay_w: f64, overlay_h: f64) -> Affine {
        Affine::translate(self.center.to_vec2())
            * Affine::rotate(-self.angle_deg.to_radians())
            * Affine::scale(self.scale)
            * Affine::translate(Vec2::new(-overlay_w / 2.0, -overlay_h / 2.0))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/align/transform.rs"]
mod tests;
