use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::{
    foundation::core::Canvas,
    foundation::error::{ToonError, ToonResult},
    foundation::math::premultiply_rgba8_in_place,
};

/// Straight-alpha RGBA8 raster with a label for error messages.
#[derive(Clone, Debug)]
pub struct Raster {
    /// Usually the source path.
    pub label: String,
    pub image: Arc<image::RgbaImage>,
}

impl Raster {
    pub fn new(label: impl Into<String>, image: image::RgbaImage) -> Self {
        Self {
            label: label.into(),
            image: Arc::new(image),
        }
    }

    pub fn canvas(&self) -> Canvas {
        let (width, height) = self.image.dimensions();
        Canvas { width, height }
    }

    /// Pixel bytes converted to premultiplied RGBA8.
    pub fn to_premul_rgba8(&self) -> Vec<u8> {
        let mut bytes = self.image.as_raw().clone();
        premultiply_rgba8_in_place(&mut bytes);
        bytes
    }
}

/// Decode encoded image bytes into straight RGBA8.
pub fn decode_rgba(bytes: &[u8]) -> ToonResult<image::RgbaImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    Ok(dyn_img.to_rgba8())
}

/// Read and decode an image file; absence is [`ToonError::MissingAsset`].
pub fn load_raster(path: &Path) -> ToonResult<Raster> {
    if !path.is_file() {
        return Err(ToonError::missing_asset(path.display().to_string()));
    }
    let bytes =
        std::fs::read(path).with_context(|| format!("read image bytes from '{}'", path.display()))?;
    let image = decode_rgba(&bytes)
        .map_err(|e| ToonError::missing_asset(format!("{} (undecodable: {e})", path.display())))?;
    Ok(Raster::new(path.display().to_string(), image))
}

/// Crop one pixel off the right/bottom edge where a dimension is odd.
///
/// H.264 yuv420p output needs even dimensions. Returns whether a crop happened.
pub fn crop_to_even(image: image::RgbaImage) -> ToonResult<(image::RgbaImage, bool)> {
    let (w, h) = image.dimensions();
    let even_w = w - (w % 2);
    let even_h = h - (h % 2);
    if even_w == 0 || even_h == 0 {
        return Err(ToonError::dimension_mismatch(
            "motion frame",
            "at least 2x2",
            format!("{w}x{h}"),
        ));
    }
    if even_w == w && even_h == h {
        return Ok((image, false));
    }
    let cropped = image::imageops::crop_imm(&image, 0, 0, even_w, even_h).to_image();
    Ok((cropped, true))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
