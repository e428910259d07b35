use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    align::marker::locate_markers,
    align::transform::AlignmentTransform,
    assets::decode::Raster,
    assets::library::MouthSet,
    audio::mouth::MouthShape,
    config::RenderConfig,
    foundation::core::{Affine, Canvas},
    foundation::error::{ToonError, ToonResult},
    render::caption::{CaptionLayer, canvas_u16},
    render::frame::{FrameRGBA, over_in_place},
};

/// A raster uploaded as a vello_cpu image paint.
#[derive(Clone)]
struct Paint {
    image: vello_cpu::Image,
    width: f64,
    height: f64,
}

impl Paint {
    fn from_raster(raster: &Raster) -> ToonResult<Self> {
        let canvas = raster.canvas();
        let pixmap = premul_to_pixmap(&raster.to_premul_rgba8(), canvas)?;
        Ok(Self {
            image: vello_cpu::Image {
                image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
                sampler: vello_cpu::peniko::ImageSampler::default(),
            },
            width: f64::from(canvas.width),
            height: f64::from(canvas.height),
        })
    }
}

/// Per-thread drawing state, reused across frames.
pub struct FrameWorker {
    ctx: vello_cpu::RenderContext,
    pixmap: vello_cpu::Pixmap,
}

/// Read-only inputs for compositing every frame of one scene.
///
/// Alignment transforms are derived once per distinct motion image; identical images share
/// one marker scan.
pub struct SceneCompositor {
    canvas: Canvas,
    size: (u16, u16),
    motions: Vec<Paint>,
    transforms: Vec<AlignmentTransform>,
    mouths: [Paint; 3],
    caption: Option<CaptionLayer>,
}

impl SceneCompositor {
    pub fn new(
        cfg: &RenderConfig,
        motion_frames: &[Raster],
        mouths: &MouthSet,
        caption: Option<CaptionLayer>,
    ) -> ToonResult<Self> {
        let first = motion_frames
            .first()
            .ok_or_else(|| ToonError::missing_asset("scene has no motion frames"))?;
        let canvas = first.canvas();
        let size = canvas_u16(canvas)?;
        for frame in motion_frames {
            if frame.canvas() != canvas {
                return Err(ToonError::dimension_mismatch(
                    format!("motion frame '{}'", frame.label),
                    canvas.describe(),
                    frame.canvas().describe(),
                ));
            }
        }
        if let Some(layer) = &caption
            && (layer.width != canvas.width || layer.height != canvas.height)
        {
            return Err(ToonError::dimension_mismatch(
                "caption layer",
                canvas.describe(),
                format!("{}x{}", layer.width, layer.height),
            ));
        }

        let transforms = derive_transforms(cfg, motion_frames)?;
        let motions = motion_frames
            .iter()
            .map(Paint::from_raster)
            .collect::<ToonResult<Vec<_>>>()?;
        let mouths = [
            Paint::from_raster(mouths.get(MouthShape::Closed))?,
            Paint::from_raster(mouths.get(MouthShape::OpenSmall))?,
            Paint::from_raster(mouths.get(MouthShape::OpenLarge))?,
        ];

        Ok(Self {
            canvas,
            size,
            motions,
            transforms,
            mouths,
            caption,
        })
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn motion_count(&self) -> usize {
        self.motions.len()
    }

    pub fn transform(&self, motion_index: usize) -> Option<&AlignmentTransform> {
        self.transforms.get(motion_index)
    }

    pub fn caption(&self) -> Option<&CaptionLayer> {
        self.caption.as_ref()
    }

    pub fn worker(&self) -> FrameWorker {
        let (w, h) = self.size;
        FrameWorker {
            ctx: vello_cpu::RenderContext::new(w, h),
            pixmap: vello_cpu::Pixmap::new(w, h),
        }
    }

    /// Motion image, then the aligned mouth, then the caption.
    pub fn compose(
        &self,
        worker: &mut FrameWorker,
        motion_index: usize,
        mouth: MouthShape,
    ) -> ToonResult<FrameRGBA> {
        let motion = self.motions.get(motion_index).ok_or_else(|| {
            ToonError::validation(format!(
                "motion index {motion_index} out of range ({} frames)",
                self.motions.len()
            ))
        })?;
        let transform = &self.transforms[motion_index];
        let mouth = &self.mouths[mouth.slot()];

        let ctx = &mut worker.ctx;
        ctx.reset();
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(motion.image.clone());
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, motion.width, motion.height));

        ctx.set_transform(affine_to_cpu(
            transform.overlay_affine(mouth.width, mouth.height),
        ));
        ctx.set_paint(mouth.image.clone());
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, mouth.width, mouth.height));

        ctx.flush();
        clear_pixmap(&mut worker.pixmap);
        ctx.render_to_pixmap(&mut worker.pixmap);

        let mut data = worker.pixmap.data_as_u8_slice().to_vec();
        if let Some(caption) = &self.caption {
            over_in_place(&mut data, &caption.rgba_premul)?;
        }

        Ok(FrameRGBA {
            width: self.canvas.width,
            height: self.canvas.height,
            data,
            premultiplied: true,
        })
    }
}

impl std::fmt::Debug for SceneCompositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneCompositor")
            .field("canvas", &self.canvas)
            .field("motions", &self.motions.len())
            .field("transforms", &self.transforms)
            .field("caption_lines", &self.caption.as_ref().map(|c| c.lines.len()))
            .finish()
    }
}

fn derive_transforms(cfg: &RenderConfig, motion_frames: &[Raster]) -> ToonResult<Vec<AlignmentTransform>> {
    let mut by_content: HashMap<&[u8], AlignmentTransform> = HashMap::new();
    let mut out = Vec::with_capacity(motion_frames.len());
    for frame in motion_frames {
        let key = frame.image.as_raw().as_slice();
        let transform = match by_content.get(key) {
            Some(t) => *t,
            None => {
                let markers = locate_markers(&frame.image, &cfg.markers, &frame.label)?;
                let t = AlignmentTransform::derive(&markers, cfg.reference_distance, &frame.label)?;
                tracing::debug!(
                    frame = %frame.label,
                    scale = t.scale,
                    angle_deg = t.angle_deg,
                    cx = t.center.x,
                    cy = t.center.y,
                    "alignment transform derived"
                );
                by_content.insert(key, t);
                t
            }
        };
        out.push(transform);
    }
    Ok(out)
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn clear_pixmap(pixmap: &mut vello_cpu::Pixmap) {
    pixmap.data_as_u8_slice_mut().fill(0);
}

fn premul_to_pixmap(rgba8_premul: &[u8], canvas: Canvas) -> ToonResult<vello_cpu::Pixmap> {
    let (w, h) = canvas_u16(canvas)?;
    if rgba8_premul.len() != canvas.width as usize * canvas.height as usize * 4 {
        return Err(ToonError::validation("raster byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(rgba8_premul.len() / 4);
    for px in rgba8_premul.chunks_exact(4) {
        may_have_opacities |= px[3] != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a: px[3],
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
