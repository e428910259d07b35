use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;

use crate::{
    config::CaptionConfig,
    foundation::core::{Canvas, Point},
    foundation::error::{ToonError, ToonResult},
};

/// RGBA8 brush colour carried through parley layouts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CaptionBrush {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl From<[u8; 4]> for CaptionBrush {
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Self { r, g, b, a }
    }
}

/// Greedy word wrap to at most `width` characters per line.
///
/// Words longer than `width` are split across lines. Runs of whitespace collapse.
pub fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        if word.is_empty() {
            continue;
        }

        let needed = if current_len == 0 {
            word.len()
        } else {
            current_len + 1 + word.len()
        };
        if needed > width {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }

    if current_len > 0 {
        lines.push(current);
    }
    lines
}

/// Top-left origin of each caption line.
///
/// Lines are centred horizontally and stacked upward so the bottom of the last line
/// sits on `baseline_y`.
pub fn stack_lines(line_widths: &[f32], line_height: f32, canvas_width: u32, baseline_y: f32) -> Vec<Point> {
    let n = line_widths.len();
    line_widths
        .iter()
        .enumerate()
        .map(|(i, &w)| {
            let x = (f64::from(canvas_width) - f64::from(w)) / 2.0;
            let y = f64::from(baseline_y) - (n - i) as f64 * f64::from(line_height);
            Point::new(x, y)
        })
        .collect()
}

/// Shapes caption text with parley against a single registered font.
pub struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<CaptionBrush>,
    family_name: String,
}

impl TextLayoutEngine {
    pub fn new(font_bytes: &[u8]) -> ToonResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| ToonError::validation("no font families registered from font bytes"))?;
        let family_name = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| ToonError::validation("registered font family has no name"))?
            .to_string();

        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family_name,
        })
    }

    /// Lay out one unbroken line of text.
    pub fn layout_line(
        &mut self,
        text: &str,
        size_px: f32,
        brush: CaptionBrush,
    ) -> ToonResult<parley::Layout<CaptionBrush>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(ToonError::validation(
                "caption font size must be finite and > 0",
            ));
        }

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(self.family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<CaptionBrush> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}

/// A caption rendered once per scene, premultiplied RGBA8 at frame size.
#[derive(Clone, Debug)]
pub struct CaptionLayer {
    pub lines: Vec<String>,
    pub width: u32,
    pub height: u32,
    pub rgba_premul: Arc<Vec<u8>>,
}

/// Renders wrapped dialogue into a [`CaptionLayer`].
pub struct CaptionRenderer {
    style: CaptionConfig,
    engine: TextLayoutEngine,
    font: vello_cpu::peniko::FontData,
}

impl CaptionRenderer {
    /// Load the caption font; a missing file is [`ToonError::MissingAsset`].
    pub fn load(style: &CaptionConfig, font_path: &Path) -> ToonResult<Self> {
        if !font_path.is_file() {
            return Err(ToonError::missing_asset(format!(
                "caption font '{}'",
                font_path.display()
            )));
        }
        let bytes = std::fs::read(font_path)
            .with_context(|| format!("read caption font '{}'", font_path.display()))?;
        Self::from_font_bytes(style, bytes)
    }

    pub fn from_font_bytes(style: &CaptionConfig, bytes: Vec<u8>) -> ToonResult<Self> {
        let engine = TextLayoutEngine::new(&bytes)?;
        let font = vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(bytes), 0);
        Ok(Self {
            style: style.clone(),
            engine,
            font,
        })
    }

    /// Render `text` for a `canvas`-sized frame. Blank text yields `None`.
    #[tracing::instrument(skip(self, text), fields(chars = text.len()))]
    pub fn render(&mut self, text: &str, canvas: Canvas) -> ToonResult<Option<CaptionLayer>> {
        let lines = wrap_words(text, self.style.wrap_chars);
        if lines.is_empty() {
            return Ok(None);
        }

        let brush = CaptionBrush::from(self.style.fill_rgba);
        let mut layouts = Vec::with_capacity(lines.len());
        for line in &lines {
            layouts.push(self.engine.layout_line(line, self.style.font_size_px, brush)?);
        }

        let widths: Vec<f32> = layouts.iter().map(|l| l.width()).collect();
        let tallest = layouts
            .iter()
            .map(|l| l.height())
            .fold(self.style.font_size_px, f32::max);
        let origins = stack_lines(
            &widths,
            tallest * self.style.line_spacing,
            canvas.width,
            self.style.baseline_y,
        );

        let (w, h) = canvas_u16(canvas)?;
        let mut ctx = vello_cpu::RenderContext::new(w, h);
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        for (layout, origin) in layouts.iter().zip(&origins) {
            ctx.set_transform(vello_cpu::kurbo::Affine::translate((origin.x, origin.y)));
            for line in layout.lines() {
                for item in line.items() {
                    let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                        continue;
                    };
                    let b = run.style().brush;
                    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(b.r, b.g, b.b, b.a));
                    let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                        id: g.id,
                        x: g.x,
                        y: g.y,
                    });
                    ctx.glyph_run(&self.font)
                        .font_size(run.run().font_size())
                        .fill_glyphs(glyphs);
                }
            }
        }
        ctx.flush();

        let mut pixmap = vello_cpu::Pixmap::new(w, h);
        ctx.render_to_pixmap(&mut pixmap);
        tracing::debug!(lines = lines.len(), "caption rendered");

        Ok(Some(CaptionLayer {
            lines,
            width: canvas.width,
            height: canvas.height,
            rgba_premul: Arc::new(pixmap.data_as_u8_slice().to_vec()),
        }))
    }
}

pub(crate) fn canvas_u16(canvas: Canvas) -> ToonResult<(u16, u16)> {
    let w: u16 = canvas
        .width
        .try_into()
        .map_err(|_| ToonError::validation("frame width exceeds u16"))?;
    let h: u16 = canvas
        .height
        .try_into()
        .map_err(|_| ToonError::validation("frame height exceeds u16"))?;
    Ok((w, h))
}

#[cfg(test)]
#[path = "../../tests/unit/render/caption.rs"]
mod tests;
