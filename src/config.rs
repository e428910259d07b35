use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{ToonError, ToonResult};

/// Reserved RGB colours of the two alignment markers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MarkerColors {
    pub left: [u8; 3],
    pub right: [u8; 3],
}

impl Default for MarkerColors {
    fn default() -> Self {
        Self {
            left: [255, 0, 0],
            right: [0, 0, 255],
        }
    }
}

/// Caption layer styling.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    pub enabled: bool,
    /// TTF/OTF file; relative paths resolve against the asset root.
    pub font_path: PathBuf,
    pub font_size_px: f32,
    /// Maximum characters per wrapped line.
    pub wrap_chars: usize,
    /// Bottom edge of the last caption line, in pixels from the top.
    pub baseline_y: f32,
    /// Multiplier applied to the font's natural line height.
    pub line_spacing: f32,
    /// Straight-alpha RGBA fill.
    pub fill_rgba: [u8; 4],
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            font_path: PathBuf::from("fonts/caption.ttf"),
            font_size_px: 36.0,
            wrap_chars: 30,
            baseline_y: 980.0,
            line_spacing: 1.15,
            fill_rgba: [255, 255, 255, 255],
        }
    }
}

/// Immutable render/assembly settings shared by every component.
///
/// Built once (usually from JSON) and passed by reference; nothing in the crate reads
/// global state.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub fps: Fps,
    /// Marker separation (pixels) at which the mouth overlay is drawn at scale 1.0.
    pub reference_distance: f64,
    pub silence_threshold: f32,
    pub small_mouth_threshold: f32,
    pub markers: MarkerColors,
    /// A motion loop is never shorter than this many frames.
    pub min_motion_cycle_frames: usize,
    pub caption: CaptionConfig,
    /// Standard panel dimensions; the opening clip must match exactly.
    pub panel: Canvas,
    pub sample_rate: u32,
    pub channels: u16,
    pub default_scene_secs: f64,
    pub background_volume: f32,
    /// Segment counts above this switch assembly to batched mode.
    pub direct_concat_limit: usize,
    pub batch_size: usize,
    pub crf: u8,
    pub bg_rgba: [u8; 4],
    /// Compose frames on the rayon pool.
    pub parallel: bool,
    pub chunk_size: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fps: Fps::default(),
            reference_distance: 100.0,
            silence_threshold: 0.01,
            small_mouth_threshold: 0.1,
            markers: MarkerColors::default(),
            min_motion_cycle_frames: 24,
            caption: CaptionConfig::default(),
            panel: Canvas {
                width: 1024,
                height: 1024,
            },
            sample_rate: 48_000,
            channels: 2,
            default_scene_secs: 2.0,
            background_volume: 0.15,
            direct_concat_limit: 10,
            batch_size: 8,
            crf: 23,
            bg_rgba: [0, 0, 0, 255],
            parallel: true,
            chunk_size: 64,
        }
    }
}

impl RenderConfig {
    /// Read a JSON config file; absent fields keep their defaults.
    pub fn load(path: &Path) -> ToonResult<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_slice(&bytes).map_err(|e| {
            ToonError::validation(format!("invalid config '{}': {e}", path.display()))
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> ToonResult<()> {
        Fps::new(self.fps.num, self.fps.den)?;
        if !(self.reference_distance.is_finite() && self.reference_distance > 0.0) {
            return Err(ToonError::validation(
                "reference_distance must be finite and > 0",
            ));
        }
        if !(self.silence_threshold >= 0.0
            && self.silence_threshold <= self.small_mouth_threshold)
        {
            return Err(ToonError::validation(
                "mouth thresholds must satisfy 0 <= silence_threshold <= small_mouth_threshold",
            ));
        }
        if self.markers.left == self.markers.right {
            return Err(ToonError::validation(
                "left and right marker colours must differ",
            ));
        }
        if self.min_motion_cycle_frames == 0 {
            return Err(ToonError::validation(
                "min_motion_cycle_frames must be >= 1",
            ));
        }
        if self.panel.width == 0 || self.panel.height == 0 || !self.panel.is_even() {
            return Err(ToonError::validation(
                "panel width/height must be non-zero and even",
            ));
        }
        if self.sample_rate == 0 {
            return Err(ToonError::validation("sample_rate must be non-zero"));
        }
        if !(1..=2).contains(&self.channels) {
            return Err(ToonError::validation(
                "channels must be 1 (mono) or 2 (stereo)",
            ));
        }
        if !(self.default_scene_secs.is_finite() && self.default_scene_secs > 0.0) {
            return Err(ToonError::validation(
                "default_scene_secs must be finite and > 0",
            ));
        }
        if !(0.0..=1.0).contains(&self.background_volume) {
            return Err(ToonError::validation(
                "background_volume must be within [0, 1]",
            ));
        }
        if self.batch_size == 0 {
            return Err(ToonError::validation("batch_size must be >= 1"));
        }
        if self.crf > 51 {
            return Err(ToonError::validation("crf must be within [0, 51]"));
        }
        if self.caption.enabled {
            if !(self.caption.font_size_px.is_finite() && self.caption.font_size_px > 0.0) {
                return Err(ToonError::validation(
                    "caption font_size_px must be finite and > 0",
                ));
            }
            if self.caption.wrap_chars == 0 {
                return Err(ToonError::validation("caption wrap_chars must be >= 1"));
            }
        }
        Ok(())
    }

    /// Resolve the caption font against the asset root when it is relative.
    pub fn caption_font_path(&self, asset_root: &Path) -> PathBuf {
        if self.caption.font_path.is_absolute() {
            self.caption.font_path.clone()
        } else {
            asset_root.join(&self.caption.font_path)
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
