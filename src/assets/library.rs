use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{
    assets::decode::{Raster, crop_to_even, load_raster},
    audio::mouth::MouthShape,
    foundation::error::{ToonError, ToonResult},
    script::DEFAULT_ACTION,
};

pub const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

const BASE_STEM: &str = "base";

/// Motion frames for one character/direction/action, in playback order.
#[derive(Clone, Debug)]
pub struct MotionSet {
    /// Action actually used (may be the `normal` fallback).
    pub action: String,
    pub frames: Vec<Raster>,
}

/// One image per [`MouthShape`] for a character.
#[derive(Clone, Debug)]
pub struct MouthSet {
    images: [Raster; 3],
}

impl MouthSet {
    pub fn new(closed: Raster, open_small: Raster, open_large: Raster) -> Self {
        Self {
            images: [closed, open_small, open_large],
        }
    }

    pub fn get(&self, shape: MouthShape) -> &Raster {
        &self.images[shape.slot()]
    }
}

/// On-disk asset repository laid out as `character/direction/action/` plus `character/mouths/`.
#[derive(Clone, Debug)]
pub struct AssetLibrary {
    root: PathBuf,
}

impl AssetLibrary {
    pub fn open(root: impl Into<PathBuf>) -> ToonResult<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(ToonError::missing_asset(format!(
                "asset root '{}'",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load the motion frames for a pose, falling back to the `normal` action.
    ///
    /// A directory holding `base_01.*, base_02.*, ...` yields that sequence in numeric order;
    /// otherwise a single `base.*` is used. Odd dimensions are cropped to even.
    #[tracing::instrument(skip(self))]
    pub fn motion_frames(
        &self,
        character: &str,
        direction: &str,
        action: &str,
    ) -> ToonResult<MotionSet> {
        let requested = self.root.join(character).join(direction).join(action);
        let (dir, used) = if requested.is_dir() {
            (requested, action)
        } else {
            let fallback = self.root.join(character).join(direction).join(DEFAULT_ACTION);
            if !fallback.is_dir() {
                return Err(ToonError::missing_asset(format!(
                    "motion directory '{}' (and fallback '{}')",
                    requested.display(),
                    fallback.display()
                )));
            }
            tracing::debug!(
                requested = action,
                fallback = DEFAULT_ACTION,
                "action directory missing, using fallback"
            );
            (fallback, DEFAULT_ACTION)
        };

        let paths = motion_frame_paths(&dir)?;
        let mut frames = Vec::with_capacity(paths.len());
        for path in paths {
            let raster = load_raster(&path)?;
            let (image, cropped) = crop_to_even(raster.image.as_ref().clone())?;
            if cropped {
                tracing::warn!(
                    frame = %path.display(),
                    "odd motion frame dimensions, cropped to {}x{}",
                    image.width(),
                    image.height()
                );
            }
            frames.push(Raster::new(raster.label, image));
        }

        Ok(MotionSet {
            action: used.to_string(),
            frames,
        })
    }

    /// Load `character/mouths/{closed,open-small,open-large}.*`.
    pub fn mouth_set(&self, character: &str) -> ToonResult<MouthSet> {
        let dir = self.root.join(character).join("mouths");
        let load = |shape: MouthShape| -> ToonResult<Raster> {
            let path = find_with_stem(&dir, shape.asset_name()).ok_or_else(|| {
                ToonError::missing_asset(format!(
                    "mouth shape '{}' for '{character}' in '{}'",
                    shape.asset_name(),
                    dir.display()
                ))
            })?;
            load_raster(&path)
        };
        Ok(MouthSet::new(
            load(MouthShape::Closed)?,
            load(MouthShape::OpenSmall)?,
            load(MouthShape::OpenLarge)?,
        ))
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

fn find_with_stem(dir: &Path, stem: &str) -> Option<PathBuf> {
    IMAGE_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .find(|p| p.is_file())
}

/// Ordered frame paths inside one action directory.
pub fn motion_frame_paths(dir: &Path) -> ToonResult<Vec<PathBuf>> {
    let mut numbered = Vec::<(u32, PathBuf)>::new();
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("list motion dir '{}'", dir.display()))?;
    for entry in entries {
        let path = entry
            .with_context(|| format!("list motion dir '{}'", dir.display()))?
            .path();
        if !path.is_file() || !has_image_extension(&path) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let Some(num) = stem
            .strip_prefix(BASE_STEM)
            .and_then(|rest| rest.strip_prefix('_'))
            .and_then(|n| n.parse::<u32>().ok())
        else {
            continue;
        };
        numbered.push((num, path));
    }

    if !numbered.is_empty() {
        numbered.sort();
        return Ok(numbered.into_iter().map(|(_, p)| p).collect());
    }

    find_with_stem(dir, BASE_STEM)
        .map(|p| vec![p])
        .ok_or_else(|| {
            ToonError::missing_asset(format!("no motion frames in '{}'", dir.display()))
        })
}

#[cfg(test)]
#[path = "../../tests/unit/assets/library.rs"]
mod tests;
