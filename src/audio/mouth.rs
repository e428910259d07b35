use crate::{
    audio::pcm::AudioTrack,
    config::RenderConfig,
    foundation::core::Fps,
    foundation::error::{ToonError, ToonResult},
};

/// Discrete mouth state chosen per output frame from instantaneous loudness.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MouthShape {
    Closed,
    OpenSmall,
    OpenLarge,
}

impl MouthShape {
    pub const ALL: [MouthShape; 3] = [Self::Closed, Self::OpenSmall, Self::OpenLarge];

    /// File stem of this shape under `character/mouths/`.
    pub fn asset_name(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::OpenSmall => "open-small",
            Self::OpenLarge => "open-large",
        }
    }

    pub(crate) fn slot(self) -> usize {
        match self {
            Self::Closed => 0,
            Self::OpenSmall => 1,
            Self::OpenLarge => 2,
        }
    }
}

/// The two loudness cut points partitioning peak amplitude into three mouth states.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MouthThresholds {
    pub silence: f32,
    pub small: f32,
}

impl MouthThresholds {
    pub fn from_config(cfg: &RenderConfig) -> Self {
        Self {
            silence: cfg.silence_threshold,
            small: cfg.small_mouth_threshold,
        }
    }

    pub fn classify(self, peak: f32) -> MouthShape {
        if peak < self.silence {
            MouthShape::Closed
        } else if peak < self.small {
            MouthShape::OpenSmall
        } else {
            MouthShape::OpenLarge
        }
    }
}

/// Classify one mouth shape per output frame.
///
/// Frame `i` samples the track at `i / fps`; channels are averaged to mono and the absolute
/// value of that instant is thresholded. Frames are classified independently (no smoothing).
/// Without a track every frame is [`MouthShape::Closed`]. Instants past the end of the track
/// are silent, so they classify as closed too.
pub fn map_mouth_shapes(
    audio: Option<&AudioTrack>,
    duration_secs: f64,
    fps: Fps,
    thresholds: MouthThresholds,
) -> ToonResult<Vec<MouthShape>> {
    let total = fps.secs_to_frames_ceil(duration_secs) as usize;
    let Some(track) = audio else {
        return Ok(vec![MouthShape::Closed; total]);
    };

    let pcm = &track.pcm;
    pcm.check_layout()
        .map_err(|reason| ToonError::audio_decode(&track.path, reason))?;

    let mut out = Vec::with_capacity(total);
    for i in 0..total {
        let t = fps.frames_to_secs(i as u64);
        let shape = match pcm.mono_at(pcm.frame_at(t)) {
            Some(v) if !v.is_finite() => {
                return Err(ToonError::audio_decode(
                    &track.path,
                    format!("non-finite sample at {t:.3}s"),
                ));
            }
            Some(v) => thresholds.classify(v.abs()),
            None => MouthShape::Closed,
        };
        out.push(shape);
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mouth.rs"]
mod tests;
