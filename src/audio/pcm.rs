use std::path::{Path, PathBuf};

use crate::foundation::error::{ToonError, ToonResult};

/// Interleaved `f32` PCM.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioPcm {
    pub sample_rate: u32,
    pub channels: u16,
    pub interleaved_f32: Vec<f32>,
}

impl AudioPcm {
    pub fn silence(sample_rate: u32, channels: u16, frames: usize) -> Self {
        Self {
            sample_rate,
            channels,
            interleaved_f32: vec![0.0; frames * usize::from(channels)],
        }
    }

    /// Number of sample frames (one sample per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.interleaved_f32.len() / usize::from(self.channels)
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Sample frame index covering `secs`.
    pub fn frame_at(&self, secs: f64) -> usize {
        (secs.max(0.0) * f64::from(self.sample_rate)).floor() as usize
    }

    /// Channel-averaged sample at sample frame `idx`, or `None` past the end.
    pub fn mono_at(&self, idx: usize) -> Option<f32> {
        let ch = usize::from(self.channels);
        if ch == 0 {
            return None;
        }
        let start = idx.checked_mul(ch)?;
        let frame = self.interleaved_f32.get(start..start + ch)?;
        Some(frame.iter().sum::<f32>() / ch as f32)
    }

    /// Trim or zero-pad to exactly `frames` sample frames.
    pub fn fit_to_frames(&mut self, frames: usize) {
        self.interleaved_f32
            .resize(frames * usize::from(self.channels), 0.0);
    }

    pub fn check_layout(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate is zero".to_string());
        }
        if self.channels == 0 {
            return Err("channel count is zero".to_string());
        }
        if !self
            .interleaved_f32
            .len()
            .is_multiple_of(usize::from(self.channels))
        {
            return Err(format!(
                "{} samples do not divide into {} channels",
                self.interleaved_f32.len(),
                self.channels
            ));
        }
        Ok(())
    }

    /// Write raw little-endian `f32` samples, the format ffmpeg reads with `-f f32le`.
    pub fn write_f32le(&self, out_path: &Path) -> ToonResult<()> {
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ToonError::encode(format!(
                    "failed to create audio output directory '{}': {e}",
                    parent.display()
                ))
            })?;
        }

        let mut bytes = Vec::<u8>::with_capacity(self.interleaved_f32.len() * 4);
        for &sample in &self.interleaved_f32 {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        std::fs::write(out_path, bytes).map_err(|e| {
            ToonError::encode(format!(
                "failed to write pcm file '{}': {e}",
                out_path.display()
            ))
        })
    }
}

/// Decoded audio together with the file it came from.
#[derive(Clone, Debug)]
pub struct AudioTrack {
    pub path: PathBuf,
    pub pcm: AudioPcm,
}

impl AudioTrack {
    pub fn new(path: impl Into<PathBuf>, pcm: AudioPcm) -> Self {
        Self {
            path: path.into(),
            pcm,
        }
    }

    /// Decode `path` with the system ffmpeg.
    ///
    /// Dialogue must carry sound: a file without any audio samples is an
    /// [`ToonError::AudioDecode`], never silence.
    pub fn load(path: &Path, sample_rate: u32, channels: u16) -> ToonResult<Self> {
        let pcm = crate::assets::media::decode_audio_f32(path, sample_rate, channels)?;
        Self::from_decoded(path, pcm)
    }

    /// Wrap already decoded dialogue, rejecting empty or ragged PCM.
    pub fn from_decoded(path: &Path, pcm: AudioPcm) -> ToonResult<Self> {
        pcm.check_layout()
            .map_err(|e| ToonError::audio_decode(path, e))?;
        if pcm.is_empty() {
            return Err(ToonError::audio_decode(path, "no audio samples decoded"));
        }
        Ok(Self::new(path, pcm))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/pcm.rs"]
mod tests;
