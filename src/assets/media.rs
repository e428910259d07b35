use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::{
    audio::pcm::AudioPcm,
    foundation::core::Canvas,
    foundation::error::{ToonError, ToonResult},
};

/// Container facts reported by `ffprobe`.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaInfo {
    pub path: PathBuf,
    /// `None` for audio-only files.
    pub canvas: Option<Canvas>,
    pub duration_secs: f64,
    pub has_audio: bool,
}

pub fn is_ffprobe_on_path() -> bool {
    Command::new("ffprobe")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn probe_media(path: &Path) -> ToonResult<MediaInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        #[serde(default)]
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .output()
        .map_err(|e| ToonError::encode(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(ToonError::encode(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| ToonError::encode(format!("ffprobe json parse failed: {e}")))?;

    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let canvas = match video {
        Some(v) => match (v.width, v.height) {
            (Some(width), Some(height)) => Some(Canvas { width, height }),
            _ => {
                return Err(ToonError::encode(format!(
                    "ffprobe reported a video stream without dimensions in '{}'",
                    path.display()
                )));
            }
        },
        None => None,
    };

    let duration_secs = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or_else(|| video.and_then(|v| v.duration.as_deref()))
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);
    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(MediaInfo {
        path: path.to_path_buf(),
        canvas,
        duration_secs,
        has_audio,
    })
}

/// Decode the first audio stream of `path` into interleaved `f32` at the requested layout.
///
/// Files without any audio stream decode to empty PCM.
pub fn decode_audio_f32(path: &Path, sample_rate: u32, channels: u16) -> ToonResult<AudioPcm> {
    if !path.is_file() {
        return Err(ToonError::audio_decode(path, "file does not exist"));
    }

    let out = Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            &channels.to_string(),
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .output()
        .map_err(|e| ToonError::audio_decode(path, format!("failed to run ffmpeg: {e}")))?;

    if !out.status.success() {
        let msg = String::from_utf8_lossy(&out.stderr);
        if msg.contains("Stream specifier")
            || msg.contains("matches no streams")
            || msg.contains("Output file #0 does not contain any stream")
            || msg.contains("does not contain any stream")
        {
            return Ok(AudioPcm {
                sample_rate,
                channels,
                interleaved_f32: Vec::new(),
            });
        }
        return Err(ToonError::audio_decode(path, msg.trim().to_string()));
    }

    if !out.stdout.len().is_multiple_of(4) {
        return Err(ToonError::audio_decode(
            path,
            "decoded byte length is not aligned to f32 samples",
        ));
    }
    let mut pcm = Vec::<f32>::with_capacity(out.stdout.len() / 4);
    for chunk in out.stdout.chunks_exact(4) {
        pcm.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }

    Ok(AudioPcm {
        sample_rate,
        channels,
        interleaved_f32: pcm,
    })
}
