use std::ffi::OsString;
use std::io::{Read, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use crate::audio::mix::{BackgroundMix, MIX_LABEL};
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::{Canvas, Fps, FrameIndex};
use crate::foundation::error::{ToonError, ToonResult};
use crate::render::frame::{FrameRGBA, flatten_premul_over_bg};

/// Output settings shared by every ffmpeg invocation of one render or assembly.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoEncoding {
    pub fps: Fps,
    pub crf: u8,
    pub sample_rate: u32,
    pub channels: u16,
}

impl VideoEncoding {
    fn video_args(&self) -> Vec<String> {
        vec![
            "-c:v".into(),
            "libx264".into(),
            "-crf".into(),
            self.crf.to_string(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-r".into(),
            format!("{}/{}", self.fps.num, self.fps.den),
        ]
    }

    fn audio_args(&self) -> Vec<String> {
        vec![
            "-c:a".into(),
            "aac".into(),
            "-ar".into(),
            self.sample_rate.to_string(),
            "-ac".into(),
            self.channels.to_string(),
        ]
    }
}

/// Options for [`FfmpegSink`].
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    pub out_path: PathBuf,
    pub overwrite: bool,
    /// Background colour used to flatten alpha (straight RGBA8).
    pub bg_rgba: [u8; 4],
    pub crf: u8,
}

impl FfmpegSinkOpts {
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
            bg_rgba: [0, 0, 0, 255],
            crf: 23,
        }
    }
}

/// Spawns the system `ffmpeg` and streams raw frames to its stdin.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,

    scratch: Vec<u8>,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
}

impl FfmpegSink {
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            scratch: Vec::new(),
            cfg: None,
            last_idx: None,
        }
    }

    pub fn out_path(&self) -> &Path {
        &self.opts.out_path
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        // Unfinished encode: close the pipe and reap the child.
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(handle) = self.stderr_drain.take() {
            let _ = handle.join();
        }
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> ToonResult<()> {
        if cfg.fps.num == 0 || cfg.fps.den == 0 {
            return Err(ToonError::validation("fps must be non-zero"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(ToonError::validation(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(ToonError::dimension_mismatch(
                "ffmpeg sink frame",
                "even width and height (yuv420p)",
                format!("{}x{}", cfg.width, cfg.height),
            ));
        }

        ensure_parent_dir(&self.opts.out_path)?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(ToonError::validation(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }

        if !is_ffmpeg_on_path() {
            return Err(ToonError::encode(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.arg(if self.opts.overwrite { "-y" } else { "-n" });

        // ffmpeg has no premultiplied input format; frames are flattened in push_frame.
        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &format!("{}/{}", cfg.fps.num, cfg.fps.den),
            "-i",
            "pipe:0",
        ]);

        let crf = self.opts.crf.to_string();
        if let Some(audio) = cfg.audio.as_ref() {
            if audio.sample_rate == 0 || audio.channels == 0 {
                return Err(ToonError::validation(
                    "audio sample_rate and channels must be non-zero",
                ));
            }
            cmd.args([
                "-f",
                "f32le",
                "-ar",
                &audio.sample_rate.to_string(),
                "-ac",
                &audio.channels.to_string(),
                "-i",
            ])
            .arg(&audio.path)
            .args([
                "-c:v", "libx264", "-crf", &crf, "-pix_fmt", "yuv420p", "-c:a", "aac",
                "-shortest", "-movflags", "+faststart",
            ]);
        } else {
            cmd.args([
                "-an", "-c:v", "libx264", "-crf", &crf, "-pix_fmt", "yuv420p", "-movflags",
                "+faststart",
            ]);
        }
        cmd.arg(&self.opts.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            ToonError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ToonError::encode("failed to open ffmpeg stdin"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ToonError::encode("failed to open ffmpeg stderr"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        tracing::debug!(out = %self.opts.out_path.display(), "ffmpeg sink started");
        self.scratch = vec![0u8; cfg.width as usize * cfg.height as usize * 4];
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> ToonResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| ToonError::encode("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(ToonError::encode(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        self.last_idx = Some(idx);

        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(ToonError::dimension_mismatch(
                "encoded frame",
                format!("{}x{}", cfg.width, cfg.height),
                format!("{}x{}", frame.width, frame.height),
            ));
        }
        if frame.data.len() != self.scratch.len() {
            return Err(ToonError::validation(
                "frame.data size mismatch with width*height*4",
            ));
        }

        if frame.premultiplied {
            flatten_premul_over_bg(&mut self.scratch, &frame.data, self.opts.bg_rgba)?;
        } else {
            self.scratch.copy_from_slice(&frame.data);
        }

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(ToonError::encode("ffmpeg sink is already finalized"));
        };
        stdin
            .write_all(&self.scratch)
            .map_err(|e| ToonError::encode(format!("failed to write frame to ffmpeg stdin: {e}")))
    }

    fn end(&mut self) -> ToonResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| ToonError::encode("ffmpeg sink not started"))?;

        let status = child
            .wait()
            .map_err(|e| ToonError::encode(format!("failed to wait for ffmpeg to finish: {e}")))?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| ToonError::encode("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| ToonError::encode(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(ToonError::encode(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }

        self.cfg = None;
        Ok(())
    }
}

/// Run `ffmpeg -y -loglevel error <args>` to completion.
pub fn run_ffmpeg(args: &[OsString]) -> ToonResult<()> {
    let out = Command::new("ffmpeg")
        .args(["-y", "-loglevel", "error"])
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| {
            ToonError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;
    if !out.status.success() {
        return Err(ToonError::encode(format!(
            "ffmpeg exited with status {}: {}",
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    Ok(())
}

/// Body of an ffmpeg concat-demuxer list file.
pub fn concat_list(inputs: &[PathBuf]) -> String {
    let mut out = String::new();
    for p in inputs {
        let escaped = p.to_string_lossy().replace('\'', r"'\''");
        out.push_str(&format!("file '{escaped}'\n"));
    }
    out
}

/// Concatenate clips with the concat demuxer, re-encoding to one uniform stream.
pub fn concat_clips(
    inputs: &[PathBuf],
    list_path: &Path,
    out_path: &Path,
    enc: &VideoEncoding,
) -> ToonResult<()> {
    if inputs.is_empty() {
        return Err(ToonError::validation("concat needs at least one input"));
    }
    std::fs::write(list_path, concat_list(inputs)).map_err(|e| {
        ToonError::encode(format!(
            "failed to write concat list '{}': {e}",
            list_path.display()
        ))
    })?;
    ensure_parent_dir(out_path)?;

    let mut args: Vec<OsString> = ["-f", "concat", "-safe", "0", "-i"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(list_path.into());
    args.extend(enc.video_args().into_iter().map(OsString::from));
    args.extend(enc.audio_args().into_iter().map(OsString::from));
    args.extend(["-movflags", "+faststart"].map(OsString::from));
    args.push(out_path.into());
    run_ffmpeg(&args)
}

/// Re-encode `input` to the standard stream layout, adding silent audio when it has none.
pub fn normalize_clip(
    input: &Path,
    has_audio: bool,
    out_path: &Path,
    enc: &VideoEncoding,
) -> ToonResult<()> {
    let mut args: Vec<OsString> = vec!["-i".into(), input.into()];
    if has_audio {
        args.extend(["-map", "0:v:0", "-map", "0:a:0"].map(OsString::from));
    } else {
        let layout = if enc.channels == 1 { "mono" } else { "stereo" };
        args.extend(["-f", "lavfi", "-i"].map(OsString::from));
        args.push(format!("anullsrc=channel_layout={layout}:sample_rate={}", enc.sample_rate).into());
        args.extend(["-map", "0:v:0", "-map", "1:a:0", "-shortest"].map(OsString::from));
    }
    args.extend(enc.video_args().into_iter().map(OsString::from));
    args.extend(enc.audio_args().into_iter().map(OsString::from));
    args.push(out_path.into());
    run_ffmpeg(&args)
}

/// Arguments that lay a looped `background` under the audio of `video`, copying the video stream.
///
/// Without primary audio a silent source stands in, so the background ends up the sole audible
/// track. The output stops with the video.
pub fn background_mix_args(
    video: &Path,
    has_audio: bool,
    background: &Path,
    mix: &BackgroundMix,
    out_path: &Path,
    enc: &VideoEncoding,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-i".into(), video.into()];
    args.extend(["-stream_loop", "-1", "-i"].map(OsString::from));
    args.push(background.into());
    let primary = if has_audio {
        0
    } else {
        args.extend(["-f", "lavfi", "-i"].map(OsString::from));
        args.push(
            format!(
                "anullsrc=channel_layout={}:sample_rate={}",
                mix.channel_layout(),
                mix.sample_rate
            )
            .into(),
        );
        2
    };
    args.push("-filter_complex".into());
    args.push(mix.filter_graph(primary, 1).into());
    args.extend(["-map", "0:v:0", "-map"].map(OsString::from));
    args.push(format!("[{MIX_LABEL}]").into());
    args.extend(["-c:v", "copy"].map(OsString::from));
    args.extend(enc.audio_args().into_iter().map(OsString::from));
    args.extend(["-shortest", "-movflags", "+faststart"].map(OsString::from));
    args.push(out_path.into());
    args
}

pub fn mix_background_audio(
    video: &Path,
    has_audio: bool,
    background: &Path,
    mix: &BackgroundMix,
    out_path: &Path,
    enc: &VideoEncoding,
) -> ToonResult<()> {
    ensure_parent_dir(out_path)?;
    run_ffmpeg(&background_mix_args(
        video, has_audio, background, mix, out_path, enc,
    ))
}

/// Check that a probed clip has exactly the `expected` frame size.
pub fn require_canvas(what: &str, expected: Canvas, got: Option<Canvas>) -> ToonResult<()> {
    match got {
        Some(c) if c == expected => Ok(()),
        Some(c) => Err(ToonError::dimension_mismatch(
            what,
            expected.describe(),
            c.describe(),
        )),
        None => Err(ToonError::dimension_mismatch(
            what,
            expected.describe(),
            "no video stream",
        )),
    }
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> ToonResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
