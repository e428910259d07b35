//! Cartoon assembly: concatenate rendered segments, optionally behind an opening clip, and lay
//! background music under the result.

pub(crate) mod plan;

use std::path::{Path, PathBuf};

use crate::{
    assemble::plan::{AssemblyPlan, plan_assembly},
    assets::media::{MediaInfo, is_ffprobe_on_path, probe_media},
    audio::mix::BackgroundMix,
    config::RenderConfig,
    encode::ffmpeg::{
        VideoEncoding, concat_clips, is_ffmpeg_on_path, mix_background_audio, normalize_clip,
        require_canvas,
    },
    foundation::error::{ToonError, ToonResult},
    progress::Progress,
    render::scene::OutputGuard,
};

/// Lifecycle of one assembly, reported through `tracing`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssemblyStage {
    CollectSegments,
    DirectConcat,
    BatchConcat,
    MixBackgroundAudio,
    Write,
    Done,
    Failed,
}

/// Inputs for one cartoon.
#[derive(Clone, Debug)]
pub struct AssembleRequest {
    /// Segment files in playback order.
    pub segments: Vec<PathBuf>,
    /// Prepended when present on disk; must match the panel size.
    pub opening: Option<PathBuf>,
    pub background: Option<PathBuf>,
    pub output_dir: PathBuf,
    /// File name prefix of the final `<prefix>_<id>.mp4`.
    pub prefix: String,
}

/// A finished cartoon on disk.
#[derive(Clone, Debug, PartialEq)]
pub struct Cartoon {
    pub path: PathBuf,
    /// Measured with ffprobe on the encoded result.
    pub duration_secs: f64,
    /// Sum of the input durations (opening included).
    pub expected_secs: f64,
    pub segments: usize,
    pub batches: usize,
}

/// Joins segments into one final video under bounded memory.
#[derive(Debug)]
pub struct Assembler {
    cfg: RenderConfig,
    scratch_root: Option<PathBuf>,
}

impl Assembler {
    pub fn new(cfg: RenderConfig) -> ToonResult<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            scratch_root: None,
        })
    }

    /// Create scratch directories under `dir` instead of the system temp dir.
    pub fn with_scratch_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(dir.into());
        self
    }

    fn encoding(&self) -> VideoEncoding {
        VideoEncoding {
            fps: self.cfg.fps,
            crf: self.cfg.crf,
            sample_rate: self.cfg.sample_rate,
            channels: self.cfg.channels,
        }
    }

    /// Build `<output_dir>/<prefix>_<id>.mp4` from `req`.
    ///
    /// Any missing or unreadable segment aborts the whole assembly. Scratch files are removed on
    /// every exit path and no partial cartoon is left behind.
    #[tracing::instrument(skip(self, req, progress), fields(segments = req.segments.len()))]
    pub fn assemble(
        &self,
        req: &AssembleRequest,
        progress: &mut dyn FnMut(Progress),
    ) -> ToonResult<Cartoon> {
        match self.assemble_inner(req, progress) {
            Ok(cartoon) => {
                log_stage(AssemblyStage::Done);
                tracing::info!(
                    path = %cartoon.path.display(),
                    duration_secs = cartoon.duration_secs,
                    batches = cartoon.batches,
                    "cartoon written"
                );
                progress(Progress::CartoonWritten {
                    path: cartoon.path.clone(),
                });
                Ok(cartoon)
            }
            Err(e) => {
                log_stage(AssemblyStage::Failed);
                tracing::error!(error = %e, kind = ?e.kind(), "assembly failed");
                Err(e)
            }
        }
    }

    fn assemble_inner(
        &self,
        req: &AssembleRequest,
        progress: &mut dyn FnMut(Progress),
    ) -> ToonResult<Cartoon> {
        log_stage(AssemblyStage::CollectSegments);
        let plan = plan_assembly(
            req.segments.len(),
            self.cfg.direct_concat_limit,
            self.cfg.batch_size,
        )?;

        let mut builder = tempfile::Builder::new();
        builder.prefix("toonreel-assembly-");
        let scratch = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| ToonError::encode(format!("failed to create scratch directory: {e}")))?;

        let segments = collect_segments(&req.segments)?;
        if !is_ffmpeg_on_path() || !is_ffprobe_on_path() {
            return Err(ToonError::encode(
                "ffmpeg and ffprobe are required for assembly, but were not found on PATH",
            ));
        }

        let enc = self.encoding();
        let panel = self.cfg.panel;
        let mut expected_secs = 0.0;
        for info in self.probe_segments(&segments)? {
            require_canvas(
                &format!("segment '{}'", info.path.display()),
                panel,
                info.canvas,
            )?;
            expected_secs += info.duration_secs;
        }

        let opening = match &req.opening {
            Some(path) if path.is_file() => {
                let info = probe_media(path)?;
                require_canvas("opening clip", panel, info.canvas)?;
                let normalized = scratch.path().join("opening.mp4");
                normalize_clip(path, info.has_audio, &normalized, &enc)?;
                expected_secs += info.duration_secs;
                Some(normalized)
            }
            Some(path) => {
                tracing::info!(path = %path.display(), "no opening clip on disk, skipping");
                None
            }
            None => None,
        };

        let combined = scratch.path().join("combined.mp4");
        let final_list = scratch.path().join("combined.txt");
        match &plan {
            AssemblyPlan::Direct => {
                log_stage(AssemblyStage::DirectConcat);
                let inputs: Vec<PathBuf> = opening.into_iter().chain(segments).collect();
                concat_clips(&inputs, &final_list, &combined, &enc)?;
            }
            AssemblyPlan::Batched { batches } => {
                log_stage(AssemblyStage::BatchConcat);
                let mut inputs: Vec<PathBuf> = opening.into_iter().collect();
                for (k, range) in batches.iter().enumerate() {
                    let out = scratch.path().join(format!("batch_{k}.mp4"));
                    concat_clips(
                        &segments[range.clone()],
                        &scratch.path().join(format!("batch_{k}.txt")),
                        &out,
                        &enc,
                    )?;
                    tracing::info!(batch = k + 1, total = batches.len(), "batch written");
                    progress(Progress::BatchWritten {
                        batch: k + 1,
                        total: batches.len(),
                    });
                    inputs.push(out);
                }
                concat_clips(&inputs, &final_list, &combined, &enc)?;
            }
        }

        let mut current = combined;
        if let Some(bg) = &req.background {
            log_stage(AssemblyStage::MixBackgroundAudio);
            current = self.mix_background_track(&current, bg, scratch.path())?;
        }

        let duration_secs = probe_media(&current)?.duration_secs;
        let drift = (duration_secs - expected_secs).abs();
        if drift > self.cfg.fps.frame_duration_secs() {
            tracing::warn!(duration_secs, expected_secs, "cartoon length drifted from inputs");
        }

        log_stage(AssemblyStage::Write);
        std::fs::create_dir_all(&req.output_dir).map_err(|e| {
            ToonError::encode(format!(
                "failed to create output directory '{}': {e}",
                req.output_dir.display()
            ))
        })?;
        let name = format!("{}_{:08x}.mp4", req.prefix, rand::random::<u32>());
        let final_path = req.output_dir.join(&name);
        let partial = OutputGuard::new(req.output_dir.join(format!(".{name}.partial")));
        std::fs::copy(&current, partial.path()).map_err(|e| {
            ToonError::encode(format!(
                "failed to write '{}': {e}",
                partial.path().display()
            ))
        })?;
        partial.commit_to(&final_path)?;

        Ok(Cartoon {
            path: final_path,
            duration_secs,
            expected_secs,
            segments: req.segments.len(),
            batches: plan.batch_count(),
        })
    }

    fn probe_segments(&self, segments: &[PathBuf]) -> ToonResult<Vec<MediaInfo>> {
        segments
            .iter()
            .map(|p| {
                probe_media(p).map_err(|e| {
                    tracing::debug!(path = %p.display(), error = %e, "segment probe failed");
                    ToonError::segment_not_found(p)
                })
            })
            .collect()
    }

    /// Mix `background` under the audio of `video` in one ffmpeg pass; returns the new video path.
    fn mix_background_track(
        &self,
        video: &Path,
        background: &Path,
        scratch: &Path,
    ) -> ToonResult<PathBuf> {
        if !background.is_file() {
            return Err(ToonError::missing_asset(format!(
                "background audio '{}'",
                background.display()
            )));
        }
        let bg = probe_media(background)
            .map_err(|e| ToonError::audio_decode(background, e.to_string()))?;
        if !bg.has_audio {
            return Err(ToonError::audio_decode(background, "no audio stream"));
        }
        let info = probe_media(video)?;
        let mix = BackgroundMix::new(
            self.cfg.background_volume,
            self.cfg.sample_rate,
            self.cfg.channels,
        )?;

        let out = scratch.join("mixed.mp4");
        mix_background_audio(video, info.has_audio, background, &mix, &out, &self.encoding())?;
        Ok(out)
    }
}

/// Absolute paths of every segment, failing on the first missing or unreadable one.
fn collect_segments(segments: &[PathBuf]) -> ToonResult<Vec<PathBuf>> {
    let mut out = Vec::with_capacity(segments.len());
    for p in segments {
        if !p.is_file() || std::fs::File::open(p).is_err() {
            return Err(ToonError::segment_not_found(p));
        }
        let abs = std::path::absolute(p).map_err(|_| ToonError::segment_not_found(p))?;
        out.push(abs);
    }
    Ok(out)
}

fn log_stage(stage: AssemblyStage) {
    tracing::debug!(?stage, "assembly stage");
}

#[cfg(test)]
#[path = "../../tests/unit/assemble/assembler.rs"]
mod tests;
