use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::{
    assets::library::AssetLibrary,
    audio::mouth::{MouthShape, MouthThresholds, map_mouth_shapes},
    audio::pcm::{AudioPcm, AudioTrack},
    config::RenderConfig,
    encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts},
    encode::sink::{AudioInputConfig, FrameSink, SinkConfig},
    foundation::core::FrameIndex,
    foundation::error::{ToonError, ToonResult},
    progress::Progress,
    render::caption::CaptionRenderer,
    render::compositor::SceneCompositor,
    render::frame::FrameRGBA,
    render::schedule::schedule_motion,
    script::{Scene, ScriptLine, resolve_scene_duration},
};

/// Lifecycle of one scene render, reported through `tracing`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SceneStage {
    Init,
    MarkersResolved,
    FramesComposited,
    Muxed,
    Written,
    Failed,
}

/// One script line to render.
#[derive(Clone, Copy, Debug)]
pub struct SceneRequest<'a> {
    /// Caller-supplied index; selects `scene_<index>.mp4`.
    pub index: usize,
    pub line: &'a ScriptLine,
    /// Dialogue audio for the line, if any.
    pub audio: Option<&'a Path>,
    /// Overrides the line's own duration and the audio length.
    pub duration_secs: Option<f64>,
}

/// Everything needed to produce a scene's frames, resolved up front.
#[derive(Debug)]
pub struct PreparedScene {
    pub scene: Scene,
    pub compositor: SceneCompositor,
    /// Motion frame index per output frame.
    pub schedule: Vec<usize>,
    /// Mouth shape per output frame.
    pub mouths: Vec<MouthShape>,
    /// Segment audio, exactly as long as the frames.
    pub audio: AudioPcm,
}

impl PreparedScene {
    pub fn total_frames(&self) -> u64 {
        self.schedule.len() as u64
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub frames_total: u64,
    /// Frames actually composited; the rest reuse an identical earlier frame.
    pub frames_rendered: u64,
    pub frames_elided: u64,
}

/// A written scene video.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    pub index: usize,
    pub path: PathBuf,
    pub duration_secs: f64,
    pub frames: u64,
}

/// Renders script lines into per-scene MP4 segments under one output directory.
#[derive(Debug)]
pub struct SceneRenderer {
    cfg: RenderConfig,
    library: AssetLibrary,
    output_dir: PathBuf,
}

impl SceneRenderer {
    pub fn new(
        cfg: RenderConfig,
        library: AssetLibrary,
        output_dir: impl Into<PathBuf>,
    ) -> ToonResult<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            library,
            output_dir: output_dir.into(),
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.cfg
    }

    pub fn segment_path(&self, index: usize) -> PathBuf {
        self.output_dir.join(format!("scene_{index}.mp4"))
    }

    /// Resolve duration, assets, markers, schedules and audio for one line.
    pub fn prepare(&self, req: &SceneRequest<'_>) -> ToonResult<PreparedScene> {
        let cfg = &self.cfg;
        let line = req.line;
        if line.character.trim().is_empty() {
            return Err(ToonError::parse(line.text.clone(), "line has no character"));
        }

        let track = match req.audio {
            Some(path) => Some(AudioTrack::load(path, cfg.sample_rate, cfg.channels)?),
            None => None,
        };
        let audio_secs = track
            .as_ref()
            .map(|t| t.pcm.duration_secs())
            .filter(|s| *s > 0.0);
        let duration = resolve_scene_duration(
            req.duration_secs.or(line.duration_secs),
            audio_secs,
            cfg.default_scene_secs,
        );
        if let Some(a) = audio_secs
            && a + cfg.fps.frame_duration_secs() < duration
        {
            tracing::warn!(
                audio_secs = a,
                duration,
                "audio is shorter than the scene; padding with silence"
            );
        }
        let scene = Scene::from_line(line, duration);

        let motion = self
            .library
            .motion_frames(&scene.character, &scene.direction, &scene.action)?;
        let mouth_set = self.library.mouth_set(&scene.character)?;

        let caption = if cfg.caption.enabled && !scene.dialogue.is_empty() {
            let font_path = cfg.caption_font_path(self.library.root());
            let mut renderer = CaptionRenderer::load(&cfg.caption, &font_path)?;
            let canvas = motion
                .frames
                .first()
                .map(|f| f.canvas())
                .ok_or_else(|| ToonError::missing_asset("scene has no motion frames"))?;
            renderer.render(&scene.dialogue, canvas)?
        } else {
            None
        };

        let compositor = SceneCompositor::new(cfg, &motion.frames, &mouth_set, caption)?;
        log_stage(SceneStage::MarkersResolved);

        let total = cfg.fps.secs_to_frames_ceil(duration) as usize;
        let schedule = schedule_motion(
            compositor.motion_count(),
            total,
            cfg.min_motion_cycle_frames,
        )?;
        let mouths = map_mouth_shapes(
            track.as_ref(),
            duration,
            cfg.fps,
            MouthThresholds::from_config(cfg),
        )?;
        if mouths.len() != schedule.len() {
            return Err(ToonError::validation(format!(
                "mouth track has {} frames, motion schedule has {}",
                mouths.len(),
                schedule.len()
            )));
        }

        let audio_frames = (cfg.fps.frames_to_secs(total as u64) * f64::from(cfg.sample_rate))
            .round() as usize;
        let audio = match track {
            Some(t) => {
                let mut pcm = t.pcm;
                pcm.fit_to_frames(audio_frames);
                pcm
            }
            None => AudioPcm::silence(cfg.sample_rate, cfg.channels, audio_frames),
        };

        tracing::debug!(
            character = %scene.character,
            action = %motion.action,
            motion_frames = compositor.motion_count(),
            frames = total,
            "scene prepared"
        );

        Ok(PreparedScene {
            scene,
            compositor,
            schedule,
            mouths,
            audio,
        })
    }

    /// Composite every frame of `prepared` into `sink`, in order.
    ///
    /// Frames with the same motion image and mouth shape are composited once per chunk.
    pub fn render_into(
        &self,
        prepared: &PreparedScene,
        audio: Option<AudioInputConfig>,
        sink: &mut dyn FrameSink,
        progress: &mut dyn FnMut(Progress),
    ) -> ToonResult<RenderStats> {
        let comp = &prepared.compositor;
        let canvas = comp.canvas();
        let total = prepared.total_frames();
        sink.begin(SinkConfig {
            width: canvas.width,
            height: canvas.height,
            fps: self.cfg.fps,
            total_frames: total,
            audio,
        })?;

        let chunk_size = self.cfg.chunk_size.max(1);
        let mut stats = RenderStats {
            frames_total: total,
            ..RenderStats::default()
        };
        let mut worker = comp.worker();
        let keys: Vec<(usize, MouthShape)> = prepared
            .schedule
            .iter()
            .copied()
            .zip(prepared.mouths.iter().copied())
            .collect();

        for (chunk_no, chunk) in keys.chunks(chunk_size).enumerate() {
            let mut unique = Vec::<(usize, MouthShape)>::new();
            let mut slot_of = HashMap::<(usize, MouthShape), usize>::new();
            let slots: Vec<usize> = chunk
                .iter()
                .map(|key| {
                    *slot_of.entry(*key).or_insert_with(|| {
                        unique.push(*key);
                        unique.len() - 1
                    })
                })
                .collect();

            let rendered: Vec<FrameRGBA> = if self.cfg.parallel && unique.len() > 1 {
                unique
                    .par_iter()
                    .map_init(
                        || comp.worker(),
                        |w, &(motion, mouth)| comp.compose(w, motion, mouth),
                    )
                    .collect::<ToonResult<Vec<_>>>()?
            } else {
                unique
                    .iter()
                    .map(|&(motion, mouth)| comp.compose(&mut worker, motion, mouth))
                    .collect::<ToonResult<Vec<_>>>()?
            };
            stats.frames_rendered += rendered.len() as u64;

            let base = (chunk_no * chunk_size) as u64;
            for (offset, slot) in slots.into_iter().enumerate() {
                let idx = base + offset as u64;
                sink.push_frame(FrameIndex(idx), &rendered[slot])?;
                progress(Progress::FrameComposited {
                    done: idx + 1,
                    total,
                });
            }
        }
        stats.frames_elided = stats.frames_total - stats.frames_rendered;
        log_stage(SceneStage::FramesComposited);

        sink.end()?;
        Ok(stats)
    }

    /// Render one line to `<output_dir>/scene_<index>.mp4`, replacing any earlier file.
    ///
    /// On failure nothing is left at the segment path and the scratch directory is removed.
    #[tracing::instrument(skip(self, req, progress), fields(index = req.index, character = %req.line.character))]
    pub fn render(
        &self,
        req: &SceneRequest<'_>,
        progress: &mut dyn FnMut(Progress),
    ) -> ToonResult<Segment> {
        log_stage(SceneStage::Init);
        match self.render_inner(req, progress) {
            Ok(segment) => {
                log_stage(SceneStage::Written);
                tracing::info!(
                    path = %segment.path.display(),
                    frames = segment.frames,
                    duration_secs = segment.duration_secs,
                    "segment written"
                );
                progress(Progress::SegmentWritten {
                    index: segment.index,
                    path: segment.path.clone(),
                });
                Ok(segment)
            }
            Err(e) => {
                log_stage(SceneStage::Failed);
                tracing::error!(error = %e, kind = ?e.kind(), "scene render failed");
                Err(e)
            }
        }
    }

    fn render_inner(
        &self,
        req: &SceneRequest<'_>,
        progress: &mut dyn FnMut(Progress),
    ) -> ToonResult<Segment> {
        let final_path = self.segment_path(req.index);
        remove_stale_segment(&final_path)?;
        let prepared = self.prepare(req)?;

        std::fs::create_dir_all(&self.output_dir).map_err(|e| {
            ToonError::encode(format!(
                "failed to create output directory '{}': {e}",
                self.output_dir.display()
            ))
        })?;
        let scratch = tempfile::Builder::new()
            .prefix("toonreel-scene-")
            .tempdir()
            .map_err(|e| ToonError::encode(format!("failed to create scratch directory: {e}")))?;

        let pcm_path = scratch.path().join("audio.f32le");
        prepared.audio.write_f32le(&pcm_path)?;
        let audio = AudioInputConfig {
            path: pcm_path,
            sample_rate: prepared.audio.sample_rate,
            channels: prepared.audio.channels,
        };

        let partial = OutputGuard::new(
            self.output_dir
                .join(format!(".scene_{}.partial.mp4", req.index)),
        );
        let mut sink = FfmpegSink::new(FfmpegSinkOpts {
            out_path: partial.path().to_path_buf(),
            overwrite: true,
            bg_rgba: self.cfg.bg_rgba,
            crf: self.cfg.crf,
        });
        let stats = self.render_into(&prepared, Some(audio), &mut sink, progress)?;
        drop(sink);
        log_stage(SceneStage::Muxed);
        tracing::debug!(
            rendered = stats.frames_rendered,
            elided = stats.frames_elided,
            "frames encoded"
        );

        partial.commit_to(&final_path)?;
        Ok(Segment {
            index: req.index,
            path: final_path,
            duration_secs: prepared.scene.duration_secs,
            frames: stats.frames_total,
        })
    }
}

/// Drop an earlier segment at `path`; a missing file is fine.
fn remove_stale_segment(path: &Path) -> ToonResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed previous segment");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ToonError::encode(format!(
            "failed to remove previous segment '{}': {e}",
            path.display()
        ))),
    }
}

fn log_stage(stage: SceneStage) {
    tracing::debug!(?stage, "scene stage");
}

/// Removes a partially written output unless it is committed.
pub(crate) struct OutputGuard(Option<PathBuf>);

impl OutputGuard {
    pub(crate) fn new(path: PathBuf) -> Self {
        let _ = std::fs::remove_file(&path);
        Self(Some(path))
    }

    pub(crate) fn path(&self) -> &Path {
        self.0.as_deref().unwrap_or(Path::new(""))
    }

    /// Move the finished file into place.
    pub(crate) fn commit_to(mut self, dest: &Path) -> ToonResult<()> {
        let Some(src) = self.0.take() else {
            return Err(ToonError::encode("output already committed"));
        };
        if let Err(e) = std::fs::rename(&src, dest) {
            let _ = std::fs::remove_file(&src);
            return Err(ToonError::encode(format!(
                "failed to move '{}' to '{}': {e}",
                src.display(),
                dest.display()
            )));
        }
        Ok(())
    }
}

impl Drop for OutputGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/scene.rs"]
mod tests;
