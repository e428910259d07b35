//! toonreel renders lip-synced cartoon scenes and assembles them into finished videos.
//!
//! - Parse a script line ([`parse_line`]) and open an [`AssetLibrary`]
//! - Render it to a per-scene segment with a [`SceneRenderer`]
//! - Join segments, an opening clip and background music with an [`Assembler`]
//!
//! Frames are composited on the CPU with `vello_cpu`; encoding and decoding go through the
//! system `ffmpeg`/`ffprobe` binaries.
#![forbid(unsafe_code)]

mod align;
mod assemble;
mod assets;
mod audio;
mod config;
mod encode;
mod foundation;
mod progress;
mod render;
mod script;

pub use crate::foundation::core::{Affine, Canvas, Fps, FrameIndex, Point, Vec2};
pub use crate::foundation::error::{ErrorKind, ToonError, ToonResult};

pub use crate::align::marker::{MarkerPair, PixelPos, locate_markers};
pub use crate::align::transform::AlignmentTransform;
pub use crate::assemble::plan::{AssemblyPlan, plan_assembly};
pub use crate::assemble::{AssembleRequest, Assembler, AssemblyStage, Cartoon};
pub use crate::assets::decode::{Raster, crop_to_even, load_raster};
pub use crate::assets::library::{AssetLibrary, MotionSet, MouthSet};
pub use crate::assets::media::{MediaInfo, decode_audio_f32, is_ffprobe_on_path, probe_media};
pub use crate::audio::mix::BackgroundMix;
pub use crate::audio::mouth::{MouthShape, MouthThresholds, map_mouth_shapes};
pub use crate::audio::pcm::{AudioPcm, AudioTrack};
pub use crate::config::{CaptionConfig, MarkerColors, RenderConfig};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts, is_ffmpeg_on_path};
pub use crate::encode::sink::{AudioInputConfig, FrameSink, InMemorySink, SinkConfig};
pub use crate::progress::{Progress, ignore_progress};
pub use crate::render::caption::{CaptionLayer, CaptionRenderer, wrap_words};
pub use crate::render::compositor::{FrameWorker, SceneCompositor};
pub use crate::render::frame::FrameRGBA;
pub use crate::render::scene::{
    PreparedScene, RenderStats, SceneRenderer, SceneRequest, SceneStage, Segment,
};
pub use crate::render::schedule::{motion_cycle_len, schedule_motion};
pub use crate::script::{
    Scene, ScriptLine, parse_line, parse_script, resolve_scene_duration, strip_stage_directions,
};
