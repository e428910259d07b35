use std::path::PathBuf;

/// Convenience result type used across toonreel.
pub type ToonResult<T> = Result<T, ToonError>;

/// Error taxonomy for scene rendering and cartoon assembly.
///
/// Every variant is fatal for the current unit of work (one scene, or one assembly).
#[derive(thiserror::Error, Debug)]
pub enum ToonError {
    /// A motion frame lacks one of its alignment markers (or the pair is degenerate).
    #[error("markers not found in '{frame}': {reason}")]
    MarkersNotFound {
        /// Motion frame label (usually its source path).
        frame: String,
        /// Which marker is missing, or why the pair is unusable.
        reason: String,
    },

    /// A mouth shape, motion frame, font or other on-disk asset is absent.
    #[error("missing asset: {asset}")]
    MissingAsset {
        /// Asset path or logical name.
        asset: String,
    },

    /// An audio track could not be decoded or sampled.
    #[error("audio decode error for '{}': {reason}", path.display())]
    AudioDecode {
        /// Offending audio file.
        path: PathBuf,
        /// Decoder failure description.
        reason: String,
    },

    /// Frame or clip dimensions do not match what the pipeline requires.
    #[error("dimension mismatch for {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        /// What was being checked (opening clip, motion frame, segment).
        what: String,
        /// Required dimensions.
        expected: String,
        /// Observed dimensions.
        got: String,
    },

    /// A segment handed to the assembler is missing or unreadable.
    #[error("segment not found or unreadable: '{}'", path.display())]
    SegmentNotFound {
        /// Offending segment path.
        path: PathBuf,
    },

    /// The underlying video/audio writer (ffmpeg) failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// A script line could not be parsed.
    #[error("parse error: {reason} (line: {line:?})")]
    Parse {
        /// Raw script line.
        line: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Invalid configuration or arguments.
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Payload-free classification of a [`ToonError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MarkersNotFound,
    MissingAsset,
    AudioDecode,
    DimensionMismatch,
    SegmentNotFound,
    Encode,
    Parse,
    Validation,
    Other,
}

impl ToonError {
    pub fn markers_not_found(frame: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MarkersNotFound {
            frame: frame.into(),
            reason: reason.into(),
        }
    }

    pub fn missing_asset(asset: impl Into<String>) -> Self {
        Self::MissingAsset {
            asset: asset.into(),
        }
    }

    pub fn audio_decode(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::AudioDecode {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn dimension_mismatch(
        what: impl Into<String>,
        expected: impl Into<String>,
        got: impl Into<String>,
    ) -> Self {
        Self::DimensionMismatch {
            what: what.into(),
            expected: expected.into(),
            got: got.into(),
        }
    }

    pub fn segment_not_found(path: impl Into<PathBuf>) -> Self {
        Self::SegmentNotFound { path: path.into() }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn parse(line: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            line: line.into(),
            reason: reason.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MarkersNotFound { .. } => ErrorKind::MarkersNotFound,
            Self::MissingAsset { .. } => ErrorKind::MissingAsset,
            Self::AudioDecode { .. } => ErrorKind::AudioDecode,
            Self::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            Self::SegmentNotFound { .. } => ErrorKind::SegmentNotFound,
            Self::Encode(_) => ErrorKind::Encode,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Other(_) => ErrorKind::Other,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
