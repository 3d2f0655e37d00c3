use std::io;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub mod ffmpeg;
pub mod progress;

pub use ffmpeg::{FfmpegTranscoder, TranscodeHandle};

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("transcoder exited with {status}: {message}")]
    Failed { status: String, message: String },

    #[error("transcoder I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("transcode timed out after {0:?}")]
    TimedOut(Duration),

    #[error("transcoder stopped without reporting an outcome")]
    Abandoned,
}

/// Fixed rescale: output height is pinned, width follows the source aspect
/// ratio rounded to an even number of pixels (ffmpeg's `-2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalingSpec {
    pub target_height: u32,
}

impl Default for ScalingSpec {
    fn default() -> Self {
        Self { target_height: 720 }
    }
}

impl ScalingSpec {
    pub fn new(target_height: u32) -> Self {
        Self { target_height }
    }

    /// Value for ffmpeg's `-vf`.
    pub fn filter(&self) -> String {
        format!("scale=-2:{}", self.target_height)
    }

    /// Output size ffmpeg produces for a `width`x`height` source.
    ///
    /// Mirrors libavfilter's evaluation of a `-2` width: the
    /// aspect-preserving width is rounded to the nearest multiple of two.
    pub fn output_dimensions(&self, width: u32, height: u32) -> Option<(u32, u32)> {
        if width == 0 || height == 0 || self.target_height == 0 {
            return None;
        }

        let target = u64::from(self.target_height);
        let denom = u64::from(height) * 2;
        let half_width = (target * u64::from(width) + denom / 2) / denom;

        Some(((half_width * 2) as u32, self.target_height))
    }
}

/// One invocation of the engine.
#[derive(Debug, Clone)]
pub struct TranscodeJob {
    pub job_id: Uuid,
    pub input: PathBuf,
    pub output: PathBuf,
    pub scaling: ScalingSpec,
}

/// External transcoding engine.
///
/// Implementations resolve exactly once per call: `Ok` on the engine's
/// completion signal, `Err` on its failure signal. Whether the output file
/// exists and is non-empty is not checked.
#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    async fn transcode(&self, job: &TranscodeJob) -> Result<(), TranscodeError>;
}
