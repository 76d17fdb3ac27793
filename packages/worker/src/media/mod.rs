pub mod error;
pub mod ffmpeg;

use std::path::Path;

use async_trait::async_trait;
use error::MediaError;

/// Width of every preview frame.
pub const PREVIEW_WIDTH: u32 = 480;
/// Height of every preview frame.
pub const PREVIEW_HEIGHT: u32 = 270;
/// Frame rate of the animated preview.
pub const PREVIEW_FPS: u32 = 2;
/// Duration assumed when probing fails.
pub const FALLBACK_DURATION_SECS: f64 = 12.0;
/// Fractions of the duration at which preview stills are sampled.
pub const SAMPLE_FRACTIONS: [f64; 6] = [0.10, 0.25, 0.40, 0.55, 0.70, 0.85];

/// A fixed-resolution output of the transcoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenditionSpec {
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
    pub audio_bitrate: &'static str,
}

pub const RENDITION_720P: RenditionSpec = RenditionSpec {
    label: "720p",
    width: 1280,
    height: 720,
    audio_bitrate: "128k",
};

pub const RENDITION_480P: RenditionSpec = RenditionSpec {
    label: "480p",
    width: 854,
    height: 480,
    audio_bitrate: "96k",
};

/// File name of the `index`-th (0-based) preview still inside a frame dir.
pub fn frame_file_name(index: usize) -> String {
    format!("frame_{:02}.jpg", index + 1)
}

/// Timestamps (seconds) of the preview stills for a clip of `duration`.
pub fn sample_timestamps(duration: f64) -> Vec<f64> {
    let duration = if duration.is_finite() { duration } else { 0.0 };
    SAMPLE_FRACTIONS
        .iter()
        .map(|fraction| (duration * fraction).max(0.0))
        .collect()
}

/// External audio/video codec tool.
///
/// Every operation reads and writes local files only; a non-zero exit of
/// the underlying tool is an error.
#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Duration of the media in seconds.
    async fn probe_duration(&self, input: &Path) -> Result<f64, MediaError>;

    /// Write one still at `timestamp`, cropped to 16:9 (or 9:16) and fitted
    /// to the preview canvas.
    async fn extract_frame(
        &self,
        input: &Path,
        timestamp: f64,
        output: &Path,
    ) -> Result<(), MediaError>;

    /// Assemble the stills in `frame_dir` into a looping animated preview.
    async fn build_animated_preview(&self, frame_dir: &Path, output: &Path)
    -> Result<(), MediaError>;

    /// Transcode `input` to the given rendition, padding to keep the aspect ratio.
    async fn transcode(
        &self,
        input: &Path,
        spec: &RenditionSpec,
        output: &Path,
    ) -> Result<(), MediaError>;
}
