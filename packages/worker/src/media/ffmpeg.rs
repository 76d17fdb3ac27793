use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::error::MediaError;
use super::{MediaTool, PREVIEW_FPS, PREVIEW_HEIGHT, PREVIEW_WIDTH, RenditionSpec};
use crate::config::MediaConfig;

const PALETTE_FILE: &str = "palette.png";
const FRAME_PATTERN: &str = "frame_%02d.jpg";

/// `MediaTool` backed by the ffmpeg/ffprobe binaries.
#[derive(Debug, Clone)]
pub struct FfmpegTool {
    ffmpeg_bin: String,
    ffprobe_bin: String,
}

impl FfmpegTool {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            ffmpeg_bin: config.ffmpeg_bin.clone(),
            ffprobe_bin: config.ffprobe_bin.clone(),
        }
    }

    async fn run(&self, bin: &str, args: Vec<OsString>) -> Result<Vec<u8>, MediaError> {
        debug!(bin, ?args, "Running media tool");
        let output = Command::new(bin)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| MediaError::Spawn {
                tool: bin.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(MediaError::Failed {
                tool: bin.to_string(),
                status: output.status.to_string(),
                stderr: tail(&String::from_utf8_lossy(&output.stderr), 400),
            });
        }
        Ok(output.stdout)
    }
}

/// Last `max` bytes of tool output, cut on a char boundary.
fn tail(s: &str, max: usize) -> String {
    let s = s.trim();
    if s.len() <= max {
        return s.to_string();
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    s[start..].to_string()
}

fn os(parts: &[&str]) -> Vec<OsString> {
    parts.iter().map(OsString::from).collect()
}

pub(crate) fn probe_args(input: &Path) -> Vec<OsString> {
    let mut args = os(&[
        "-v",
        "error",
        "-show_entries",
        "format=duration",
        "-of",
        "default=noprint_wrappers=1:nokey=1",
    ]);
    args.push(input.into());
    args
}

pub(crate) fn parse_duration(stdout: &[u8]) -> Result<f64, MediaError> {
    let text = String::from_utf8_lossy(stdout);
    let first = text.lines().next().unwrap_or_default().trim();
    match first.parse::<f64>() {
        Ok(d) if d.is_finite() && d > 0.0 => Ok(d),
        _ => Err(MediaError::Probe(first.to_string())),
    }
}

/// Crop the largest centered 16:9 region (9:16 for portrait input), then fit
/// it to the preview canvas with letterboxing.
pub(crate) fn frame_filter() -> String {
    let w = PREVIEW_WIDTH;
    let h = PREVIEW_HEIGHT;
    format!(
        "crop=w='if(gte(iw,ih),min(iw,ih*16/9),min(iw,ih*9/16))':\
         h='if(gte(iw,ih),min(ih,iw*9/16),min(ih,iw*16/9))',\
         scale={w}:{h}:force_original_aspect_ratio=decrease,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1"
    )
}

pub(crate) fn frame_args(input: &Path, timestamp: f64, output: &Path) -> Vec<OsString> {
    let mut args = os(&["-y", "-v", "error", "-ss"]);
    args.push(format!("{timestamp:.3}").into());
    args.push("-i".into());
    args.push(input.into());
    args.extend(os(&["-frames:v", "1", "-q:v", "3", "-vf"]));
    args.push(frame_filter().into());
    args.push(output.into());
    args
}

fn frame_input_args(frame_dir: &Path) -> Vec<OsString> {
    let mut args = os(&["-framerate"]);
    args.push(PREVIEW_FPS.to_string().into());
    args.extend(os(&["-start_number", "1", "-i"]));
    args.push(frame_dir.join(FRAME_PATTERN).into());
    args
}

pub(crate) fn palette_args(frame_dir: &Path) -> Vec<OsString> {
    let mut args = os(&["-y", "-v", "error"]);
    args.extend(frame_input_args(frame_dir));
    args.extend(os(&["-vf", "palettegen=stats_mode=diff"]));
    args.push(frame_dir.join(PALETTE_FILE).into());
    args
}

pub(crate) fn paletteuse_args(frame_dir: &Path, output: &Path) -> Vec<OsString> {
    let mut args = os(&["-y", "-v", "error"]);
    args.extend(frame_input_args(frame_dir));
    args.push("-i".into());
    args.push(frame_dir.join(PALETTE_FILE).into());
    args.extend(os(&[
        "-lavfi",
        "paletteuse=dither=bayer:bayer_scale=5",
        "-loop",
        "0",
    ]));
    args.push(output.into());
    args
}

pub(crate) fn transcode_args(input: &Path, spec: &RenditionSpec, output: &Path) -> Vec<OsString> {
    let (w, h) = (spec.width, spec.height);
    let mut args = os(&["-y", "-v", "error", "-i"]);
    args.push(input.into());
    args.push("-vf".into());
    args.push(
        format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,\
             pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1"
        )
        .into(),
    );
    args.extend(os(&[
        "-c:v",
        "libx264",
        "-preset",
        "veryfast",
        "-crf",
        "23",
        "-c:a",
        "aac",
        "-b:a",
        spec.audio_bitrate,
        "-movflags",
        "+faststart",
    ]));
    args.push(output.into());
    args
}

#[async_trait]
impl MediaTool for FfmpegTool {
    async fn probe_duration(&self, input: &Path) -> Result<f64, MediaError> {
        let stdout = self.run(&self.ffprobe_bin, probe_args(input)).await?;
        parse_duration(&stdout)
    }

    async fn extract_frame(
        &self,
        input: &Path,
        timestamp: f64,
        output: &Path,
    ) -> Result<(), MediaError> {
        self.run(&self.ffmpeg_bin, frame_args(input, timestamp, output))
            .await
            .map(|_| ())
    }

    async fn build_animated_preview(
        &self,
        frame_dir: &Path,
        output: &Path,
    ) -> Result<(), MediaError> {
        self.run(&self.ffmpeg_bin, palette_args(frame_dir)).await?;
        self.run(&self.ffmpeg_bin, paletteuse_args(frame_dir, output))
            .await
            .map(|_| ())
    }

    async fn transcode(
        &self,
        input: &Path,
        spec: &RenditionSpec,
        output: &Path,
    ) -> Result<(), MediaError> {
        self.run(&self.ffmpeg_bin, transcode_args(input, spec, output))
            .await
            .map(|_| ())
    }
}
