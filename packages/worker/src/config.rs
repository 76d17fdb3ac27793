use std::path::PathBuf;

use serde::Deserialize;

/// Media derivation configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct MediaConfig {
    /// ffmpeg executable path. Default: "ffmpeg".
    #[serde(default = "default_ffmpeg_bin")]
    pub ffmpeg_bin: String,
    /// ffprobe executable path. Default: "ffprobe".
    #[serde(default = "default_ffprobe_bin")]
    pub ffprobe_bin: String,
    /// Parent directory for per-task scratch space. Default: the system temp dir.
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
    /// Derivation tasks allowed to run at once. Default: 2.
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
    /// Jobs buffered before new ones are dropped. Default: 256.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_ffmpeg_bin() -> String {
    "ffmpeg".into()
}
fn default_ffprobe_bin() -> String {
    "ffprobe".into()
}
fn default_max_concurrent_jobs() -> usize {
    2
}
fn default_queue_capacity() -> usize {
    256
}

impl MediaConfig {
    pub fn work_root(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_bin: default_ffmpeg_bin(),
            ffprobe_bin: default_ffprobe_bin(),
            work_dir: None,
            max_concurrent_jobs: default_max_concurrent_jobs(),
            queue_capacity: default_queue_capacity(),
        }
    }
}
