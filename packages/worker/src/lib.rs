pub mod config;
pub mod error;
pub mod handlers;
pub mod media;

pub use config::MediaConfig;
pub use error::{DerivationError, Result};
pub use handlers::derive::{
    DerivationJob, DerivationReport, DerivationSink, Deriver, SinkOutcome, StageOutcome,
};
pub use media::{MediaTool, ffmpeg::FfmpegTool};
