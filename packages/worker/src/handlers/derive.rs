use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use common::blob_keys::{DerivedKeys, content_type_for};
use common::storage::{BlobStore, BoxReader};
use tempfile::TempDir;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, instrument, warn};

use crate::error::{DerivationError, Result};
use crate::media::{
    FALLBACK_DURATION_SECS, MediaTool, RENDITION_480P, RENDITION_720P, frame_file_name,
    sample_timestamps,
};

/// Request to derive previews and renditions for one uploaded video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationJob {
    pub video_id: i32,
    pub original_key: String,
}

/// Result of writing derived keys back to the video row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkOutcome {
    Updated,
    /// The video was deleted while the task ran.
    RowMissing,
}

/// Where derived keys are recorded once their blobs are stored.
#[async_trait]
pub trait DerivationSink: Send + Sync {
    /// Record both thumbnail forms in one update.
    async fn record_thumbnails(
        &self,
        video_id: i32,
        animated_key: &str,
        static_key: &str,
    ) -> Result<SinkOutcome>;

    /// Record both rendition keys in one update.
    async fn record_renditions(
        &self,
        video_id: i32,
        key_720p: &str,
        key_480p: &str,
    ) -> Result<SinkOutcome>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// Blobs stored and keys written to the row.
    Recorded,
    /// Blobs stored, but the row was gone; the blobs were removed again.
    Discarded,
    /// Nothing was recorded.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationReport {
    pub thumbnail: StageOutcome,
    pub renditions: StageOutcome,
}

/// Private scratch space for one task. Removed from disk on drop.
struct Scratch {
    dir: TempDir,
    original: PathBuf,
}

/// Runs derivation tasks: preview stills, an animated preview and two
/// renditions per video, stored next to the original in the blob store.
pub struct Deriver {
    store: Arc<dyn BlobStore>,
    tool: Arc<dyn MediaTool>,
    sink: Arc<dyn DerivationSink>,
    work_root: PathBuf,
}

impl Deriver {
    pub fn new(
        store: Arc<dyn BlobStore>,
        tool: Arc<dyn MediaTool>,
        sink: Arc<dyn DerivationSink>,
        work_root: PathBuf,
    ) -> Self {
        Self {
            store,
            tool,
            sink,
            work_root,
        }
    }

    /// Run every stage for `job`. Failures are logged and reported, never
    /// propagated, and the scratch directory is always removed.
    #[instrument(skip(self, job), fields(video_id = job.video_id, original_key = %job.original_key))]
    pub async fn run(&self, job: &DerivationJob) -> DerivationReport {
        let scratch = match self.stage_original(&job.original_key).await {
            Ok(scratch) => scratch,
            Err(e) => {
                error!(error = %e, "Failed to fetch original for derivation");
                let reason = e.to_string();
                return DerivationReport {
                    thumbnail: StageOutcome::Failed(reason.clone()),
                    renditions: StageOutcome::Failed(reason),
                };
            }
        };
        let keys = DerivedKeys::for_original(&job.original_key);

        let thumbnail = self
            .thumbnail_stage(job.video_id, &scratch, &keys)
            .await;
        let thumbnail = self.settle("thumbnail", thumbnail, &keys.thumbnails()).await;

        let renditions = self
            .rendition_stage(job.video_id, &scratch, &keys)
            .await;
        let renditions = self.settle("renditions", renditions, &keys.renditions()).await;

        drop(scratch);
        DerivationReport {
            thumbnail,
            renditions,
        }
    }

    async fn stage_original(&self, original_key: &str) -> Result<Scratch> {
        fs::create_dir_all(&self.work_root).await?;
        let dir = tempfile::Builder::new()
            .prefix("derive-")
            .tempdir_in(&self.work_root)?;
        let original = dir.path().join("original");

        let mut reader = self.store.get_stream(original_key).await?;
        let mut file = fs::File::create(&original).await?;
        tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;

        Ok(Scratch { dir, original })
    }

    async fn thumbnail_stage(
        &self,
        video_id: i32,
        scratch: &Scratch,
        keys: &DerivedKeys,
    ) -> Result<SinkOutcome> {
        let duration = match self.tool.probe_duration(&scratch.original).await {
            Ok(duration) => duration,
            Err(e) => {
                warn!(error = %e, fallback = FALLBACK_DURATION_SECS, "Duration probe failed");
                FALLBACK_DURATION_SECS
            }
        };

        let frame_dir = scratch.dir.path().join("frames");
        fs::create_dir_all(&frame_dir).await?;

        // Stills are numbered contiguously so the preview input pattern has no gaps.
        let mut frames = Vec::new();
        for timestamp in sample_timestamps(duration) {
            let path = frame_dir.join(frame_file_name(frames.len()));
            match self
                .tool
                .extract_frame(&scratch.original, timestamp, &path)
                .await
            {
                Ok(()) => frames.push(path),
                Err(e) => {
                    warn!(timestamp, error = %e, "Skipping preview still");
                    // Only complete stills may remain in the frame directory.
                    if let Err(e) = fs::remove_file(&path).await
                        && e.kind() != std::io::ErrorKind::NotFound
                    {
                        warn!(path = %path.display(), error = %e, "Failed to remove partial still");
                    }
                }
            }
        }
        let first_frame = frames.first().ok_or(DerivationError::NoFrames)?;

        let preview = scratch.dir.path().join("preview.gif");
        self.tool
            .build_animated_preview(&frame_dir, &preview)
            .await?;

        self.upload(&preview, &keys.animated_thumbnail).await?;
        if let Err(e) = self.upload(first_frame, &keys.static_thumbnail).await {
            self.discard(&[&keys.animated_thumbnail]).await;
            return Err(e);
        }

        self.sink
            .record_thumbnails(video_id, &keys.animated_thumbnail, &keys.static_thumbnail)
            .await
    }

    async fn rendition_stage(
        &self,
        video_id: i32,
        scratch: &Scratch,
        keys: &DerivedKeys,
    ) -> Result<SinkOutcome> {
        let out_720p = scratch.dir.path().join("rendition_720p.mp4");
        let out_480p = scratch.dir.path().join("rendition_480p.mp4");

        self.tool
            .transcode(&scratch.original, &RENDITION_720P, &out_720p)
            .await?;
        self.tool
            .transcode(&scratch.original, &RENDITION_480P, &out_480p)
            .await?;

        self.upload(&out_720p, &keys.rendition_720p).await?;
        if let Err(e) = self.upload(&out_480p, &keys.rendition_480p).await {
            self.discard(&[&keys.rendition_720p]).await;
            return Err(e);
        }

        self.sink
            .record_renditions(video_id, &keys.rendition_720p, &keys.rendition_480p)
            .await
    }

    async fn upload(&self, path: &Path, key: &str) -> Result<u64> {
        let file = fs::File::open(path).await?;
        let reader: BoxReader = Box::new(file);
        let size = self
            .store
            .put_stream(key, reader, &content_type_for(key))
            .await?;
        Ok(size)
    }

    /// Best-effort removal of blobs nothing will reference.
    async fn discard(&self, keys: &[&str]) {
        for key in keys {
            if let Err(e) = self.store.delete(key).await {
                warn!(key, error = %e, "Failed to remove unreferenced derived blob");
            }
        }
    }

    async fn settle(
        &self,
        stage: &str,
        result: Result<SinkOutcome>,
        uploaded: &[&str],
    ) -> StageOutcome {
        match result {
            Ok(SinkOutcome::Updated) => {
                info!(stage, "Derived media recorded");
                StageOutcome::Recorded
            }
            Ok(SinkOutcome::RowMissing) => {
                warn!(stage, "Video deleted during derivation, discarding output");
                self.discard(uploaded).await;
                StageOutcome::Discarded
            }
            Err(e) => {
                error!(stage, error = %e, "Derivation stage failed");
                StageOutcome::Failed(e.to_string())
            }
        }
    }
}
