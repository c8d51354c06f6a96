// Media engine and progress observer seams

use std::path::PathBuf;

use async_trait::async_trait;

use super::errors::DownloadError;
use super::models::{EngineConfig, EngineProgress, ProgressEvent, VideoMetadata};

/// Callback the engine invokes for every raw progress record
pub type EngineProgressFn<'a> = dyn Fn(EngineProgress) + Send + Sync + 'a;

/// Trait for extraction engine implementations
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Name of the engine (for logging)
    fn name(&self) -> &'static str;

    /// Fetch top-level metadata and the raw stream list for a URL.
    /// Only the cookie file and extractor hint of `config` apply.
    async fn fetch_metadata(
        &self,
        url: &str,
        config: &EngineConfig,
    ) -> Result<VideoMetadata, DownloadError>;

    /// Download one media file, reporting progress in order.
    /// Returns the path the engine predicted for the output file.
    async fn perform_download(
        &self,
        url: &str,
        config: &EngineConfig,
        on_progress: &EngineProgressFn<'_>,
    ) -> Result<PathBuf, DownloadError>;
}

/// Receives normalized progress events during a download
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, event: ProgressEvent);
}

impl<F> ProgressObserver for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: ProgressEvent) {
        self(event)
    }
}
