// Orchestrator: format selection, engine configuration and output lookup

use std::path::{Path, PathBuf};

use super::backends::YtDlpEngine;
use super::config::DownloaderConfig;
use super::errors::DownloadError;
use super::format_selector::{FormatSelector, BEST_FORMAT_ID, MP3_FORMAT_ID};
use super::models::{
    DownloadKind, DownloadRequest, EngineConfig, EngineProgress, ExtractorHint, PostProcessor,
    VideoInfo,
};
use super::progress::ProgressReporter;
use super::traits::{MediaEngine, ProgressObserver};
use super::utils::{format_duration, resolve_url, sanitize_filename};

const AUDIO_FORMAT: &str = "bestaudio/best";
const BEST_FORMAT: &str = "bestvideo+bestaudio/best";
const MP3_QUALITY: &str = "192";
const MERGE_CONTAINER: &str = "mp4";

/// Containers tried after the predicted path for video downloads
const VIDEO_FALLBACK_EXTS: [&str; 4] = ["mp4", "mkv", "webm", "m4a"];

pub struct Downloader {
    engine: Box<dyn MediaEngine>,
    config: DownloaderConfig,
}

impl Downloader {
    pub fn new(engine: Box<dyn MediaEngine>, config: DownloaderConfig) -> Self {
        Self { engine, config }
    }

    /// yt-dlp engine configured from `config`
    pub fn with_config(config: DownloaderConfig) -> Self {
        let engine = YtDlpEngine::from_config(&config);
        Self::new(Box::new(engine), config)
    }

    pub fn from_env() -> Self {
        Self::with_config(DownloaderConfig::from_env())
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    /// Request targeting the configured default destination
    pub fn request(&self, url: &str, format_id: &str, kind: DownloadKind) -> DownloadRequest {
        DownloadRequest::new(url, format_id, kind, &self.config.default_destination)
    }

    pub fn build_engine_config(
        &self,
        url: &str,
        kind: DownloadKind,
        format_id: &str,
        destination: &Path,
    ) -> EngineConfig {
        let (format, postprocessor, merge_output_format) =
            if kind == DownloadKind::Audio || format_id == MP3_FORMAT_ID {
                let mp3 = PostProcessor::ExtractAudio {
                    codec: "mp3".to_string(),
                    quality: MP3_QUALITY.to_string(),
                };
                (AUDIO_FORMAT.to_string(), Some(mp3), None)
            } else {
                let format = match format_id {
                    BEST_FORMAT_ID => BEST_FORMAT.to_string(),
                    other => other.to_string(),
                };
                (format, None, Some(MERGE_CONTAINER.to_string()))
            };

        EngineConfig {
            format,
            postprocessor,
            merge_output_format,
            output_dir: destination.to_path_buf(),
            output_template: self.config.output_template.clone(),
            cookie_file: self.config.cookie_file.clone(),
            ffmpeg_location: self.config.ffmpeg_location.clone(),
            extractor_hint: extractor_hint(url),
        }
    }

    /// Metadata and catalog for a URL; any failure yields `None`
    pub async fn get_video_info(&self, url: &str) -> Option<VideoInfo> {
        let url = resolve_url(url);
        let config = self.build_engine_config(
            &url,
            DownloadKind::Video,
            BEST_FORMAT_ID,
            &self.config.default_destination,
        );

        let metadata = match self.engine.fetch_metadata(&url, &config).await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!("[Downloader] {} could not fetch {}: {}", self.engine.name(), url, e);
                return None;
            }
        };

        let formats = FormatSelector::build_catalog(&metadata.formats);
        tracing::info!(
            "[Downloader] {} raw formats -> {} options for {}",
            metadata.formats.len(),
            formats.len(),
            url
        );

        let webpage_url = if metadata.webpage_url.is_empty() {
            url
        } else {
            metadata.webpage_url
        };

        Some(VideoInfo {
            title: sanitize_filename(&metadata.title),
            thumbnail: metadata.thumbnail,
            duration: format_duration(metadata.duration_seconds),
            uploader: metadata.uploader,
            webpage_url,
            formats,
        })
    }

    /// Download one media file and return its path on disk
    pub async fn download(
        &self,
        request: &DownloadRequest,
        observer: Option<&dyn ProgressObserver>,
    ) -> Result<PathBuf, DownloadError> {
        let url = resolve_url(&request.url);
        let reporter = ProgressReporter::new(observer);

        if let Err(e) = tokio::fs::create_dir_all(&request.destination).await {
            let cause = format!(
                "cannot create destination {}: {}",
                request.destination.display(),
                e
            );
            tracing::error!("[Downloader] download of {} failed: {}", url, cause);
            reporter.report_error(&cause);
            return Err(DownloadError::Io(e));
        }

        let config =
            self.build_engine_config(&url, request.kind, &request.format_id, &request.destination);
        tracing::info!(
            "[Downloader] {} {} with format {}",
            self.engine.name(),
            url,
            config.format
        );

        let on_progress = |raw: EngineProgress| reporter.on_engine_event(&raw);

        let predicted = match self.engine.perform_download(&url, &config, &on_progress).await {
            Ok(path) => path,
            Err(e) => {
                let cause = match e {
                    DownloadError::ExtractionFailed(msg) => msg,
                    other => other.to_string(),
                };
                tracing::error!("[Downloader] download of {} failed: {}", url, cause);
                reporter.report_error(&cause);
                return Err(DownloadError::ExtractionFailed(cause));
            }
        };

        let path = resolve_output_path(&predicted, request.wants_mp3())?;
        tracing::info!("[Downloader] saved {}", path.display());
        Ok(path)
    }
}

/// Platform hints by substring match on the URL
fn extractor_hint(url: &str) -> Option<ExtractorHint> {
    if url.contains("facebook.com") || url.contains("fb.com") {
        Some(ExtractorHint::Facebook)
    } else if url.contains("instagram.com") {
        Some(ExtractorHint::Instagram)
    } else if url.contains("youtube.com") || url.contains("youtu.be") {
        Some(ExtractorHint::YouTube {
            player_client: vec!["android".to_string(), "web".to_string()],
            player_skip: vec!["configs".to_string(), "webpage".to_string()],
        })
    } else {
        None
    }
}

/// First existing file among the predicted path and its siblings.
/// MP3 conversion changes the extension, so audio checks `.mp3` first.
fn resolve_output_path(predicted: &Path, wants_mp3: bool) -> Result<PathBuf, DownloadError> {
    let candidates: Vec<PathBuf> = if wants_mp3 {
        vec![predicted.with_extension("mp3"), predicted.to_path_buf()]
    } else {
        std::iter::once(predicted.to_path_buf())
            .chain(VIDEO_FALLBACK_EXTS.iter().map(|ext| predicted.with_extension(ext)))
            .collect()
    };

    candidates
        .into_iter()
        .find(|path| path.is_file())
        .ok_or_else(|| DownloadError::FileNotFound(predicted.to_path_buf()))
}
