// yt-dlp backend - metadata and downloads through the yt-dlp binary

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use crate::downloader::config::DownloaderConfig;
use crate::downloader::diagnostics::{diagnose_error, error_summary, BlockingReason};
use crate::downloader::errors::DownloadError;
use crate::downloader::models::{
    EngineConfig, EngineProgress, ExtractorHint, PostProcessor, StreamDescriptor, VideoMetadata,
};
use crate::downloader::tools::{ToolManager, ToolType};
use crate::downloader::traits::{EngineProgressFn, MediaEngine};
use crate::downloader::utils;

const PROGRESS_PREFIX: &str = "[progress]";
const PREDICTED_PREFIX: &str = "[predicted]";
const FINAL_PREFIX: &str = "[final]";

/// Raw progress fields, `;`-separated; the filename goes last since it may contain `;`
const PROGRESS_TEMPLATE: &str = "download:[progress]%(progress.status)s;\
%(progress.downloaded_bytes)s;%(progress.total_bytes)s;\
%(progress.total_bytes_estimate)s;%(progress.speed)s;%(progress.eta)s;\
%(progress.filename)s";

/// One recognized line of engine stdout
#[derive(Debug, Clone, PartialEq)]
enum EngineLine {
    Progress(EngineProgress),
    /// Filename chosen before the download starts
    Predicted(PathBuf),
    /// Path after merging, conversion and moving
    Final(PathBuf),
}

/// yt-dlp driven as a subprocess
pub struct YtDlpEngine {
    binary: PathBuf,
    metadata_timeout: Option<Duration>,
}

impl YtDlpEngine {
    pub fn new() -> Self {
        Self {
            binary: ToolManager::new().resolve(ToolType::YtDlp),
            metadata_timeout: None,
        }
    }

    pub fn from_config(config: &DownloaderConfig) -> Self {
        let tools = ToolManager::new();
        let binary = match &config.ytdlp_path {
            Some(path) => path.clone(),
            None => {
                let info = tools.get_tool_info(ToolType::YtDlp);
                match (&info.path, &info.version) {
                    (Some(path), Some(version)) => {
                        tracing::info!("Found yt-dlp {} at {}", version, path.display())
                    }
                    _ => tracing::warn!("yt-dlp not detected, relying on PATH lookup"),
                }
                info.path
                    .unwrap_or_else(|| PathBuf::from(ToolType::YtDlp.as_str()))
            }
        };
        tracing::debug!("Using yt-dlp binary: {}", binary.display());

        // Merging and MP3 conversion need ffmpeg
        if config.ffmpeg_location.is_none() && !tools.get_tool_info(ToolType::Ffmpeg).is_available {
            tracing::warn!("ffmpeg not detected; merged formats and MP3 extraction will fail");
        }

        Self {
            binary,
            metadata_timeout: config.metadata_timeout,
        }
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_metadata_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.metadata_timeout = timeout;
        self
    }

    fn metadata_args(url: &str, config: &EngineConfig) -> Vec<String> {
        let mut args = vec![
            "--dump-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
        ];
        push_common_args(&mut args, config);
        args.push(url.to_string());
        args
    }

    fn download_args(url: &str, config: &EngineConfig) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            config.format.clone(),
            "--no-playlist".to_string(),
            "--newline".to_string(),
            // --print implies --quiet; keep the progress lines anyway
            "--progress".to_string(),
            "--progress-template".to_string(),
            PROGRESS_TEMPLATE.to_string(),
            "--no-simulate".to_string(),
            "--print".to_string(),
            format!("before_dl:{}%(filename)s", PREDICTED_PREFIX),
            "--print".to_string(),
            format!("after_move:{}%(filepath)s", FINAL_PREFIX),
            "-P".to_string(),
            config.output_dir.to_string_lossy().to_string(),
            "-o".to_string(),
            config.output_template.clone(),
        ];

        if let Some(ffmpeg) = &config.ffmpeg_location {
            args.push("--ffmpeg-location".to_string());
            args.push(ffmpeg.to_string_lossy().to_string());
        }

        if let Some(PostProcessor::ExtractAudio { codec, quality }) = &config.postprocessor {
            args.extend([
                "-x".to_string(),
                "--audio-format".to_string(),
                codec.clone(),
                "--audio-quality".to_string(),
                format!("{}K", quality),
            ]);
        }

        if let Some(container) = &config.merge_output_format {
            args.push("--merge-output-format".to_string());
            args.push(container.clone());
        }

        push_common_args(&mut args, config);
        args.push(url.to_string());
        args
    }

    /// Turn engine stderr into an error carrying a diagnosis
    fn failure(stderr: &str, config: &EngineConfig) -> DownloadError {
        let summary = error_summary(stderr);
        let message = match diagnose_error(stderr) {
            Some(BlockingReason::Unknown) | None => summary,
            Some(reason) => {
                let mut message = format!("{}: {}", reason.description(), summary);
                if reason.cookies_might_help() && config.cookie_file.is_none() {
                    message.push_str(" (a cookies file may help)");
                }
                message
            }
        };
        message.into()
    }
}

impl Default for YtDlpEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Cookie file and per-platform extractor arguments
fn push_common_args(args: &mut Vec<String>, config: &EngineConfig) {
    if let Some(cookies) = &config.cookie_file {
        args.push("--cookies".to_string());
        args.push(cookies.to_string_lossy().to_string());
    }

    if let Some(hint) = &config.extractor_hint {
        args.push("--extractor-args".to_string());
        args.push(extractor_args(hint));
    }
}

fn extractor_args(hint: &ExtractorHint) -> String {
    match hint {
        ExtractorHint::YouTube {
            player_client,
            player_skip,
        } => format!(
            "youtube:player_client={};player_skip={}",
            player_client.join(","),
            player_skip.join(",")
        ),
        ExtractorHint::Facebook => "facebook:credentials=none".to_string(),
        ExtractorHint::Instagram => "instagram:shortcode_match=true".to_string(),
    }
}

fn spawn_error(binary: &Path, e: std::io::Error) -> DownloadError {
    if e.kind() == std::io::ErrorKind::NotFound {
        DownloadError::ToolNotFound(format!("{}: {}", binary.display(), e))
    } else {
        DownloadError::Io(e)
    }
}

fn parse_metadata(stdout: &[u8]) -> Result<VideoMetadata, DownloadError> {
    let json_str = String::from_utf8_lossy(stdout);
    let json: serde_json::Value = serde_json::from_str(&json_str)
        .map_err(|e| DownloadError::ParseError(format!("Failed to parse JSON: {}", e)))?;

    let text = |key: &str, fallback: &str| json[key].as_str().unwrap_or(fallback).to_string();

    let formats = json["formats"]
        .as_array()
        .map(|list| list.iter().map(StreamDescriptor::from_json).collect())
        .unwrap_or_default();

    Ok(VideoMetadata {
        id: text("id", ""),
        title: text("title", "Unknown"),
        uploader: text("uploader", "Unknown"),
        duration_seconds: json["duration"].as_f64().unwrap_or(0.0) as u64,
        thumbnail: text("thumbnail", ""),
        webpage_url: text("webpage_url", ""),
        formats,
    })
}

/// Template fields render missing values as "NA"
fn field(raw: &str) -> Option<&str> {
    let raw = raw.trim();
    (!raw.is_empty() && raw != "NA" && raw != "None").then_some(raw)
}

fn number(raw: &str) -> Option<f64> {
    field(raw).and_then(|v| v.parse::<f64>().ok())
}

fn parse_line(line: &str) -> Option<EngineLine> {
    let line = line.trim_end();

    if let Some(rest) = line.strip_prefix(PROGRESS_PREFIX) {
        let parts: Vec<&str> = rest.splitn(7, ';').collect();
        if parts.len() != 7 {
            return None;
        }
        return Some(EngineLine::Progress(EngineProgress {
            status: parts[0].trim().to_string(),
            downloaded_bytes: number(parts[1]).map(|v| v as u64),
            total_bytes: number(parts[2]).map(|v| v as u64),
            total_bytes_estimate: number(parts[3]).map(|v| v as u64),
            speed: number(parts[4]),
            eta: number(parts[5]).map(|v| v as u64),
            filename: field(parts[6]).map(|s| s.to_string()),
        }));
    }

    if let Some(rest) = line.strip_prefix(PREDICTED_PREFIX) {
        return field(rest).map(|p| EngineLine::Predicted(PathBuf::from(p)));
    }

    line.strip_prefix(FINAL_PREFIX)
        .and_then(field)
        .map(|p| EngineLine::Final(PathBuf::from(p)))
}

#[async_trait]
impl MediaEngine for YtDlpEngine {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn fetch_metadata(
        &self,
        url: &str,
        config: &EngineConfig,
    ) -> Result<VideoMetadata, DownloadError> {
        let args = Self::metadata_args(url, config);
        tracing::debug!("Fetching metadata: {} {}", self.binary.display(), args.join(" "));

        let output = utils::run_output(&self.binary, &args, self.metadata_timeout).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Self::failure(&stderr, config));
        }

        parse_metadata(&output.stdout)
    }

    async fn perform_download(
        &self,
        url: &str,
        config: &EngineConfig,
        on_progress: &EngineProgressFn<'_>,
    ) -> Result<PathBuf, DownloadError> {
        let args = Self::download_args(url, config);
        tracing::info!(
            "Starting yt-dlp download: format={}, dir={}",
            config.format,
            config.output_dir.display()
        );

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(&self.binary, e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DownloadError::ExtractionFailed("Failed to capture stdout".into()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| DownloadError::ExtractionFailed("Failed to capture stderr".into()))?;

        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            String::from_utf8_lossy(&buf).into_owned()
        });

        let mut predicted = None;
        let mut final_path = None;
        let mut saw_finished = false;

        // Titles are not always valid UTF-8; decode each line lossily
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            match parse_line(&line) {
                Some(EngineLine::Progress(progress)) => {
                    saw_finished |= progress.status == "finished";
                    on_progress(progress);
                }
                Some(EngineLine::Predicted(path)) => {
                    tracing::debug!("Predicted output: {}", path.display());
                    predicted = Some(path);
                }
                Some(EngineLine::Final(path)) => final_path = Some(path),
                None => tracing::trace!("[yt-dlp] {}", line.trim_end()),
            }
        }

        let status = child.wait().await?;
        let stderr_output = stderr_task.await.unwrap_or_default();

        if !status.success() {
            tracing::debug!("yt-dlp exited with {}: {}", status, stderr_output.trim());
            return Err(Self::failure(&stderr_output, config));
        }

        let path = final_path.or(predicted).ok_or_else(|| {
            DownloadError::ParseError("yt-dlp did not report an output filename".into())
        })?;

        if !saw_finished {
            on_progress(EngineProgress {
                status: "finished".to_string(),
                filename: Some(path.to_string_lossy().to_string()),
                ..Default::default()
            });
        }

        Ok(path)
    }
}
