// Downloader configuration, resolved once and passed to the orchestrator

use std::path::PathBuf;
use std::time::Duration;

use super::cookies::{discover_cookie_file, CookieJar};

/// Default yt-dlp output template (title + extension, no id suffix)
pub const DEFAULT_OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Netscape cookies.txt passed to the engine
    pub cookie_file: Option<PathBuf>,
    /// Explicit yt-dlp binary; discovered when unset
    pub ytdlp_path: Option<PathBuf>,
    /// Directory or binary for ffmpeg; yt-dlp searches PATH when unset
    pub ffmpeg_location: Option<PathBuf>,
    /// Upper bound for metadata queries. Downloads are never bounded.
    pub metadata_timeout: Option<Duration>,
    pub output_template: String,
    /// Used when a caller does not name a destination
    pub default_destination: PathBuf,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            cookie_file: None,
            ytdlp_path: None,
            ffmpeg_location: None,
            metadata_timeout: None,
            output_template: DEFAULT_OUTPUT_TEMPLATE.to_string(),
            default_destination: dirs::download_dir()
                .unwrap_or_else(|| PathBuf::from("downloads")),
        }
    }
}

impl DownloaderConfig {
    /// Configuration from the environment:
    /// `YTDLP_PATH`, `FFMPEG_LOCATION`, `YTDLP_COOKIES`, `YTDLP_METADATA_TIMEOUT`
    /// (seconds). Without `YTDLP_COOKIES` the usual cookie locations are searched.
    pub fn from_env() -> Self {
        let env_path = |key: &str| {
            std::env::var(key)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
        };

        let cookie_file = env_path("YTDLP_COOKIES").or_else(discover_cookie_file);
        if let Some(path) = &cookie_file {
            match CookieJar::load(path) {
                Ok(jar) if jar.is_empty() => {
                    tracing::warn!("Cookies file {} holds no cookies", path.display())
                }
                Ok(jar) => tracing::debug!("Loaded {} cookies from {}", jar.len(), path.display()),
                Err(e) => tracing::warn!("Cannot read cookies file {}: {}", path.display(), e),
            }
        }

        let metadata_timeout = std::env::var("YTDLP_METADATA_TIMEOUT")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        Self::default()
            .with_cookie_file(cookie_file)
            .with_ytdlp_path(env_path("YTDLP_PATH"))
            .with_ffmpeg_location(env_path("FFMPEG_LOCATION"))
            .with_metadata_timeout(metadata_timeout)
    }

    pub fn with_cookie_file(mut self, path: Option<PathBuf>) -> Self {
        self.cookie_file = path;
        self
    }

    pub fn with_ytdlp_path(mut self, path: Option<PathBuf>) -> Self {
        self.ytdlp_path = path;
        self
    }

    pub fn with_ffmpeg_location(mut self, path: Option<PathBuf>) -> Self {
        self.ffmpeg_location = path;
        self
    }

    pub fn with_metadata_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.metadata_timeout = timeout;
        self
    }

    pub fn with_output_template(mut self, template: impl Into<String>) -> Self {
        self.output_template = template.into();
        self
    }

    pub fn with_default_destination(mut self, dir: impl Into<PathBuf>) -> Self {
        self.default_destination = dir.into();
        self
    }
}
