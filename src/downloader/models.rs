// Common data models for the catalog builder and orchestrator

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::errors::DownloadError;

/// A single elementary stream as reported by the extraction engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Format ID (e.g., "137", "140"). Missing only in malformed input.
    pub format_id: Option<String>,
    /// File extension (mp4, webm, m4a)
    pub ext: Option<String>,
    /// Video height in pixels
    pub height: Option<u32>,
    /// Audio bitrate in kbps
    pub abr: Option<f64>,
    /// Video codec (avc1, vp9, av01, none)
    pub vcodec: Option<String>,
    /// Audio codec (mp4a, opus, none)
    pub acodec: Option<String>,
    /// File size in bytes
    pub filesize: Option<u64>,
    /// Approximate file size (when exact is unknown)
    pub filesize_approx: Option<u64>,
    /// Format note (e.g., "1080p", "medium")
    pub format_note: Option<String>,
}

impl StreamDescriptor {
    /// Build a descriptor from one entry of the engine's `formats` array.
    /// Every field is optional here; the id is checked by [`Self::id`].
    pub fn from_json(f: &serde_json::Value) -> Self {
        Self {
            format_id: f["format_id"].as_str().map(|s| s.to_string()),
            ext: f["ext"].as_str().map(|s| s.to_string()),
            height: f["height"].as_u64().and_then(|h| u32::try_from(h).ok()),
            abr: f["abr"].as_f64(),
            vcodec: f["vcodec"].as_str().map(|s| s.to_string()),
            acodec: f["acodec"].as_str().map(|s| s.to_string()),
            filesize: f["filesize"].as_u64(),
            filesize_approx: f["filesize_approx"]
                .as_u64()
                .or_else(|| f["filesize_approx"].as_f64().map(|s| s as u64)),
            format_note: f["format_note"]
                .as_str()
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string()),
        }
    }

    pub fn id(&self) -> Result<&str, DownloadError> {
        self.format_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                DownloadError::InvalidDescriptor(format!(
                    "missing format_id (ext={:?}, height={:?})",
                    self.ext, self.height
                ))
            })
    }

    pub fn has_video(&self) -> bool {
        codec_present(self.vcodec.as_deref())
    }

    pub fn has_audio(&self) -> bool {
        codec_present(self.acodec.as_deref())
    }

    /// Video stream without an audio track
    pub fn is_video_only(&self) -> bool {
        self.has_video() && !self.has_audio()
    }

    /// Get effective file size (exact or approximate)
    pub fn effective_size(&self) -> Option<u64> {
        self.filesize.or(self.filesize_approx)
    }

    pub fn media_kind(&self) -> MediaKind {
        match (self.has_video(), self.has_audio()) {
            (true, true) => MediaKind::VideoAudio,
            (true, false) => MediaKind::Video,
            (false, true) => MediaKind::Audio,
            (false, false) => MediaKind::Unknown,
        }
    }
}

fn codec_present(codec: Option<&str>) -> bool {
    codec.map_or(false, |c| !c.is_empty() && c != "none")
}

/// What a download option carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    #[serde(rename = "audio")]
    Audio,
    #[serde(rename = "video")]
    Video,
    #[serde(rename = "video+audio")]
    VideoAudio,
    #[serde(rename = "unknown")]
    Unknown,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio => write!(f, "audio"),
            Self::Video => write!(f, "video"),
            Self::VideoAudio => write!(f, "video+audio"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// User-facing catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadOption {
    /// Engine format expression ("137", "137+bestaudio", "mp3", "best", ...)
    pub format_id: String,
    pub ext: String,
    /// Display label (e.g., "1080P", "2160p (4K) (+AUDIO)")
    pub resolution: String,
    pub filesize: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    /// Ordering key only, not a real bitrate or resolution
    pub quality: u32,
}

impl DownloadOption {
    /// Deduplication key
    pub fn key(&self) -> (&str, MediaKind, u32) {
        (self.resolution.as_str(), self.kind, self.quality)
    }
}

/// Raw top-level metadata returned by the engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    pub uploader: String,
    pub duration_seconds: u64,
    pub thumbnail: String,
    pub webpage_url: String,
    pub formats: Vec<StreamDescriptor>,
}

/// Video information offered to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    pub title: String,
    pub thumbnail: String,
    pub duration: String,
    pub uploader: String,
    pub webpage_url: String,
    pub formats: Vec<DownloadOption>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadKind {
    Audio,
    Video,
}

/// One download invocation
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub format_id: String,
    pub kind: DownloadKind,
    pub destination: PathBuf,
}

impl DownloadRequest {
    pub fn new(
        url: impl Into<String>,
        format_id: impl Into<String>,
        kind: DownloadKind,
        destination: impl Into<PathBuf>,
    ) -> Self {
        Self {
            url: url.into(),
            format_id: format_id.into(),
            kind,
            destination: destination.into(),
        }
    }

    /// Audio requests and the "mp3" sentinel both go through MP3 extraction
    pub fn wants_mp3(&self) -> bool {
        self.kind == DownloadKind::Audio || self.format_id == "mp3"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Downloading,
    Completed,
    Error,
}

/// Normalized progress record delivered to observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub status: ProgressStatus,
    pub percent: f64,
    pub speed: String,
    pub eta: String,
    pub filesize: String,
    pub filename: String,
    pub message: String,
}

/// Raw progress payload as the engine reports it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineProgress {
    /// "downloading", "finished", "error", ...
    pub status: String,
    pub downloaded_bytes: Option<u64>,
    pub total_bytes: Option<u64>,
    pub total_bytes_estimate: Option<u64>,
    /// Bytes per second
    pub speed: Option<f64>,
    /// Seconds
    pub eta: Option<u64>,
    pub filename: Option<String>,
}

/// Post-processing step requested from the transcoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostProcessor {
    /// Extract audio and convert it
    ExtractAudio { codec: String, quality: String },
}

/// Per-platform extraction hints
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractorHint {
    /// Preferred player clients and skipped player requests
    YouTube {
        player_client: Vec<String>,
        player_skip: Vec<String>,
    },
    /// Do not send stored credentials
    Facebook,
    /// Match posts by shortcode
    Instagram,
}

/// Everything the engine needs to perform one download
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Engine format expression
    pub format: String,
    pub postprocessor: Option<PostProcessor>,
    /// Container for merged video+audio
    pub merge_output_format: Option<String>,
    pub output_dir: PathBuf,
    pub output_template: String,
    pub cookie_file: Option<PathBuf>,
    pub ffmpeg_location: Option<PathBuf>,
    pub extractor_hint: Option<ExtractorHint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_presence() {
        let f = StreamDescriptor {
            format_id: Some("137".into()),
            vcodec: Some("avc1.640028".into()),
            acodec: Some("none".into()),
            ..Default::default()
        };
        assert!(f.is_video_only());
        assert_eq!(f.media_kind(), MediaKind::Video);

        let missing = StreamDescriptor {
            format_id: Some("x".into()),
            ..Default::default()
        };
        assert_eq!(missing.media_kind(), MediaKind::Unknown);
    }

    #[test]
    fn test_missing_id_is_invalid() {
        let f = StreamDescriptor::default();
        assert!(matches!(f.id(), Err(DownloadError::InvalidDescriptor(_))));
    }

    #[test]
    fn test_from_json_tolerates_missing_fields() {
        let json = serde_json::json!({
            "format_id": "251",
            "ext": "webm",
            "vcodec": "none",
            "acodec": "opus",
            "abr": 129.5,
            "filesize": null,
            "filesize_approx": 4030312.0
        });
        let f = StreamDescriptor::from_json(&json);
        assert_eq!(f.id().unwrap(), "251");
        assert_eq!(f.height, None);
        assert_eq!(f.effective_size(), Some(4_030_312));
        assert_eq!(f.media_kind(), MediaKind::Audio);
    }

    #[test]
    fn test_out_of_range_height_is_absent() {
        let json = serde_json::json!({
            "format_id": "x",
            "height": 8_589_934_592u64,
            "vcodec": "vp9"
        });
        assert_eq!(StreamDescriptor::from_json(&json).height, None);
    }

    #[test]
    fn test_mp3_sentinel_routes_to_audio() {
        let req = DownloadRequest::new("u", "mp3", DownloadKind::Video, "/tmp");
        assert!(req.wants_mp3());
        let req = DownloadRequest::new("u", "137", DownloadKind::Video, "/tmp");
        assert!(!req.wants_mp3());
    }

    #[test]
    fn test_media_kind_serializes_like_engine_labels() {
        let s = serde_json::to_string(&MediaKind::VideoAudio).unwrap();
        assert_eq!(s, "\"video+audio\"");
    }
}
