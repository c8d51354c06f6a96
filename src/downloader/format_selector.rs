// FormatSelector - turns raw engine formats into a download catalog
//
// Handles:
// - Fixed MP3 entry and engine-native auto-selection sentinels
// - Resolution labels with 4K/2K annotation
// - Quality scores (ordering only)
// - Synthetic video+bestaudio pairs for video-only streams
// - Deduplication and best-first ordering

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use super::errors::DownloadError;
use super::models::{DownloadOption, MediaKind, StreamDescriptor};
use super::utils::format_size;

pub const MP3_FORMAT_ID: &str = "mp3";
pub const MP3_LABEL: &str = "MP3 Audio (192kbps)";
pub const BEST_FORMAT_ID: &str = "best";
pub const COMBINED_SUFFIX: &str = "+bestaudio";
pub const ULTRA_FORMAT_ID: &str = "bestvideo[height>=2160]+bestaudio";

const STORYBOARD_PREFIX: &str = "sb";
const MIN_AUDIO_BITRATE: f64 = 50.0;
const MIN_COMBINED_HEIGHT: u32 = 360;
const COMBINED_BONUS: u32 = 1000;

lazy_static! {
    static ref LEADING_HEIGHT_RE: Regex = Regex::new(r"^(\d+)P").unwrap();
}

/// Format selector with best-first ordering
pub struct FormatSelector;

impl FormatSelector {
    /// Build the ordered, deduplicated catalog for one video
    pub fn build_catalog(formats: &[StreamDescriptor]) -> Vec<DownloadOption> {
        let mut options = vec![DownloadOption {
            format_id: MP3_FORMAT_ID.to_string(),
            ext: "mp3".to_string(),
            resolution: MP3_LABEL.to_string(),
            filesize: "Unknown".to_string(),
            kind: MediaKind::Audio,
            quality: 1,
        }];

        for f in formats {
            match Self::option_for(f) {
                Ok(Some(option)) => options.push(option),
                Ok(None) => {}
                Err(e) => tracing::debug!("[FormatSelector] skipping descriptor: {}", e),
            }
        }

        options.extend(Self::combined_options(formats));
        options.extend(Self::auto_options());

        let mut catalog = Self::deduplicate(options);
        // sort_by is stable: equal scores keep construction order
        catalog.sort_by(|a, b| b.quality.cmp(&a.quality));
        catalog
    }

    /// Catalog entry for one raw descriptor, `None` when it is filtered out
    fn option_for(f: &StreamDescriptor) -> Result<Option<DownloadOption>, DownloadError> {
        let id = f.id()?;

        if id.starts_with(STORYBOARD_PREFIX) {
            return Ok(None);
        }

        let kind = f.media_kind();
        if kind == MediaKind::Unknown {
            return Ok(None);
        }

        // Near-silent or corrupt audio-only streams
        if kind == MediaKind::Audio && f.abr.unwrap_or(0.0) < MIN_AUDIO_BITRATE {
            return Ok(None);
        }

        let resolution = Self::resolution_label(f);
        let quality = Self::quality_score(&resolution, f.height);

        Ok(Some(DownloadOption {
            format_id: id.to_string(),
            ext: f.ext.clone().unwrap_or_else(|| "mp4".to_string()),
            resolution,
            filesize: format_size(f.effective_size()),
            kind,
            quality,
        }))
    }

    /// Upper-cased format note, or "{height}P", or "N/A"; plus 4K/2K tag
    pub fn resolution_label(f: &StreamDescriptor) -> String {
        let base = match (&f.format_note, f.height) {
            (Some(note), _) => note.to_uppercase(),
            (None, Some(h)) => format!("{}P", h),
            (None, None) => return "N/A".to_string(),
        };

        match Self::annotation(f.height) {
            Some(tag) if !base.contains(tag) => format!("{} ({})", base, tag),
            _ => base,
        }
    }

    fn annotation(height: Option<u32>) -> Option<&'static str> {
        match height {
            Some(h) if h >= 2160 => Some("4K"),
            Some(h) if h >= 1440 => Some("2K"),
            _ => None,
        }
    }

    /// Ordering score for a resolution label
    pub fn quality_score(label: &str, height: Option<u32>) -> u32 {
        let label = label.to_uppercase();

        let known = match label.as_str() {
            "144P" => Some(144),
            "240P" => Some(240),
            "360P" => Some(360),
            "480P" => Some(480),
            "720P" => Some(720),
            "1080P" => Some(1080),
            "1440P" | "2K" => Some(1440),
            "2160P" | "4K" => Some(2160),
            "4320P" => Some(4320),
            "BEST" => Some(10000),
            "N/A" => Some(0),
            "MP3 AUDIO (192KBPS)" => Some(1),
            _ => None,
        };

        known
            .or_else(|| {
                LEADING_HEIGHT_RE
                    .captures(&label)
                    .and_then(|caps| caps[1].parse().ok())
            })
            .or(height)
            .unwrap_or(0)
    }

    /// Video-only streams paired with the best audio track
    fn combined_options(formats: &[StreamDescriptor]) -> Vec<DownloadOption> {
        let mut combined: Vec<DownloadOption> = formats
            .iter()
            .filter(|f| f.is_video_only())
            .filter_map(|f| {
                let id = f.id().ok()?;
                if id.starts_with(STORYBOARD_PREFIX) {
                    return None;
                }
                let height = f.height.filter(|h| *h >= MIN_COMBINED_HEIGHT)?;
                let tag = Self::annotation(Some(height))
                    .map(|t| format!(" ({})", t))
                    .unwrap_or_default();

                Some(DownloadOption {
                    format_id: format!("{}{}", id, COMBINED_SUFFIX),
                    ext: "mp4".to_string(),
                    resolution: format!("{}p{} (+AUDIO)", height, tag),
                    filesize: "Unknown".to_string(),
                    kind: MediaKind::VideoAudio,
                    quality: height.saturating_add(COMBINED_BONUS),
                })
            })
            .collect();

        combined.push(DownloadOption {
            format_id: ULTRA_FORMAT_ID.to_string(),
            ext: "mp4".to_string(),
            resolution: "4K ULTRA (+AUDIO)".to_string(),
            filesize: "Unknown".to_string(),
            kind: MediaKind::VideoAudio,
            quality: 5000,
        });

        combined
    }

    /// Engine-native selection policies
    fn auto_options() -> Vec<DownloadOption> {
        let auto = |format_id: &str, resolution: &str, quality: u32| DownloadOption {
            format_id: format_id.to_string(),
            ext: "mp4".to_string(),
            resolution: resolution.to_string(),
            filesize: "Unknown".to_string(),
            kind: MediaKind::VideoAudio,
            quality,
        };

        vec![
            auto(BEST_FORMAT_ID, "BEST (Auto Select)", 10000),
            auto("bestvideo+bestaudio", "BEST VIDEO + BEST AUDIO", 15000),
            auto(
                "bestvideo[height<=1080]+bestaudio/best[height<=1080]",
                "1080p MAX (Auto Merge)",
                1080,
            ),
            auto(
                "bestvideo[height<=2160]+bestaudio/best[height<=2160]",
                "2160p MAX (Auto Merge)",
                2160,
            ),
        ]
    }

    /// Keep the first option for every (label, kind, quality) key
    fn deduplicate(options: Vec<DownloadOption>) -> Vec<DownloadOption> {
        let mut seen = HashSet::new();
        options
            .into_iter()
            .filter(|o| seen.insert((o.resolution.clone(), o.kind, o.quality)))
            .collect()
    }
}
