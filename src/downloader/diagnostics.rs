// Engine error diagnostics
//
// Classifies yt-dlp stderr so failures carry a short human reason and a
// hint about whether a cookies file would help.

use serde::{Deserialize, Serialize};

/// Why the engine refused or failed a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockingReason {
    /// HTTP 403 Forbidden - general access denied
    Http403Forbidden,
    /// Age-restricted content requiring login
    AgeRestricted,
    /// Login-gated (private posts, members-only, "log in to view")
    LoginRequired,
    GeoBlocked,
    /// Network timeout or unreachable host
    NetworkTimeout,
    /// Rate limiting (429 or similar)
    RateLimited,
    /// Bot detection / captcha
    BotDetection,
    /// Video deleted or unavailable
    VideoUnavailable,
    /// No extractor matches the URL
    UnsupportedUrl,
    /// Requested format expression matched nothing
    FormatUnavailable,
    /// ffmpeg missing or post-processing failed
    PostProcessing,
    Unknown,
}

impl BlockingReason {
    /// Check if cookies might help
    pub fn cookies_might_help(&self) -> bool {
        matches!(
            self,
            Self::Http403Forbidden
                | Self::AgeRestricted
                | Self::LoginRequired
                | Self::BotDetection
        )
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Http403Forbidden => "Access denied (HTTP 403)",
            Self::AgeRestricted => "Age-restricted content",
            Self::LoginRequired => "Login required",
            Self::GeoBlocked => "Geographic restriction",
            Self::NetworkTimeout => "Network timeout",
            Self::RateLimited => "Rate limited",
            Self::BotDetection => "Bot detection triggered",
            Self::VideoUnavailable => "Video unavailable",
            Self::UnsupportedUrl => "Unsupported URL",
            Self::FormatUnavailable => "Requested format is not available",
            Self::PostProcessing => "Post-processing failed",
            Self::Unknown => "Unknown error",
        }
    }
}

/// Analyze error message and return blocking reason
pub fn diagnose_error(error: &str) -> Option<BlockingReason> {
    let lower = error.to_lowercase();

    if lower.trim().is_empty() {
        return None;
    }

    if lower.contains("unsupported url") {
        return Some(BlockingReason::UnsupportedUrl);
    }

    if lower.contains("requested format is not available") {
        return Some(BlockingReason::FormatUnavailable);
    }

    if lower.contains("ffmpeg not found")
        || lower.contains("ffprobe and ffmpeg not found")
        || lower.contains("postprocessing:")
    {
        return Some(BlockingReason::PostProcessing);
    }

    // Age restriction
    if lower.contains("age-restricted")
        || lower.contains("sign in to confirm your age")
        || lower.contains("age_verification")
    {
        return Some(BlockingReason::AgeRestricted);
    }

    if lower.contains("private video")
        || lower.contains("login required")
        || lower.contains("log in")
        || lower.contains("members only")
        || lower.contains("use --cookies")
    {
        return Some(BlockingReason::LoginRequired);
    }

    if lower.contains("video unavailable")
        || lower.contains("video has been removed")
        || lower.contains("this video is no longer available")
        || lower.contains("http error 404")
    {
        return Some(BlockingReason::VideoUnavailable);
    }

    if lower.contains("not available in your country")
        || lower.contains("blocked in your country")
        || lower.contains("geo restriction")
    {
        return Some(BlockingReason::GeoBlocked);
    }

    if lower.contains("429") || lower.contains("rate limit") || lower.contains("too many requests") {
        return Some(BlockingReason::RateLimited);
    }

    if lower.contains("not a bot") || lower.contains("captcha") || lower.contains("unusual traffic") {
        return Some(BlockingReason::BotDetection);
    }

    if lower.contains("403") || lower.contains("forbidden") {
        return Some(BlockingReason::Http403Forbidden);
    }

    if lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("connection refused")
        || lower.contains("network is unreachable")
        || lower.contains("name or service not known")
    {
        return Some(BlockingReason::NetworkTimeout);
    }

    Some(BlockingReason::Unknown)
}

/// First "ERROR:" line of engine stderr, else the last non-empty line
pub fn error_summary(stderr: &str) -> String {
    stderr
        .lines()
        .map(str::trim)
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| stderr.lines().map(str::trim).rev().find(|l| !l.is_empty()))
        .unwrap_or("no output from engine")
        .to_string()
}
