// Error types for the catalog builder, orchestrator and engine backends

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    /// A raw format entry is missing its mandatory format id.
    /// Only that entry is skipped, never the whole catalog.
    #[error("Invalid format descriptor: {0}")]
    InvalidDescriptor(String),

    /// The engine could not resolve the URL or fetch metadata/content
    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    /// The engine reported success but no output file matched
    #[error("Downloaded file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// yt-dlp or ffmpeg not found in system
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Failed to parse engine output
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Classify raw engine stderr
impl From<String> for DownloadError {
    fn from(s: String) -> Self {
        if s.contains("command not found") || s.contains("No such file or directory") {
            return Self::ToolNotFound(s);
        }

        if s.contains("Invalid JSON") || s.contains("Failed to parse JSON") {
            return Self::ParseError(s);
        }

        Self::ExtractionFailed(s)
    }
}
