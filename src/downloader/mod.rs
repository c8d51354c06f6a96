// Downloader module - format catalog, orchestration and the yt-dlp engine

pub mod backends;
pub mod config;
pub mod cookies;
pub mod diagnostics;
pub mod errors;
pub mod format_selector;
pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod tools;
pub mod traits;
pub mod utils;

pub use backends::YtDlpEngine;
pub use config::DownloaderConfig;
pub use errors::DownloadError;
pub use format_selector::FormatSelector;
pub use models::{
    DownloadKind, DownloadOption, DownloadRequest, MediaKind, ProgressEvent, ProgressStatus,
    StreamDescriptor, VideoInfo,
};
pub use orchestrator::Downloader;
pub use progress::ProgressReporter;
pub use traits::{MediaEngine, ProgressObserver};
