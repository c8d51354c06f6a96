//! Format catalog and download orchestration over yt-dlp.
//!
//! [`Downloader::get_video_info`] turns a URL into a ranked list of
//! [`DownloadOption`]s; [`Downloader::download`] fetches one of them and
//! reports progress to a [`ProgressObserver`].

pub mod downloader;

pub use downloader::{
    DownloadError, DownloadKind, DownloadOption, DownloadRequest, Downloader, DownloaderConfig,
    MediaEngine, MediaKind, ProgressEvent, ProgressObserver, VideoInfo,
};
