// Helper functions shared by the catalog builder, orchestrator and engine

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;

const MAX_FILENAME_CHARS: usize = 100;

lazy_static! {
    static ref SHORTS_RE: Regex =
        Regex::new(r"youtube\.com/shorts/([^/?#&]+)").unwrap();
    static ref FORBIDDEN_FILENAME_RE: Regex = Regex::new(r#"[<>:"/\\|?*]"#).unwrap();
}

/// Format file size for display ("1.5 KB", "1.0 GB", "Unknown")
pub fn format_size(bytes: Option<u64>) -> String {
    let bytes = match bytes {
        Some(b) if b > 0 => b,
        _ => return "Unknown".to_string(),
    };

    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{:.1} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.1} TB", size)
}

/// "MM:SS", or "HH:MM:SS" from one hour up
pub fn format_duration(seconds: u64) -> String {
    if seconds == 0 {
        return "Unknown".to_string();
    }

    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let seconds = seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// Strip `<>:"/\|?*`, keep at most 100 characters, trim whitespace
pub fn sanitize_filename(name: &str) -> String {
    let cleaned = FORBIDDEN_FILENAME_RE.replace_all(name, "");
    let truncated: String = cleaned.chars().take(MAX_FILENAME_CHARS).collect();
    truncated.trim().to_string()
}

/// Rewrite YouTube Shorts links to the regular watch URL
pub fn resolve_url(url: &str) -> String {
    match SHORTS_RE.captures(url) {
        Some(caps) => format!("https://www.youtube.com/watch?v={}", &caps[1]),
        None => url.to_string(),
    }
}

/// Final path component, or the input unchanged
pub fn base_filename(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}

/// Run a program to completion and capture its output.
/// With a limit, an overrunning child is killed when the wait is abandoned.
pub async fn run_output(
    program: &Path,
    args: &[String],
    limit: Option<Duration>,
) -> Result<std::process::Output, String> {
    let child = TokioCommand::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| format!("Failed to start {}: {}", program.display(), e))?;

    let output = child.wait_with_output();
    let finished = match limit {
        Some(limit) => timeout(limit, output)
            .await
            .map_err(|_| format!("Timed out after {}s", limit.as_secs()))?,
        None => output.await,
    };

    finished.map_err(|e| format!("Failed to wait for {}: {}", program.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(None), "Unknown");
        assert_eq!(format_size(Some(0)), "Unknown");
        assert_eq!(format_size(Some(512)), "512.0 B");
        assert_eq!(format_size(Some(1536)), "1.5 KB");
        assert_eq!(format_size(Some(1_073_741_824)), "1.0 GB");
        assert_eq!(format_size(Some(3 * 1_099_511_627_776)), "3.0 TB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "Unknown");
        assert_eq!(format_duration(65), "01:05");
        assert_eq!(format_duration(3661), "01:01:01");
        assert_eq!(format_duration(3599), "59:59");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("a<b>c:d\"e/f\\g|h?i*j"), "abcdefghij");
        assert_eq!(sanitize_filename("  Plain title  "), "Plain title");

        let long = "x".repeat(150);
        assert_eq!(sanitize_filename(&long).chars().count(), 100);

        let clean = "Already fine - part 2 (live)";
        assert_eq!(sanitize_filename(clean), clean);
    }

    #[test]
    fn test_resolve_shorts_url() {
        assert_eq!(
            resolve_url("https://www.youtube.com/shorts/abc123?x=1"),
            "https://www.youtube.com/watch?v=abc123"
        );
        assert_eq!(
            resolve_url("https://youtube.com/shorts/abc123"),
            "https://www.youtube.com/watch?v=abc123"
        );

        let watch = "https://www.youtube.com/watch?v=abc123";
        assert_eq!(resolve_url(watch), watch);
        let tiktok = "https://www.tiktok.com/@user/video/123";
        assert_eq!(resolve_url(tiktok), tiktok);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_output_captures_and_times_out() {
        let sh = Path::new("/bin/sh");
        let script = |body: &str| vec!["-c".to_string(), body.to_string()];

        let output = run_output(sh, &script("echo out; echo err >&2; exit 3"), None)
            .await
            .unwrap();
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(String::from_utf8_lossy(&output.stdout), "out\n");
        assert_eq!(String::from_utf8_lossy(&output.stderr), "err\n");

        let err = run_output(sh, &script("sleep 5"), Some(Duration::from_millis(200)))
            .await
            .unwrap_err();
        assert!(err.starts_with("Timed out"), "got {}", err);

        let err = run_output(Path::new("/nonexistent/tool"), &[], None)
            .await
            .unwrap_err();
        assert!(err.contains("No such file or directory"), "got {}", err);
    }

    #[test]
    fn test_base_filename() {
        assert_eq!(base_filename("/tmp/out/clip.f137.mp4"), "clip.f137.mp4");
        assert_eq!(base_filename("clip.mp4"), "clip.mp4");
        assert_eq!(base_filename(""), "");
    }
}
