// Progress reporter: raw engine records to normalized events

use super::models::{EngineProgress, ProgressEvent, ProgressStatus};
use super::traits::ProgressObserver;
use super::utils::{base_filename, format_size};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Forwards engine progress to an optional observer
pub struct ProgressReporter<'a> {
    observer: Option<&'a dyn ProgressObserver>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(observer: Option<&'a dyn ProgressObserver>) -> Self {
        Self { observer }
    }

    pub fn on_engine_event(&self, raw: &EngineProgress) {
        let Some(observer) = self.observer else {
            return;
        };

        let event = match raw.status.as_str() {
            "downloading" => downloading_event(raw),
            "finished" => ProgressEvent {
                status: ProgressStatus::Completed,
                percent: 100.0,
                speed: "0 MB/s".to_string(),
                eta: "0 seconds".to_string(),
                filesize: format_size(total_bytes(raw)),
                filename: filename(raw),
                message: "Download completed!".to_string(),
            },
            other => {
                tracing::trace!("Ignoring engine progress status {:?}", other);
                return;
            }
        };

        observer.on_progress(event);
    }

    /// Terminal error event
    pub fn report_error(&self, message: &str) {
        if let Some(observer) = self.observer {
            observer.on_progress(ProgressEvent {
                status: ProgressStatus::Error,
                percent: 0.0,
                speed: "0 MB/s".to_string(),
                eta: "Unknown".to_string(),
                filesize: "Unknown".to_string(),
                filename: String::new(),
                message: format!("Download failed: {}", message),
            });
        }
    }
}

/// Zero counts as unknown, so an empty total falls back to the estimate
fn total_bytes(raw: &EngineProgress) -> Option<u64> {
    let nonzero = |v: Option<u64>| v.filter(|n| *n > 0);
    nonzero(raw.total_bytes).or(nonzero(raw.total_bytes_estimate))
}

fn filename(raw: &EngineProgress) -> String {
    raw.filename.as_deref().map(base_filename).unwrap_or_default()
}

fn downloading_event(raw: &EngineProgress) -> ProgressEvent {
    let total = total_bytes(raw);
    let percent = match (raw.downloaded_bytes, total) {
        (Some(done), Some(total)) => {
            let pct = done as f64 / total as f64 * 100.0;
            (pct * 10.0).round() / 10.0
        }
        _ => 0.0,
    };

    let speed = match raw.speed {
        Some(s) if s > 0.0 => format!("{:.1} MB/s", s / BYTES_PER_MB),
        _ => "0 MB/s".to_string(),
    };

    let eta = raw
        .eta
        .filter(|n| *n > 0)
        .map(|n| format!("{} seconds", n))
        .unwrap_or_else(|| "Unknown".to_string());

    ProgressEvent {
        status: ProgressStatus::Downloading,
        percent,
        speed,
        eta,
        filesize: format_size(total),
        filename: filename(raw),
        message: "Downloading...".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn collect(raws: &[EngineProgress]) -> Vec<ProgressEvent> {
        let events = Mutex::new(Vec::new());
        let observer = |e: ProgressEvent| events.lock().unwrap().push(e);
        let reporter = ProgressReporter::new(Some(&observer));
        for raw in raws {
            reporter.on_engine_event(raw);
        }
        drop(reporter);
        events.into_inner().unwrap()
    }

    #[test]
    fn test_downloading_event() {
        let raw = EngineProgress {
            status: "downloading".into(),
            downloaded_bytes: Some(1_048_576),
            total_bytes: Some(3_145_728),
            speed: Some(2_621_440.0),
            eta: Some(12),
            filename: Some("/tmp/out/Clip.f137.mp4".into()),
            ..Default::default()
        };
        let events = collect(&[raw]);
        assert_eq!(events.len(), 1);

        let e = &events[0];
        assert_eq!(e.status, ProgressStatus::Downloading);
        assert_eq!(e.percent, 33.3);
        assert_eq!(e.speed, "2.5 MB/s");
        assert_eq!(e.eta, "12 seconds");
        assert_eq!(e.filesize, "3.0 MB");
        assert_eq!(e.filename, "Clip.f137.mp4");
        assert_eq!(e.message, "Downloading...");
    }

    #[test]
    fn test_estimate_and_unknown_fields() {
        let with_estimate = EngineProgress {
            status: "downloading".into(),
            downloaded_bytes: Some(500),
            total_bytes_estimate: Some(1000),
            ..Default::default()
        };
        let unknown_total = EngineProgress {
            status: "downloading".into(),
            downloaded_bytes: Some(500),
            ..Default::default()
        };
        let events = collect(&[with_estimate, unknown_total]);

        assert_eq!(events[0].percent, 50.0);
        assert_eq!(events[0].speed, "0 MB/s");
        assert_eq!(events[0].eta, "Unknown");
        assert_eq!(events[1].percent, 0.0);
        assert_eq!(events[1].filesize, "Unknown");
    }

    #[test]
    fn test_zero_values_count_as_unknown() {
        let raw = EngineProgress {
            status: "downloading".into(),
            downloaded_bytes: Some(250),
            total_bytes: Some(0),
            total_bytes_estimate: Some(1000),
            eta: Some(0),
            ..Default::default()
        };
        let events = collect(&[raw]);

        assert_eq!(events[0].percent, 25.0);
        assert_eq!(events[0].filesize, "1000.0 B");
        assert_eq!(events[0].eta, "Unknown");
    }

    #[test]
    fn test_finished_and_dropped_statuses() {
        let raws = [
            EngineProgress {
                status: "error".into(),
                ..Default::default()
            },
            EngineProgress {
                status: "finished".into(),
                total_bytes: Some(2048),
                filename: Some("Clip.mp4".into()),
                ..Default::default()
            },
        ];
        let events = collect(&raws);
        assert_eq!(events.len(), 1);

        let done = &events[0];
        assert_eq!(done.status, ProgressStatus::Completed);
        assert_eq!(done.percent, 100.0);
        assert_eq!(done.speed, "0 MB/s");
        assert_eq!(done.eta, "0 seconds");
        assert_eq!(done.message, "Download completed!");
    }

    #[test]
    fn test_without_observer_is_noop() {
        let reporter = ProgressReporter::new(None);
        reporter.on_engine_event(&EngineProgress {
            status: "finished".into(),
            ..Default::default()
        });
        reporter.report_error("boom");
    }

    #[test]
    fn test_report_error() {
        let events = Mutex::new(Vec::new());
        let observer = |e: ProgressEvent| events.lock().unwrap().push(e);
        ProgressReporter::new(Some(&observer)).report_error("network down");

        let events = events.into_inner().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, ProgressStatus::Error);
        assert!(events[0].message.contains("network down"));
    }
}
