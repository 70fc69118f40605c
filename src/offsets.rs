use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::error::RemoteError;
use crate::remote::RestClient;

/// How long shutdown waits for offset saves still in flight
const DRAIN_WAIT: Duration = Duration::from_secs(2);

/// Where edited seek offsets go
pub trait OffsetSink: Send {
    fn save_offset(&self, video_id: &str, sequence: i64, seek_offset: f64) -> Result<(), RemoteError>;
}

impl OffsetSink for RestClient {
    fn save_offset(&self, video_id: &str, sequence: i64, seek_offset: f64) -> Result<(), RemoteError> {
        self.update_seek_offset(video_id, sequence, seek_offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetUpdate {
    pub index: usize,
    pub sequence: i64,
    pub seek_offset: f64,
}

/// Result of one submitted batch, by line index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OffsetReport {
    pub saved: Vec<usize>,
    pub failed: Vec<usize>,
}

/// Saves offsets off the UI thread and reports back per batch
pub struct OffsetWorker {
    tx: Option<Sender<Vec<OffsetUpdate>>>,
    reports: Receiver<OffsetReport>,
    handle: Option<JoinHandle<()>>,
}

impl OffsetWorker {
    pub fn spawn<S: OffsetSink + 'static>(sink: S, video_id: impl Into<String>) -> Self {
        let video_id = video_id.into();
        let (tx, rx) = mpsc::channel();
        let (report_tx, reports) = mpsc::channel();
        let handle = std::thread::spawn(move || run(sink, &video_id, rx, report_tx));
        Self {
            tx: Some(tx),
            reports,
            handle: Some(handle),
        }
    }

    /// Queue a batch; returns false once the worker is gone
    pub fn submit(&self, batch: Vec<OffsetUpdate>) -> bool {
        match &self.tx {
            Some(tx) => tx.send(batch).is_ok(),
            None => false,
        }
    }

    pub fn try_report(&self) -> Option<OffsetReport> {
        self.reports.try_recv().ok()
    }

    pub fn shutdown(&mut self) {
        self.tx = None;
        let Some(handle) = self.handle.take() else {
            return;
        };
        let deadline = Instant::now() + DRAIN_WAIT;
        while !handle.is_finished() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        if handle.is_finished() {
            let _ = handle.join();
        } else {
            tracing::warn!("Offset saves still pending at exit");
        }
    }
}

fn run<S: OffsetSink>(sink: S, video_id: &str, rx: Receiver<Vec<OffsetUpdate>>, reports: Sender<OffsetReport>) {
    while let Ok(batch) = rx.recv() {
        let mut report = OffsetReport::default();
        for update in batch {
            match sink.save_offset(video_id, update.sequence, update.seek_offset) {
                Ok(()) => report.saved.push(update.index),
                Err(e) => {
                    tracing::warn!("Failed to save offset for line {}: {}", update.sequence, e);
                    report.failed.push(update.index);
                }
            }
        }
        if reports.send(report).is_err() {
            break;
        }
    }
}
