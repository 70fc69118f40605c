use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::config::ProgressConfig;
use crate::error::RemoteError;
use crate::remote::models::WatchProgress;
use crate::remote::RestClient;

/// How long shutdown waits for an unload beacon still in flight
const BEACON_WAIT: Duration = Duration::from_secs(2);

/// Why a save was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTrigger {
    Pause,
    Interval,
    VisibilityLost,
    Unload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    Debounced,
    Skipped,
    Failed,
}

/// Where watch positions go
pub trait ProgressSink: Send {
    fn save(&self, progress: &WatchProgress) -> Result<(), RemoteError>;

    /// Last-resort delivery on unload; a returned handle is waited on
    /// (bounded) before the process exits
    fn beacon(&self, progress: WatchProgress) -> Option<JoinHandle<()>>;
}

impl ProgressSink for RestClient {
    fn save(&self, progress: &WatchProgress) -> Result<(), RemoteError> {
        self.upsert_watch_progress(progress)
    }

    fn beacon(&self, progress: WatchProgress) -> Option<JoinHandle<()>> {
        let client = self.clone();
        let handle = std::thread::spawn(move || {
            if let Err(e) = client.upsert_watch_progress(&progress) {
                tracing::warn!("Progress beacon failed: {}", e);
            }
        });
        Some(handle)
    }
}

/// Debounced, best-effort persistence of the watch position
pub struct ProgressPersister<S: ProgressSink> {
    sink: S,
    user_id: String,
    video_id: String,
    min_gap: Duration,
    interval: Duration,
    last_attempt: Option<Instant>,
    last_interval: Option<Instant>,
    beacons: Vec<JoinHandle<()>>,
}

impl<S: ProgressSink> ProgressPersister<S> {
    pub fn new(sink: S, user_id: impl Into<String>, video_id: impl Into<String>, config: &ProgressConfig) -> Self {
        Self {
            sink,
            user_id: user_id.into(),
            video_id: video_id.into(),
            min_gap: config.min_save_gap(),
            interval: config.save_interval(),
            last_attempt: None,
            last_interval: None,
            beacons: Vec::new(),
        }
    }

    /// Whether the periodic save is due while playing
    pub fn interval_due(&mut self, now: Instant) -> bool {
        match self.last_interval {
            None => {
                self.last_interval = Some(now);
                false
            }
            Some(last) => now.duration_since(last) >= self.interval,
        }
    }

    pub fn save(&mut self, trigger: SaveTrigger, position: f64, duration: f64, now: Instant) -> SaveOutcome {
        if trigger == SaveTrigger::Interval {
            self.last_interval = Some(now);
        }

        if duration <= 0.0 || !position.is_finite() {
            return SaveOutcome::Skipped;
        }

        if let Some(last) = self.last_attempt {
            if now.saturating_duration_since(last) < self.min_gap {
                tracing::trace!("Debounced {:?} save", trigger);
                return SaveOutcome::Debounced;
            }
        }
        self.last_attempt = Some(now);

        let progress = WatchProgress {
            user_id: self.user_id.clone(),
            video_id: self.video_id.clone(),
            progress_seconds: position.clamp(0.0, duration),
            duration_seconds: duration,
        };

        match self.sink.save(&progress) {
            Ok(()) => {
                tracing::debug!("Saved progress {:.1}/{:.1} ({:?})", position, duration, trigger);
                SaveOutcome::Saved
            }
            Err(e) => {
                tracing::warn!("Failed to save progress ({:?}): {}", trigger, e);
                if trigger == SaveTrigger::Unload {
                    self.beacons.extend(self.sink.beacon(progress));
                }
                SaveOutcome::Failed
            }
        }
    }

    /// Wait up to `limit` for pending beacons to finish
    pub fn finish(&mut self, limit: Duration) {
        let deadline = Instant::now() + limit;
        for handle in self.beacons.drain(..) {
            while !handle.is_finished() && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(10));
            }
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                tracing::warn!("Progress beacon still pending at exit");
            }
        }
    }
}

enum Request {
    Save {
        trigger: SaveTrigger,
        position: f64,
        duration: f64,
        at: Instant,
    },
    Tick {
        position: f64,
        duration: f64,
        at: Instant,
    },
}

/// Handle to a persister running on its own thread
pub struct ProgressWorker {
    tx: Option<Sender<Request>>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressWorker {
    pub fn spawn<S: ProgressSink + 'static>(persister: ProgressPersister<S>) -> Self {
        let (tx, rx) = mpsc::channel();
        let handle = std::thread::spawn(move || run(persister, rx));
        Self {
            tx: Some(tx),
            handle: Some(handle),
        }
    }

    pub fn request(&self, trigger: SaveTrigger, position: f64, duration: f64) {
        self.send(Request::Save {
            trigger,
            position,
            duration,
            at: Instant::now(),
        });
    }

    /// Periodic check while playing; saves once the interval has elapsed
    pub fn tick(&self, position: f64, duration: f64) {
        self.send(Request::Tick {
            position,
            duration,
            at: Instant::now(),
        });
    }

    fn send(&self, request: Request) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(request);
        }
    }

    /// Flush a final save and wait for the worker to drain
    pub fn shutdown(&mut self, position: f64, duration: f64) {
        self.request(SaveTrigger::Unload, position, duration);
        self.tx = None;
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run<S: ProgressSink>(mut persister: ProgressPersister<S>, rx: Receiver<Request>) {
    while let Ok(request) = rx.recv() {
        match request {
            Request::Save {
                trigger,
                position,
                duration,
                at,
            } => {
                persister.save(trigger, position, duration, at);
            }
            Request::Tick { position, duration, at } => {
                if persister.interval_due(at) {
                    persister.save(SaveTrigger::Interval, position, duration, at);
                }
            }
        }
    }
    persister.finish(BEACON_WAIT);
}
