use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Duration;

use super::{MediaBackend, MediaEvent};
use crate::error::MediaError;

const CONNECT_ATTEMPTS: u32 = 50;
const CONNECT_DELAY: Duration = Duration::from_millis(100);

// Observed property ids
const OBSERVED: [(u64, &str); 4] = [(1, "time-pos"), (2, "pause"), (3, "duration"), (4, "eof-reached")];

/// mpv driven over its JSON IPC socket
pub struct MpvBackend {
    child: Child,
    writer: UnixStream,
    socket_path: PathBuf,
    closing: Arc<AtomicBool>,
    next_id: u64,
}

impl MpvBackend {
    /// Spawn `program` on `media` (path or URL), paused at `start` if given,
    /// and start forwarding its events to `events`.
    pub fn launch(
        program: &str,
        media: &str,
        start: Option<f64>,
        events: Sender<MediaEvent>,
    ) -> Result<Self, MediaError> {
        let socket_path = std::env::temp_dir().join(format!("sublearn-mpv-{}.sock", std::process::id()));
        let _ = std::fs::remove_file(&socket_path);

        tracing::info!("Launching {} for {}", program, media);
        let mut command = Command::new(program);
        if let Some(start) = start.filter(|s| s.is_finite() && *s > 0.0) {
            command.arg(format!("--start={:.3}", start));
        }
        let mut child = command
            .arg(format!("--input-ipc-server={}", socket_path.display()))
            .arg("--pause")
            .arg("--keep-open=yes")
            .arg("--force-window=yes")
            .arg("--really-quiet")
            .arg(media)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| MediaError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let stream = match connect(&socket_path, &mut child) {
            Ok(stream) => stream,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e);
            }
        };

        let closing = Arc::new(AtomicBool::new(false));
        let reader = stream.try_clone()?;
        let reader_closing = closing.clone();
        std::thread::spawn(move || read_events(reader, events, reader_closing));

        let mut backend = Self {
            child,
            writer: stream,
            socket_path,
            closing,
            next_id: 100,
        };
        for (id, name) in OBSERVED {
            backend.send(json!({"command": ["observe_property", id, name]}))?;
        }
        Ok(backend)
    }

    fn send(&mut self, mut message: Value) -> Result<(), MediaError> {
        message["request_id"] = json!(self.next_id);
        self.next_id += 1;

        let mut line = serde_json::to_vec(&message)?;
        line.push(b'\n');
        self.writer.write_all(&line)?;
        self.writer.flush()?;
        Ok(())
    }
}

impl MediaBackend for MpvBackend {
    fn seek(&mut self, time: f64) -> Result<(), MediaError> {
        self.send(json!({"command": ["seek", time, "absolute+exact"]}))
    }

    fn play(&mut self) -> Result<(), MediaError> {
        self.send(json!({"command": ["set_property", "pause", false]}))
    }

    fn pause(&mut self) -> Result<(), MediaError> {
        self.send(json!({"command": ["set_property", "pause", true]}))
    }

    fn shutdown(&mut self) -> Result<(), MediaError> {
        if self.closing.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let _ = self.send(json!({"command": ["quit"]}));
        for _ in 0..10 {
            if let Ok(Some(_)) = self.child.try_wait() {
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
        let _ = std::fs::remove_file(&self.socket_path);
        Ok(())
    }
}

impl Drop for MpvBackend {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

fn connect(socket_path: &PathBuf, child: &mut Child) -> Result<UnixStream, MediaError> {
    for _ in 0..CONNECT_ATTEMPTS {
        if let Ok(Some(status)) = child.try_wait() {
            return Err(MediaError::Playback(format!(
                "player exited before opening IPC (code: {:?})",
                status.code()
            )));
        }
        match UnixStream::connect(socket_path) {
            Ok(stream) => return Ok(stream),
            Err(_) => std::thread::sleep(CONNECT_DELAY),
        }
    }
    Err(MediaError::IpcTimeout(socket_path.clone()))
}

fn read_events(stream: UnixStream, events: Sender<MediaEvent>, closing: Arc<AtomicBool>) {
    let reader = BufReader::new(stream);
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                if !closing.load(Ordering::SeqCst) {
                    let _ = events.send(MediaEvent::Error(format!("player IPC read failed: {}", e)));
                }
                return;
            }
        };

        let value: Value = match serde_json::from_str(&line) {
            Ok(value) => value,
            Err(_) => continue,
        };
        if let Some(error) = value.get("error").and_then(Value::as_str) {
            if error != "success" {
                tracing::warn!("mpv command failed: {}", error);
            }
        }
        if let Some(event) = parse_event(&value) {
            if events.send(event).is_err() {
                return;
            }
        }
    }

    if !closing.load(Ordering::SeqCst) {
        let _ = events.send(MediaEvent::Error("player closed".to_string()));
    }
}

/// Map one mpv IPC message to a media event
pub fn parse_event(value: &Value) -> Option<MediaEvent> {
    match value.get("event")?.as_str()? {
        "property-change" => {
            let data = value.get("data")?;
            match value.get("name")?.as_str()? {
                "time-pos" => data.as_f64().map(MediaEvent::TimeUpdate),
                "duration" => data.as_f64().map(MediaEvent::DurationChanged),
                "pause" => data
                    .as_bool()
                    .map(|paused| if paused { MediaEvent::Paused } else { MediaEvent::Playing }),
                "eof-reached" => match data.as_bool() {
                    Some(true) => Some(MediaEvent::Ended),
                    _ => None,
                },
                _ => None,
            }
        }
        "playback-restart" => Some(MediaEvent::Seeked),
        "end-file" if value.get("reason").and_then(Value::as_str) == Some("error") => {
            let detail = value
                .get("file_error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            Some(MediaEvent::Error(format!("Cannot play media: {}", detail)))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_property_changes() {
        let time = json!({"event": "property-change", "id": 1, "name": "time-pos", "data": 12.5});
        assert_eq!(parse_event(&time), Some(MediaEvent::TimeUpdate(12.5)));

        let paused = json!({"event": "property-change", "id": 2, "name": "pause", "data": false});
        assert_eq!(parse_event(&paused), Some(MediaEvent::Playing));

        let duration = json!({"event": "property-change", "id": 3, "name": "duration", "data": 300.0});
        assert_eq!(parse_event(&duration), Some(MediaEvent::DurationChanged(300.0)));

        let eof = json!({"event": "property-change", "id": 4, "name": "eof-reached", "data": true});
        assert_eq!(parse_event(&eof), Some(MediaEvent::Ended));
    }

    #[test]
    fn test_parse_ignores_missing_data() {
        let idle = json!({"event": "property-change", "id": 1, "name": "time-pos"});
        assert_eq!(parse_event(&idle), None);

        let unset = json!({"event": "property-change", "id": 1, "name": "time-pos", "data": null});
        assert_eq!(parse_event(&unset), None);

        let reply = json!({"request_id": 100, "error": "success"});
        assert_eq!(parse_event(&reply), None);
    }

    #[test]
    fn test_parse_seek_and_errors() {
        assert_eq!(parse_event(&json!({"event": "playback-restart"})), Some(MediaEvent::Seeked));

        let failed = json!({"event": "end-file", "reason": "error", "file_error": "unrecognized file format"});
        assert_eq!(
            parse_event(&failed),
            Some(MediaEvent::Error("Cannot play media: unrecognized file format".to_string()))
        );

        let quit = json!({"event": "end-file", "reason": "quit"});
        assert_eq!(parse_event(&quit), None);
    }
}
