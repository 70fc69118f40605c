use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use super::models::{Recording, VideoRecord, VocabEntry, VocabProgress, WatchProgress};
use crate::config::RemoteConfig;
use crate::error::RemoteError;
use crate::subtitle::line::SubtitleLine;

/// Blocking client for the PostgREST-style backend and its object storage
#[derive(Clone)]
pub struct RestClient {
    agent: ureq::Agent,
    base_url: String,
    anon_key: String,
    access_token: String,
}

impl RestClient {
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        if config.url.is_empty() {
            return Err(RemoteError::NotConfigured("remote.url"));
        }
        if config.anon_key.is_empty() {
            return Err(RemoteError::NotConfigured("remote.anon_key"));
        }

        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build();

        Ok(Self {
            agent,
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            access_token: config.access_token.clone(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorize(&self, request: ureq::Request) -> ureq::Request {
        let token = if self.access_token.is_empty() {
            &self.anon_key
        } else {
            &self.access_token
        };
        request
            .set("apikey", &self.anon_key)
            .set("Authorization", &format!("Bearer {}", token))
    }

    fn upsert<T: Serialize + ?Sized>(&self, table: &str, conflict: &str, rows: &T) -> Result<(), RemoteError> {
        let request = self
            .agent
            .post(&self.table_url(table))
            .query("on_conflict", conflict)
            .set("Prefer", "resolution=merge-duplicates,return=minimal");
        self.authorize(request).send_json(rows)?;
        Ok(())
    }

    pub fn fetch_video(&self, video_id: &str) -> Result<VideoRecord, RemoteError> {
        let request = self
            .agent
            .get(&self.table_url("videos"))
            .query("select", "id,title,video_url,duration")
            .query("id", &format!("eq.{}", video_id))
            .query("limit", "1");
        let mut rows: Vec<VideoRecord> = self.authorize(request).call()?.into_json()?;

        rows.pop().ok_or_else(|| RemoteError::NotFound {
            entity: "video",
            key: video_id.to_string(),
        })
    }

    pub fn fetch_subtitles(&self, video_id: &str) -> Result<Vec<SubtitleLine>, RemoteError> {
        let request = self
            .agent
            .get(&self.table_url("subtitles"))
            .query(
                "select",
                "sequence,start_time,end_time,text_en,text_zh,seek_offset,annotations",
            )
            .query("video_id", &format!("eq.{}", video_id))
            .query("order", "sequence.asc");
        let rows: Vec<SubtitleLine> = self.authorize(request).call()?.into_json()?;
        tracing::debug!("Fetched {} subtitle rows for video {}", rows.len(), video_id);
        Ok(rows)
    }

    pub fn fetch_watch_progress(&self, user_id: &str, video_id: &str) -> Result<Option<WatchProgress>, RemoteError> {
        let request = self
            .agent
            .get(&self.table_url("watch_progress"))
            .query("user_id", &format!("eq.{}", user_id))
            .query("video_id", &format!("eq.{}", video_id))
            .query("limit", "1");
        let mut rows: Vec<WatchProgress> = self.authorize(request).call()?.into_json()?;
        Ok(rows.pop())
    }

    pub fn upsert_watch_progress(&self, progress: &WatchProgress) -> Result<(), RemoteError> {
        self.upsert("watch_progress", "user_id,video_id", progress)
    }

    pub fn upsert_vocab_progress(&self, progress: &VocabProgress) -> Result<(), RemoteError> {
        self.upsert("vocab_progress", "user_id,vocab_id", progress)
    }

    pub fn upsert_vocabulary(&self, entries: &[VocabEntry]) -> Result<(), RemoteError> {
        if entries.is_empty() {
            return Ok(());
        }
        self.upsert("vocabulary", "normalized_text,type", entries)
    }

    pub fn update_seek_offset(&self, video_id: &str, sequence: i64, seek_offset: f64) -> Result<(), RemoteError> {
        let request = self
            .agent
            .request("PATCH", &self.table_url("subtitles"))
            .query("video_id", &format!("eq.{}", video_id))
            .query("sequence", &format!("eq.{}", sequence))
            .set("Prefer", "return=minimal");
        self.authorize(request)
            .send_json(serde_json::json!({ "seek_offset": seek_offset }))?;
        Ok(())
    }

    /// Store an audio recording and reference it from a `recordings` row
    pub fn upload_recording(&self, upload: &RecordingUpload<'_>) -> Result<Recording, RemoteError> {
        let object_path = recording_object_path(
            Utc::now(),
            upload.user_id,
            upload.video_id,
            upload.sequence,
            upload.extension,
        );
        let object_url = format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url, upload.bucket, object_path
        );

        tracing::info!("Uploading recording ({} bytes) to {}", upload.bytes.len(), object_path);
        let request = self
            .agent
            .post(&object_url)
            .set("Content-Type", upload.content_type)
            .set("x-upsert", "true");
        self.authorize(request).send_bytes(upload.bytes)?;

        let recording = Recording {
            user_id: upload.user_id.to_string(),
            video_id: upload.video_id.to_string(),
            subtitle_sequence: upload.sequence,
            audio_url: format!(
                "{}/storage/v1/object/public/{}/{}",
                self.base_url, upload.bucket, object_path
            ),
        };
        let request = self
            .agent
            .post(&self.table_url("recordings"))
            .set("Prefer", "return=minimal");
        if let Err(e) = self.authorize(request).send_json(&recording) {
            let source = RemoteError::from(e);
            tracing::error!("Recording row insert failed, {} is left unreferenced: {}", object_path, source);
            return Err(RemoteError::UnreferencedUpload {
                object_path,
                source: Box::new(source),
            });
        }
        Ok(recording)
    }
}

pub struct RecordingUpload<'a> {
    pub bucket: &'a str,
    pub user_id: &'a str,
    pub video_id: &'a str,
    pub sequence: i64,
    pub bytes: &'a [u8],
    pub extension: &'a str,
    pub content_type: &'a str,
}

/// `<YYYY-MM-DD>/<user>/<video>/<sequence>-<unix_ms>.<ext>`
pub fn recording_object_path(
    at: DateTime<Utc>,
    user_id: &str,
    video_id: &str,
    sequence: i64,
    extension: &str,
) -> String {
    format!(
        "{}/{}/{}/{}-{}.{}",
        at.format("%Y-%m-%d"),
        user_id,
        video_id,
        sequence,
        at.timestamp_millis(),
        extension.trim_start_matches('.')
    )
}

/// Content type for a recording file extension
pub fn audio_content_type(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "webm" => "audio/webm",
        "ogg" | "opus" => "audio/ogg",
        "mp3" => "audio/mpeg",
        "m4a" | "mp4" => "audio/mp4",
        "wav" => "audio/wav",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_requires_url_and_key() {
        let mut config = RemoteConfig::default();
        assert!(matches!(
            RestClient::new(&config),
            Err(RemoteError::NotConfigured("remote.url"))
        ));

        config.url = "https://db.example.com/".to_string();
        assert!(matches!(
            RestClient::new(&config),
            Err(RemoteError::NotConfigured("remote.anon_key"))
        ));

        config.anon_key = "anon".to_string();
        let client = RestClient::new(&config).unwrap();
        assert_eq!(client.table_url("videos"), "https://db.example.com/rest/v1/videos");
    }

    #[test]
    fn test_recording_object_path() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        let path = recording_object_path(at, "u1", "v9", 14, ".webm");
        assert_eq!(path, format!("2024-03-09/u1/v9/14-{}.webm", at.timestamp_millis()));
    }

    /// Serves one canned status per connection, recording each request line
    fn stub_server(statuses: Vec<u16>) -> (String, std::thread::JoinHandle<Vec<String>>) {
        use std::io::{BufRead, BufReader, Read, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = std::thread::spawn(move || {
            let mut seen = Vec::new();
            for status in statuses {
                let (stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream);
                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                let mut length = 0;
                loop {
                    let mut header = String::new();
                    reader.read_line(&mut header).unwrap();
                    if header.trim().is_empty() {
                        break;
                    }
                    if let Some((name, value)) = header.split_once(':') {
                        if name.eq_ignore_ascii_case("content-length") {
                            length = value.trim().parse().unwrap();
                        }
                    }
                }
                let mut body = vec![0; length];
                reader.read_exact(&mut body).unwrap();
                seen.push(request_line.trim().to_string());

                let response = format!(
                    "HTTP/1.1 {} Stub\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    status
                );
                reader.get_mut().write_all(response.as_bytes()).unwrap();
            }
            seen
        });
        (url, handle)
    }

    #[test]
    fn test_failed_row_insert_reports_stored_object() {
        let (url, server) = stub_server(vec![200, 500]);
        let config = RemoteConfig {
            url,
            anon_key: "anon".to_string(),
            ..RemoteConfig::default()
        };
        let client = RestClient::new(&config).unwrap();

        let err = client
            .upload_recording(&RecordingUpload {
                bucket: "recordings",
                user_id: "u1",
                video_id: "v9",
                sequence: 4,
                bytes: b"RIFF",
                extension: "wav",
                content_type: "audio/wav",
            })
            .unwrap_err();

        match err {
            RemoteError::UnreferencedUpload { object_path, source } => {
                assert!(object_path.contains("/u1/v9/4-"));
                assert!(object_path.ends_with(".wav"));
                assert!(matches!(*source, RemoteError::Status { code: 500, .. }));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let seen = server.join().unwrap();
        assert!(seen[0].starts_with("POST /storage/v1/object/recordings/"));
        assert!(seen[1].starts_with("POST /rest/v1/recordings"));
    }

    #[test]
    fn test_audio_content_type() {
        assert_eq!(audio_content_type("WEBM"), "audio/webm");
        assert_eq!(audio_content_type("wav"), "audio/wav");
        assert_eq!(audio_content_type("bin"), "application/octet-stream");
    }
}
