use std::path::PathBuf;

/// Failures talking to the subtitle/progress backend.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("Remote backend not configured: missing {0}")]
    NotConfigured(&'static str),

    #[error("Request failed with status {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] std::io::Error),

    #[error("Not found: {entity} {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Audio stored at {object_path} but its recording row was not saved: {source}")]
    UnreferencedUpload {
        object_path: String,
        #[source]
        source: Box<RemoteError>,
    },
}

impl From<ureq::Error> for RemoteError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, response) => RemoteError::Status {
                code,
                body: response.into_string().unwrap_or_default(),
            },
            ureq::Error::Transport(transport) => RemoteError::Transport(transport.to_string()),
        }
    }
}

/// Failures of the media backend (player process, IPC channel, playback).
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Failed to start player '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Timed out connecting to player IPC socket {0}")]
    IpcTimeout(PathBuf),

    #[error("Player IPC error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Player IPC encode error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Playback failed: {0}")]
    Playback(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
