use serde::{Deserialize, Serialize};

use crate::subtitle::line::{null_as_default, AnnotationKind};
use crate::vocab::VocabStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    pub video_url: String,
    #[serde(default)]
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchProgress {
    pub user_id: String,
    pub video_id: String,
    pub progress_seconds: f64,
    pub duration_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabProgress {
    pub user_id: String,
    pub vocab_id: String,
    pub status: VocabStatus,
}

/// Shared dictionary row, unique on `(normalized_text, type)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabEntry {
    pub normalized_text: String,
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    pub text: String,
    pub phonetic: String,
    pub meaning: String,
    pub helper_sentence: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub user_id: String,
    pub video_id: String,
    pub subtitle_sequence: i64,
    pub audio_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocab_entry_uses_type_column() {
        let entry = VocabEntry {
            normalized_text: "break the ice".to_string(),
            kind: AnnotationKind::Phrase,
            text: "Break the ice".to_string(),
            phonetic: String::new(),
            meaning: "打破僵局".to_string(),
            helper_sentence: String::new(),
        };

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], "phrase");
        assert_eq!(value["normalized_text"], "break the ice");
    }

    #[test]
    fn test_video_record_tolerates_missing_fields() {
        let video: VideoRecord =
            serde_json::from_str(r#"{"id": "v1", "video_url": "https://cdn/v1.mp4"}"#).unwrap();
        assert_eq!(video.title, "");
        assert_eq!(video.duration, None);

        let video: VideoRecord = serde_json::from_str(
            r#"{"id": "v2", "title": null, "video_url": "https://cdn/v2.mp4", "duration": null}"#,
        )
        .unwrap();
        assert_eq!(video.title, "");
    }
}
