use serde::{Deserialize, Serialize};

/// Lines shorter than this are widened during normalization (seconds)
pub const MIN_LINE_DURATION: f64 = 0.1;

/// A single timed caption with English/Chinese text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleLine {
    pub sequence: i64,
    #[serde(alias = "startTime")]
    pub start_time: f64, // seconds
    #[serde(alias = "endTime")]
    pub end_time: f64, // seconds
    #[serde(default, alias = "textEn", deserialize_with = "null_as_default")]
    pub text_en: String,
    #[serde(default, alias = "textZh", deserialize_with = "null_as_default")]
    pub text_zh: String,
    /// Manual correction applied to the smart-seek target (seconds, signed)
    #[serde(default, alias = "seekOffset", deserialize_with = "null_as_default")]
    pub seek_offset: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub annotations: Vec<Annotation>,
}

impl SubtitleLine {
    pub fn new(sequence: i64, start_time: f64, end_time: f64, text_en: impl Into<String>) -> Self {
        Self {
            sequence,
            start_time,
            end_time,
            text_en: text_en.into(),
            text_zh: String::new(),
            seek_offset: 0.0,
            annotations: Vec::new(),
        }
    }

    pub fn with_offset(mut self, seek_offset: f64) -> Self {
        self.seek_offset = seek_offset;
        self
    }

    /// Whether `time` falls in `[start_time, end_time)`
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start_time && time < self.end_time
    }

    pub fn has_offset(&self) -> bool {
        self.seek_offset != 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Word,
    Phrase,
}

impl AnnotationKind {
    pub fn as_str(&self) -> &str {
        match self {
            AnnotationKind::Word => "word",
            AnnotationKind::Phrase => "phrase",
        }
    }
}

/// A learning point attached to a span of `text_en`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    /// Character offsets into the line's English text
    pub start: usize,
    pub end: usize,
    #[serde(default, deserialize_with = "null_as_default")]
    pub phonetic: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub meaning: String,
    #[serde(default, alias = "helperSentence", deserialize_with = "null_as_default")]
    pub helper_sentence: String,
}

impl Annotation {
    /// The annotated slice of `line.text_en`, if the offsets are valid
    pub fn span<'a>(&self, line: &'a SubtitleLine) -> Option<&'a str> {
        if self.start >= self.end {
            return None;
        }
        let text = &line.text_en;
        let mut indices = text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len()));
        let begin = indices.nth(self.start)?;
        let finish = indices.nth(self.end - self.start - 1)?;
        Some(&text[begin..finish])
    }
}

/// Nullable database columns decode to the field's default
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let value: Option<T> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

/// Bring externally supplied lines into the shape the player relies on:
/// finite, non-negative, non-empty windows, unique sequences, sorted.
pub fn normalize_lines(lines: Vec<SubtitleLine>) -> Vec<SubtitleLine> {
    let mut normalized: Vec<SubtitleLine> = lines
        .into_iter()
        .filter(|line| {
            let ok = line.start_time.is_finite() && line.end_time.is_finite();
            if !ok {
                tracing::warn!("Dropping subtitle {} with non-finite timing", line.sequence);
            }
            ok
        })
        .map(|mut line| {
            if line.end_time < line.start_time {
                std::mem::swap(&mut line.start_time, &mut line.end_time);
            }
            line.start_time = line.start_time.max(0.0);
            if line.end_time - line.start_time < MIN_LINE_DURATION {
                line.end_time = line.start_time + MIN_LINE_DURATION;
            }
            if !line.seek_offset.is_finite() {
                line.seek_offset = 0.0;
            }
            line
        })
        .collect();

    // Stable sort keeps the first of any duplicated sequence in front
    normalized.sort_by_key(|line| line.sequence);
    normalized.dedup_by(|later, earlier| {
        let duplicate = later.sequence == earlier.sequence;
        if duplicate {
            tracing::warn!("Dropping duplicate subtitle sequence {}", later.sequence);
        }
        duplicate
    });
    normalized
}

/// Index of the line whose `[start, end)` window contains `time`
pub fn find_line_at(lines: &[SubtitleLine], time: f64) -> Option<usize> {
    let candidate = lines
        .partition_point(|line| line.start_time <= time)
        .checked_sub(1)?;

    // Lines may overlap; walk back to the earliest one still covering `time`
    let mut found = None;
    for index in (0..=candidate).rev() {
        if lines[index].contains(time) {
            found = Some(index);
        } else if found.is_some() {
            break;
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_fixes_inverted_and_empty_lines() {
        let lines = vec![
            SubtitleLine::new(2, 5.0, 4.0, "inverted"),
            SubtitleLine::new(1, -1.0, -1.0, "empty"),
            SubtitleLine::new(3, f64::NAN, 7.0, "broken"),
        ];

        let normalized = normalize_lines(lines);
        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized[0].sequence, 1);
        assert_eq!(normalized[0].start_time, 0.0);
        assert!((normalized[0].end_time - MIN_LINE_DURATION).abs() < 1e-9);
        assert_eq!(normalized[1].start_time, 4.0);
        assert_eq!(normalized[1].end_time, 5.0);
        assert!(normalized.iter().all(|l| l.end_time > l.start_time));
    }

    #[test]
    fn test_normalize_keeps_first_duplicate_sequence() {
        let lines = vec![
            SubtitleLine::new(1, 0.0, 1.0, "first"),
            SubtitleLine::new(2, 1.0, 2.0, "second"),
            SubtitleLine::new(1, 3.0, 4.0, "again"),
        ];

        let normalized = normalize_lines(lines);
        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized[0].text_en, "first");
    }

    #[test]
    fn test_find_line_at() {
        let lines = vec![
            SubtitleLine::new(1, 0.0, 2.0, "a"),
            SubtitleLine::new(2, 2.05, 5.0, "b"),
            SubtitleLine::new(3, 6.0, 7.0, "c"),
        ];

        assert_eq!(find_line_at(&lines, 0.0), Some(0));
        assert_eq!(find_line_at(&lines, 1.99), Some(0));
        assert_eq!(find_line_at(&lines, 2.0), None);
        assert_eq!(find_line_at(&lines, 2.05), Some(1));
        assert_eq!(find_line_at(&lines, 5.5), None);
        assert_eq!(find_line_at(&lines, 6.5), Some(2));
        assert_eq!(find_line_at(&lines, 9.0), None);
        assert_eq!(find_line_at(&[], 1.0), None);
    }

    #[test]
    fn test_find_line_at_prefers_earliest_overlapping_line() {
        let lines = vec![
            SubtitleLine::new(1, 0.0, 3.0, "long"),
            SubtitleLine::new(2, 2.0, 4.0, "overlap"),
        ];
        assert_eq!(find_line_at(&lines, 2.5), Some(0));
        assert_eq!(find_line_at(&lines, 3.5), Some(1));
    }

    #[test]
    fn test_annotation_span_uses_char_offsets() {
        let mut line = SubtitleLine::new(1, 0.0, 1.0, "Café au lait, please");
        let annotation = Annotation {
            id: "a1".to_string(),
            kind: AnnotationKind::Phrase,
            text: "au lait".to_string(),
            start: 5,
            end: 12,
            phonetic: String::new(),
            meaning: "with milk".to_string(),
            helper_sentence: String::new(),
        };
        assert_eq!(annotation.span(&line), Some("au lait"));

        line.text_en = "short".to_string();
        assert_eq!(annotation.span(&line), None);
    }

    #[test]
    fn test_deserialize_accepts_camel_case_rows() {
        let json = r#"{
            "sequence": 4,
            "startTime": 1.5,
            "endTime": 3.0,
            "textEn": "Hello there",
            "textZh": "你好",
            "seekOffset": -0.2,
            "annotations": null
        }"#;

        let line: SubtitleLine = serde_json::from_str(json).unwrap();
        assert_eq!(line.sequence, 4);
        assert_eq!(line.text_zh, "你好");
        assert_eq!(line.seek_offset, -0.2);
        assert!(line.annotations.is_empty());
    }

    #[test]
    fn test_deserialize_null_columns_as_defaults() {
        let json = r#"[{
            "sequence": 1,
            "start_time": 0.5,
            "end_time": 2.0,
            "text_en": "No translation yet",
            "text_zh": null,
            "seek_offset": null,
            "annotations": [{
                "id": null,
                "type": "word",
                "text": "translation",
                "start": 3,
                "end": 14,
                "phonetic": null,
                "meaning": null,
                "helper_sentence": null
            }]
        }]"#;

        let lines: Vec<SubtitleLine> = serde_json::from_str(json).unwrap();
        assert_eq!(lines[0].text_zh, "");
        assert_eq!(lines[0].seek_offset, 0.0);
        assert!(!lines[0].has_offset());
        let annotation = &lines[0].annotations[0];
        assert_eq!(annotation.phonetic, "");
        assert_eq!(annotation.span(&lines[0]), Some("translation"));
    }
}
