use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use crate::remote::models::VocabEntry;
use crate::subtitle::line::{Annotation, AnnotationKind, SubtitleLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VocabStatus {
    Mastered,
    Familiar,
    Unknown,
}

impl VocabStatus {
    pub fn as_str(&self) -> &str {
        match self {
            VocabStatus::Mastered => "mastered",
            VocabStatus::Familiar => "familiar",
            VocabStatus::Unknown => "unknown",
        }
    }
}

impl FromStr for VocabStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mastered" => Ok(VocabStatus::Mastered),
            "familiar" => Ok(VocabStatus::Familiar),
            "unknown" => Ok(VocabStatus::Unknown),
            other => Err(format!("unknown vocabulary status: {}", other)),
        }
    }
}

/// Dictionary key for a word or phrase: lowercase, single-spaced, without
/// surrounding punctuation (apostrophes are kept).
pub fn normalize_text(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    collapsed
        .trim_matches(|c: char| !c.is_alphanumeric() && c != '\'' && c != '’')
        .to_string()
}

fn entry_from(annotation: &Annotation, line: &SubtitleLine) -> Option<VocabEntry> {
    let text = if annotation.text.trim().is_empty() {
        annotation.span(line)?.to_string()
    } else {
        annotation.text.trim().to_string()
    };
    let normalized_text = normalize_text(&text);
    if normalized_text.is_empty() {
        return None;
    }

    let helper_sentence = if annotation.helper_sentence.is_empty() {
        line.text_en.clone()
    } else {
        annotation.helper_sentence.clone()
    };

    Some(VocabEntry {
        normalized_text,
        kind: annotation.kind,
        text,
        phonetic: annotation.phonetic.clone(),
        meaning: annotation.meaning.clone(),
        helper_sentence,
    })
}

/// Collect dictionary entries from every annotation, one per
/// `(normalized_text, type)`. Later duplicates only fill empty fields.
pub fn entries_for_lines(lines: &[SubtitleLine]) -> Vec<VocabEntry> {
    let mut order: Vec<(String, AnnotationKind)> = Vec::new();
    let mut entries: HashMap<(String, AnnotationKind), VocabEntry> = HashMap::new();

    for line in lines {
        for annotation in &line.annotations {
            let Some(entry) = entry_from(annotation, line) else {
                tracing::debug!("Skipping empty annotation {} on line {}", annotation.id, line.sequence);
                continue;
            };
            let key = (entry.normalized_text.clone(), entry.kind);
            match entries.get_mut(&key) {
                Some(existing) => {
                    if existing.phonetic.is_empty() {
                        existing.phonetic = entry.phonetic;
                    }
                    if existing.meaning.is_empty() {
                        existing.meaning = entry.meaning;
                    }
                }
                None => {
                    order.push(key.clone());
                    entries.insert(key, entry);
                }
            }
        }
    }

    order
        .into_iter()
        .filter_map(|key| entries.remove(&key))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotation(kind: AnnotationKind, text: &str, start: usize, end: usize, meaning: &str) -> Annotation {
        Annotation {
            id: format!("{}-{}", start, end),
            kind,
            text: text.to_string(),
            start,
            end,
            phonetic: String::new(),
            meaning: meaning.to_string(),
            helper_sentence: String::new(),
        }
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  Break   the Ice! "), "break the ice");
        assert_eq!(normalize_text("\"Don't\","), "don't");
        assert_eq!(normalize_text("..."), "");
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("Mastered".parse::<VocabStatus>(), Ok(VocabStatus::Mastered));
        assert_eq!(" familiar ".parse::<VocabStatus>(), Ok(VocabStatus::Familiar));
        assert!("learned".parse::<VocabStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&VocabStatus::Unknown).unwrap(),
            "\"unknown\""
        );
    }

    #[test]
    fn test_entries_deduplicate_by_text_and_kind() {
        let mut first = SubtitleLine::new(1, 0.0, 2.0, "Let's break the ice.");
        first.annotations = vec![annotation(AnnotationKind::Phrase, "break the ice", 6, 19, "")];

        let mut second = SubtitleLine::new(2, 2.0, 4.0, "Break the ice, then.");
        second.annotations = vec![
            annotation(AnnotationKind::Phrase, "Break the ice", 0, 13, "打破僵局"),
            annotation(AnnotationKind::Word, "ice", 10, 13, "冰"),
        ];

        let entries = entries_for_lines(&[first, second]);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].normalized_text, "break the ice");
        assert_eq!(entries[0].text, "break the ice");
        assert_eq!(entries[0].meaning, "打破僵局");
        assert_eq!(entries[0].helper_sentence, "Let's break the ice.");
        assert_eq!(entries[1].kind, AnnotationKind::Word);
    }

    #[test]
    fn test_entry_falls_back_to_span_text() {
        let mut line = SubtitleLine::new(1, 0.0, 2.0, "Hello world");
        line.annotations = vec![annotation(AnnotationKind::Word, "", 6, 11, "世界")];

        let entries = entries_for_lines(&[line]);
        assert_eq!(entries[0].text, "world");
        assert_eq!(entries[0].normalized_text, "world");
    }
}
