pub mod line;
pub mod srt;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use line::{normalize_lines, SubtitleLine};

/// Load subtitle lines from a JSON rows file or a bilingual SRT file and
/// normalize them.
pub fn load_file(path: &Path) -> Result<Vec<SubtitleLine>> {
    let lines = if is_json(path) {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str::<Vec<SubtitleLine>>(&content)
            .with_context(|| format!("Invalid subtitle rows in {}", path.display()))?
    } else {
        srt::parse_srt(path)?
    };

    let count = lines.len();
    let lines = normalize_lines(lines);
    tracing::info!(
        "Loaded {} subtitle lines from {} ({} dropped)",
        lines.len(),
        path.display(),
        count - lines.len()
    );
    Ok(lines)
}

/// Write lines as JSON rows, preserving seek offsets and annotations
pub fn save_json(path: &Path, lines: &[SubtitleLine]) -> Result<()> {
    let content = serde_json::to_string_pretty(lines).context("Failed to encode subtitles")?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Where offset edits of `path` are written: JSON files in place, SRT files
/// to a `.json` sidecar next to them
pub fn offsets_path(path: &Path) -> PathBuf {
    if is_json(path) {
        path.to_path_buf()
    } else {
        path.with_extension("json")
    }
}

pub fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}
