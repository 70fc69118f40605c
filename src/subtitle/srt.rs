use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::line::SubtitleLine;

/// Format time in SRT format: HH:MM:SS,mmm
pub fn format_time(seconds: f64) -> String {
    let ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let secs = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Parse time from SRT format (HH:MM:SS,mmm) into seconds
pub fn parse_time(s: &str) -> Result<f64> {
    let parts: Vec<&str> = s.split([':', ',', '.']).collect();
    if parts.len() != 4 {
        anyhow::bail!("Invalid time format: {}", s);
    }

    let hours: u64 = parts[0].parse().context("Invalid hours")?;
    let minutes: u64 = parts[1].parse().context("Invalid minutes")?;
    let seconds: u64 = parts[2].parse().context("Invalid seconds")?;
    let millis: u64 = parts[3].parse().context("Invalid milliseconds")?;

    let ms = hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis;
    Ok(ms as f64 / 1000.0)
}

/// Parse a bilingual SRT file. The first text line of each cue is English,
/// any further lines are joined as the Chinese translation.
pub fn parse_srt(path: &Path) -> Result<Vec<SubtitleLine>> {
    let content = fs::read_to_string(path).context("Failed to read SRT file")?;
    parse_srt_string(&content)
}

pub fn parse_srt_string(content: &str) -> Result<Vec<SubtitleLine>> {
    let content = content.trim_start_matches('\u{feff}');
    let mut subtitles = Vec::new();
    let mut lines = content.lines().peekable();

    while lines.peek().is_some() {
        // Skip empty lines
        while lines.peek().map(|l| l.trim().is_empty()).unwrap_or(false) {
            lines.next();
        }

        let index_line = match lines.next() {
            Some(l) if !l.trim().is_empty() => l,
            _ => break,
        };
        let sequence: i64 = index_line
            .trim()
            .parse()
            .with_context(|| format!("Invalid subtitle index: {}", index_line))?;

        let time_line = lines.next().context("Expected time range")?;
        let (start, end) = time_line
            .split_once("-->")
            .with_context(|| format!("Invalid time range: {}", time_line))?;
        let start_time = parse_time(start.trim())?;
        let end_time = parse_time(end.trim())?;

        let mut text_lines = Vec::new();
        while let Some(line) = lines.next_if(|l| !l.trim().is_empty()) {
            text_lines.push(line.trim());
        }

        let mut subtitle = SubtitleLine::new(
            sequence,
            start_time,
            end_time,
            text_lines.first().copied().unwrap_or_default(),
        );
        if text_lines.len() > 1 {
            subtitle.text_zh = text_lines[1..].join(" ");
        }
        subtitles.push(subtitle);
    }

    Ok(subtitles)
}

/// Convert a line to an SRT cue
pub fn to_srt(line: &SubtitleLine) -> String {
    let mut cue = format!(
        "{}\n{} --> {}\n{}\n",
        line.sequence,
        format_time(line.start_time),
        format_time(line.end_time),
        line.text_en
    );
    if !line.text_zh.is_empty() {
        cue.push_str(&line.text_zh);
        cue.push('\n');
    }
    cue
}

pub fn save_srt(path: &Path, subtitles: &[SubtitleLine]) -> Result<()> {
    let content: String = subtitles.iter().map(to_srt).collect::<Vec<_>>().join("\n");

    fs::write(path, content).context("Failed to write SRT file")?;
    Ok(())
}
