use anyhow::Result;

use crate::cli::args::{LinesArgs, ResolveArgs};
use crate::config::Config;
use crate::playback::seek::resolve_seek_at;
use crate::subtitle;
use crate::subtitle::srt::format_time;

pub fn execute(args: LinesArgs, config: &Config) -> Result<()> {
    if !args.subs.exists() {
        anyhow::bail!("Subtitle file not found: {}", args.subs.display());
    }
    let lines = subtitle::load_file(&args.subs)?;

    println!("{:>5}  {:<12}  {:<12}  {:<12}  TEXT", "SEQ", "START", "END", "SEEK");
    for (index, line) in lines.iter().enumerate() {
        let seek = resolve_seek_at(&lines, index, &config.seek).unwrap_or(line.start_time);
        let marker = if line.has_offset() { "*" } else { " " };
        println!(
            "{:>5}  {}  {}  {}{} {}",
            line.sequence,
            format_time(line.start_time),
            format_time(line.end_time),
            format_time(seek),
            marker,
            line.text_en
        );
    }
    println!("\n{} lines (* = manual seek offset)", lines.len());

    if let Some(export) = &args.export {
        if subtitle::is_json(export) {
            subtitle::save_json(export, &lines)?;
        } else {
            subtitle::srt::save_srt(export, &lines)?;
        }
        println!("✅ Exported to {}", export.display());
    }
    Ok(())
}

pub fn resolve(args: ResolveArgs, config: &Config) -> Result<()> {
    if !args.subs.exists() {
        anyhow::bail!("Subtitle file not found: {}", args.subs.display());
    }
    let lines = subtitle::load_file(&args.subs)?;

    let Some(index) = lines.iter().position(|line| line.sequence == args.sequence) else {
        anyhow::bail!("No line with sequence {} in {}", args.sequence, args.subs.display());
    };
    let seek = resolve_seek_at(&lines, index, &config.seek).unwrap_or(lines[index].start_time);
    println!("{:.3}", seek);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_resolve_unknown_sequence_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subs.srt");
        std::fs::write(&path, "1\n00:00:01,000 --> 00:00:02,000\nHello\n").unwrap();

        let ok = resolve(
            ResolveArgs {
                subs: path.clone(),
                sequence: 1,
            },
            &Config::default(),
        );
        assert!(ok.is_ok());

        let missing = resolve(ResolveArgs { subs: path, sequence: 7 }, &Config::default());
        assert!(missing.is_err());
    }

    #[test]
    fn test_export_normalized_lines() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.srt");
        std::fs::write(
            &input,
            "2\n00:00:03,000 --> 00:00:04,000\nSecond\n\n1\n00:00:01,000 --> 00:00:02,000\nFirst\n第一\n",
        )
        .unwrap();

        let export = dir.path().join("out.json");
        let args = LinesArgs {
            subs: input,
            export: Some(export.clone()),
        };
        execute(args, &Config::default()).unwrap();

        let exported = subtitle::load_file(&export).unwrap();
        assert_eq!(exported.len(), 2);
        assert_eq!(exported[0].text_en, "First");
        assert_eq!(exported[0].text_zh, "第一");
    }

    #[test]
    fn test_missing_file() {
        let args = LinesArgs {
            subs: PathBuf::from("/nonexistent/subs.srt"),
            export: None,
        };
        assert!(execute(args, &Config::default()).is_err());
    }
}
