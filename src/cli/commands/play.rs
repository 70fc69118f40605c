use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::app::Source;
use crate::cli::args::PlayArgs;
use crate::config::Config;
use crate::remote::models::VideoRecord;
use crate::subtitle;
use crate::subtitle::line::{normalize_lines, SubtitleLine};

/// Everything the player needs before it takes over the terminal
struct Session {
    title: String,
    media: String,
    lines: Vec<SubtitleLine>,
    source: Source,
    resume: Option<f64>,
}

pub async fn execute(args: PlayArgs, config: Config) -> Result<()> {
    let session = match &args.video_id {
        Some(video_id) => load_remote(&args, video_id, &config).await?,
        None => load_local(&args)?,
    };
    run_player(session, &args, &config)
}

fn load_local(args: &PlayArgs) -> Result<Session> {
    let Some(video) = &args.video else {
        anyhow::bail!("Give a video file, or --video-id to play from the service");
    };

    let subs = match &args.subs {
        Some(subs) => subs.clone(),
        None => find_subtitles(Path::new(video))
            .with_context(|| format!("No subtitles found next to {}; pass --subs", video))?,
    };
    if !subs.exists() {
        anyhow::bail!("Subtitle file not found: {}", subs.display());
    }

    let lines = subtitle::load_file(&subs)?;
    Ok(Session {
        title: title_from_path(video),
        media: video.clone(),
        lines,
        source: Source::File(subs),
        resume: None,
    })
}

async fn load_remote(args: &PlayArgs, video_id: &str, config: &Config) -> Result<Session> {
    let client = super::client(config)?;

    let video: VideoRecord = {
        let client = client.clone();
        let id = video_id.to_string();
        super::remote_call("fetch video", move || client.fetch_video(&id)).await?
    };

    // A local subtitle file takes precedence over the stored lines
    let (lines, source) = match &args.subs {
        Some(subs) => (subtitle::load_file(subs)?, Source::File(subs.clone())),
        None => {
            let client = client.clone();
            let id = video_id.to_string();
            let rows = super::remote_call("fetch subtitles", move || client.fetch_subtitles(&id)).await?;
            (
                normalize_lines(rows),
                Source::Remote {
                    video_id: video_id.to_string(),
                },
            )
        }
    };

    let resume = if config.remote.user_id.is_empty() {
        None
    } else {
        let client = client.clone();
        let user = config.remote.user_id.clone();
        let id = video_id.to_string();
        match super::remote_call("fetch watch progress", move || client.fetch_watch_progress(&user, &id)).await {
            Ok(progress) => progress.map(|p| p.progress_seconds).filter(|p| *p > 0.0),
            // Resume is a convenience; start from the top instead
            Err(e) => {
                tracing::warn!("{:#}", e);
                None
            }
        }
    };

    let title = if video.title.is_empty() {
        video.id.clone()
    } else {
        video.title.clone()
    };
    Ok(Session {
        title,
        media: args.video.clone().unwrap_or(video.video_url),
        lines,
        source,
        resume,
    })
}

#[cfg(unix)]
fn run_player(session: Session, args: &PlayArgs, config: &Config) -> Result<()> {
    use crate::app::App;
    use crate::offsets::OffsetWorker;
    use crate::playback::mpv::MpvBackend;
    use crate::progress::{ProgressPersister, ProgressWorker};
    use crossterm::{
        event::{EnableFocusChange, EnableMouseCapture},
        execute,
        terminal::{enable_raw_mode, EnterAlternateScreen},
    };
    use ratatui::prelude::*;
    use std::io;
    use std::panic;
    use std::sync::mpsc;

    println!("🎬 Opening {} ({} lines)", session.title, session.lines.len());
    if let Some(resume) = session.resume {
        println!("⏩ Resuming at {}", subtitle::srt::format_time(resume));
    }

    let (tx, rx) = mpsc::channel();
    let backend = MpvBackend::launch(&config.player.mpv_path, &session.media, session.resume, tx)
        .context("Failed to start the video player")?;

    let remote_video = match &session.source {
        Source::Remote { video_id } => Some(video_id.clone()),
        Source::File(_) => None,
    };
    let mut app = App::new(session.title, session.lines, session.source, backend, rx, config);

    if config.remote.is_configured() {
        let client = super::client(config)?;
        if let (Some(video_id), false) = (&args.video_id, config.remote.user_id.is_empty()) {
            let persister =
                ProgressPersister::new(client.clone(), config.remote.user_id.clone(), video_id.clone(), &config.progress);
            app = app.with_progress(ProgressWorker::spawn(persister));
        }
        if let Some(video_id) = remote_video {
            app = app.with_offsets(OffsetWorker::spawn(client, video_id));
        }
    }

    // Setup panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        original_hook(panic_info);
    }));

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture, EnableFocusChange)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = app.run(&mut terminal);

    restore_terminal()?;

    result
}

#[cfg(unix)]
fn restore_terminal() -> Result<()> {
    use crossterm::{
        event::{DisableFocusChange, DisableMouseCapture},
        execute,
        terminal::{disable_raw_mode, LeaveAlternateScreen},
    };

    disable_raw_mode()?;
    execute!(std::io::stdout(), LeaveAlternateScreen, DisableMouseCapture, DisableFocusChange)?;
    Ok(())
}

#[cfg(not(unix))]
fn run_player(_session: Session, _args: &PlayArgs, _config: &Config) -> Result<()> {
    anyhow::bail!("The player drives mpv over a Unix socket and is only available on Unix")
}

/// `movie.mp4` -> `movie.json` or `movie.srt`, whichever exists first
fn find_subtitles(video: &Path) -> Option<PathBuf> {
    ["json", "srt"]
        .iter()
        .map(|ext| video.with_extension(ext))
        .find(|candidate| candidate.exists())
}

fn title_from_path(media: &str) -> String {
    Path::new(media)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| media.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_subtitles_prefers_json_rows() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("lesson.mp4");
        assert_eq!(find_subtitles(&video), None);

        std::fs::write(dir.path().join("lesson.srt"), "").unwrap();
        assert_eq!(find_subtitles(&video), Some(dir.path().join("lesson.srt")));

        std::fs::write(dir.path().join("lesson.json"), "[]").unwrap();
        assert_eq!(find_subtitles(&video), Some(dir.path().join("lesson.json")));
    }

    #[test]
    fn test_title_from_path() {
        assert_eq!(title_from_path("/videos/Friends S01E01.mkv"), "Friends S01E01");
        assert_eq!(title_from_path("https://cdn.test/v/clip.mp4"), "clip");
    }

    #[test]
    fn test_local_play_needs_a_video() {
        let args = PlayArgs {
            video: None,
            subs: None,
            video_id: None,
        };
        assert!(load_local(&args).is_err());
    }
}
