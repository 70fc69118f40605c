use anyhow::Result;

use crate::cli::args::VocabCommand;
use crate::config::Config;
use crate::remote::models::VocabProgress;
use crate::vocab::entries_for_lines;

pub async fn execute(command: VocabCommand, config: Config) -> Result<()> {
    match command {
        VocabCommand::Sync { video_id } => sync(video_id, &config).await,
        VocabCommand::Mark { vocab_id, status } => {
            let client = super::client(&config)?;
            let progress = VocabProgress {
                user_id: super::user_id(&config)?,
                vocab_id,
                status,
            };
            println!("📝 Marking {} as {}", progress.vocab_id, progress.status.as_str());
            super::remote_call("save vocabulary status", move || client.upsert_vocab_progress(&progress)).await?;
            println!("✅ Saved");
            Ok(())
        }
    }
}

async fn sync(video_id: String, config: &Config) -> Result<()> {
    let client = super::client(config)?;

    let rows = {
        let client = client.clone();
        let id = video_id.clone();
        super::remote_call("fetch subtitles", move || client.fetch_subtitles(&id)).await?
    };
    let entries = entries_for_lines(&rows);
    if entries.is_empty() {
        println!("No annotations on video {}", video_id);
        return Ok(());
    }

    println!("📚 Syncing {} entries from {} lines", entries.len(), rows.len());
    let count = entries.len();
    super::remote_call("save vocabulary", move || client.upsert_vocabulary(&entries)).await?;
    tracing::info!("Synced {} vocabulary entries for video {}", count, video_id);
    println!("✅ Dictionary updated");
    Ok(())
}
