use anyhow::{Context, Result};
use std::path::Path;

use crate::cli::args::RecordArgs;
use crate::config::Config;
use crate::remote::client::{audio_content_type, RecordingUpload};

pub async fn execute(args: RecordArgs, config: Config) -> Result<()> {
    if !args.audio.exists() {
        anyhow::bail!("Audio file not found: {}", args.audio.display());
    }

    let client = super::client(&config)?;
    let user_id = super::user_id(&config)?;
    let bytes = std::fs::read(&args.audio)
        .with_context(|| format!("Failed to read {}", args.audio.display()))?;
    if bytes.is_empty() {
        anyhow::bail!("Recording is empty: {}", args.audio.display());
    }

    let extension = audio_extension(&args.audio);
    println!(
        "🎙️  Uploading {} for line {} of video {}",
        args.audio.display(),
        args.sequence,
        args.video_id
    );

    let bucket = config.remote.recordings_bucket.clone();
    let recording = super::remote_call("upload recording", move || {
        client.upload_recording(&RecordingUpload {
            bucket: &bucket,
            user_id: &user_id,
            video_id: &args.video_id,
            sequence: args.sequence,
            bytes: &bytes,
            extension: &extension,
            content_type: audio_content_type(&extension),
        })
    })
    .await?;

    println!("✅ Uploaded: {}", recording.audio_url);
    Ok(())
}

fn audio_extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "webm".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_extension() {
        assert_eq!(audio_extension(Path::new("take1.MP3")), "mp3");
        assert_eq!(audio_extension(Path::new("take1")), "webm");
    }
}
