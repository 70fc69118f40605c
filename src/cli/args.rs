use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::RemoteConfig;
use crate::vocab::VocabStatus;

#[derive(Parser, Debug)]
#[command(name = "sublearn-tui")]
#[command(version = "0.1.0")]
#[command(about = "Practice English with bilingual subtitles: smart seek, line loops and progress sync", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase output verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use custom config file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub remote: RemoteArgs,
}

/// Backend credentials; these override `[remote]` in the config file
#[derive(Args, Debug, Default)]
pub struct RemoteArgs {
    /// Base URL of the subtitle/progress service
    #[arg(long, global = true, env = "SUBLEARN_URL", value_name = "URL")]
    pub url: Option<String>,

    /// Public API key sent with every request
    #[arg(long, global = true, env = "SUBLEARN_ANON_KEY", hide_env_values = true)]
    pub anon_key: Option<String>,

    /// Access token of the signed-in user
    #[arg(long, global = true, env = "SUBLEARN_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Id of the signed-in user (enables progress sync)
    #[arg(long, global = true, env = "SUBLEARN_USER_ID")]
    pub user_id: Option<String>,
}

impl RemoteArgs {
    pub fn apply(&self, remote: &mut RemoteConfig) {
        let overrides = [
            (&self.url, &mut remote.url),
            (&self.anon_key, &mut remote.anon_key),
            (&self.access_token, &mut remote.access_token),
            (&self.user_id, &mut remote.user_id),
        ];
        for (value, field) in overrides {
            if let Some(value) = value {
                *field = value.clone();
            }
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open the player for a video
    Play(PlayArgs),

    /// List subtitle lines with their smart-seek times
    Lines(LinesArgs),

    /// Print the smart-seek time for one line
    Resolve(ResolveArgs),

    /// Manage the vocabulary dictionary
    #[command(subcommand)]
    Vocab(VocabCommand),

    /// Upload a shadowing recording for a line
    Record(RecordArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

#[derive(Parser, Debug)]
pub struct PlayArgs {
    /// Video file path or URL (optional with --video-id)
    #[arg(value_name = "VIDEO")]
    pub video: Option<String>,

    /// Subtitle file (.json rows or bilingual .srt)
    #[arg(short, long, value_name = "FILE")]
    pub subs: Option<PathBuf>,

    /// Load subtitles and progress for this video from the service
    #[arg(long, value_name = "ID")]
    pub video_id: Option<String>,
}

#[derive(Parser, Debug)]
pub struct LinesArgs {
    /// Subtitle file (.json rows or bilingual .srt)
    #[arg(value_name = "SUBS")]
    pub subs: PathBuf,

    /// Also write the normalized lines to FILE (.json or .srt)
    #[arg(short, long, value_name = "FILE")]
    pub export: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct ResolveArgs {
    /// Subtitle file (.json rows or bilingual .srt)
    #[arg(value_name = "SUBS")]
    pub subs: PathBuf,

    /// Sequence number of the line
    #[arg(value_name = "SEQUENCE", allow_negative_numbers = true)]
    pub sequence: i64,
}

#[derive(Subcommand, Debug)]
pub enum VocabCommand {
    /// Mirror every annotation of a video into the dictionary
    Sync {
        #[arg(long, value_name = "ID")]
        video_id: String,
    },

    /// Record the signed-in user's status for a dictionary entry
    Mark {
        #[arg(value_name = "VOCAB_ID")]
        vocab_id: String,

        #[arg(value_name = "STATUS")]
        status: VocabStatus,
    },
}

#[derive(Parser, Debug)]
pub struct RecordArgs {
    /// Audio file to upload
    #[arg(value_name = "AUDIO")]
    pub audio: PathBuf,

    #[arg(long, value_name = "ID")]
    pub video_id: String,

    /// Sequence number of the line that was shadowed
    #[arg(long, value_name = "N")]
    pub sequence: i64,
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Show current configuration
    #[arg(long)]
    pub show: bool,

    /// Initialize default configuration file
    #[arg(long)]
    pub init: bool,

    /// Show configuration file path
    #[arg(long)]
    pub path: bool,
}
