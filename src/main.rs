mod app;
mod cli;
mod config;
mod error;
mod offsets;
mod playback;
mod progress;
mod remote;
mod subtitle;
mod ui;
mod vocab;

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
