pub mod config;
pub mod lines;
pub mod play;
pub mod record;
pub mod vocab;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::error::RemoteError;
use crate::remote::RestClient;

/// Run a blocking remote call off the runtime; Ctrl-C abandons it.
pub async fn remote_call<T, F>(what: &str, call: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, RemoteError> + Send + 'static,
{
    tokio::select! {
        joined = tokio::task::spawn_blocking(call) => {
            let result = joined.context("Remote task panicked")?;
            result.with_context(|| format!("Failed to {}", what))
        }
        _ = tokio::signal::ctrl_c() => {
            anyhow::bail!("Cancelled while trying to {}", what)
        }
    }
}

pub fn client(config: &Config) -> Result<RestClient> {
    RestClient::new(&config.remote)
        .context("Set remote.url and remote.anon_key in the config, or SUBLEARN_URL and SUBLEARN_ANON_KEY")
}

pub fn user_id(config: &Config) -> Result<String> {
    if config.remote.user_id.is_empty() {
        anyhow::bail!("No user id: set remote.user_id in the config or SUBLEARN_USER_ID");
    }
    Ok(config.remote.user_id.clone())
}
