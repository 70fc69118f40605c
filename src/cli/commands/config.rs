use anyhow::{Context, Result};
use std::path::Path;

use crate::cli::args::{ConfigArgs, RemoteArgs};
use crate::config::{Config, DEFAULT_CONFIG};

pub fn execute(args: &ConfigArgs, config_path: &Path, remote: &RemoteArgs) -> Result<()> {
    if args.path {
        println!("Configuration file path:");
        println!("  {}", config_path.display());
        return Ok(());
    }

    if args.init {
        if config_path.exists() {
            anyhow::bail!("Configuration file already exists: {}", config_path.display());
        }
        println!("Initializing configuration file...");
        create_default_config(config_path)?;
        println!("✅ Configuration file created: {}", config_path.display());
        println!("\nYou can now edit this file to customize default settings.");
        return Ok(());
    }

    if args.show {
        if !config_path.exists() {
            println!("  No configuration file found, showing defaults.");
            println!("  Run 'sublearn-tui config --init' to create one.\n");
        }
        let mut config = Config::load(config_path)?;
        remote.apply(&mut config.remote);
        println!("{}", render(&config)?);
        return Ok(());
    }

    // Default: show help
    println!("Configuration management");
    println!("\nOptions:");
    println!("  --show   Show current configuration");
    println!("  --init   Initialize default configuration file");
    println!("  --path   Show configuration file path");

    Ok(())
}

/// Effective configuration as TOML, with secrets masked
fn render(config: &Config) -> Result<String> {
    let mut shown = config.clone();
    for secret in [&mut shown.remote.anon_key, &mut shown.remote.access_token] {
        if !secret.is_empty() {
            *secret = "********".to_string();
        }
    }
    toml::to_string_pretty(&shown).context("Failed to render configuration")
}

fn create_default_config(path: &Path) -> Result<()> {
    // Create parent directory if it doesn't exist
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let args = ConfigArgs {
            show: false,
            init: true,
            path: false,
        };

        execute(&args, &path, &RemoteArgs::default()).unwrap();
        assert!(Config::load(&path).is_ok());

        // A second init must not clobber user edits
        assert!(execute(&args, &path, &RemoteArgs::default()).is_err());
    }

    #[test]
    fn test_render_masks_secrets() {
        let mut config = Config::default();
        config.remote.anon_key = "public-key".to_string();
        let text = render(&config).unwrap();
        assert!(!text.contains("public-key"));
        assert!(text.contains("[seek]"));
    }
}
