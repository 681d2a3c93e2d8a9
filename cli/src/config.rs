use anyhow::{Context, Result};
use chatbot_core::config::{get_default_config_file, ClientConfig};

use crate::cli::Args;

/// Layers the client configuration: file, then environment, then flags.
pub fn resolve_config(args: &Args) -> Result<ClientConfig> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => get_default_config_file().context("Failed to locate config directory")?,
    };

    let file = ClientConfig::load_from_file(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;

    Ok(file.merge(&ClientConfig::from_env()).merge(&flag_overrides(args)))
}

fn flag_overrides(args: &Args) -> ClientConfig {
    ClientConfig {
        relay_url: args.relay_url.clone(),
        history_path: args.history_file.clone(),
        reveal_interval_ms: None,
        typing: args.no_typing.then_some(false),
        log_level: args.verbose.then(|| "debug".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn flags_override_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "relay_url = \"http://file/api/chat\"\nreveal_interval_ms = 5\ntyping = true\n",
        )
        .unwrap();

        let args = Args::parse_from([
            "chatbot",
            "--config",
            path.to_str().unwrap(),
            "--relay-url",
            "http://flag/api/chat",
            "--no-typing",
        ]);
        let config = resolve_config(&args).unwrap();

        assert_eq!(config.relay_url(), "http://flag/api/chat");
        assert_eq!(config.reveal_interval_ms(), 5);
        assert!(!config.typing());
    }

    #[test]
    fn absent_flags_keep_file_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "typing = false\n").unwrap();

        let args = Args::parse_from(["chatbot", "--config", path.to_str().unwrap()]);
        let config = resolve_config(&args).unwrap();

        assert!(!config.typing());
        assert!(!args.has_maintenance_action());
    }
}
