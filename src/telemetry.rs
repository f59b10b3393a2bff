use crate::config::Config;
use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use tracing_subscriber::EnvFilter;

/// Initialize logging
///
/// Reports go to stdout, so console logging writes to stderr. With telemetry
/// enabled, events are appended to `log_path` instead. `RUST_LOG` overrides
/// the default `info` level.
pub fn init(enabled: bool, log_path: &str) -> Result<()> {
    let filter = env_filter();

    if !enabled {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
        return Ok(());
    }

    let expanded_path = Config::expand_path(log_path)?;

    if let Some(parent) = expanded_path.parent() {
        fs::create_dir_all(parent).context("failed to create log directory")?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&expanded_path)
        .context("failed to open log file")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(file)
        .with_target(false)
        .with_ansi(false)
        .init();

    tracing::info!("telemetry initialized: {}", expanded_path.display());

    Ok(())
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_builds() {
        // Either RUST_LOG or the "info" fallback must yield a usable filter
        let filter = env_filter();
        assert!(!filter.to_string().is_empty());
    }

    #[test]
    #[ignore] // Requires global tracing subscriber initialization
    fn test_init_with_telemetry_disabled() {
        init(false, "").unwrap();
        tracing::info!("console logging works");
    }

    #[test]
    #[ignore] // Requires filesystem access and global tracing subscriber initialization
    fn test_init_creates_log_file() {
        let path = std::env::temp_dir()
            .join("whisper_vocab_telemetry_test")
            .join("vocab.log");
        init(true, path.to_str().unwrap()).unwrap();
        assert!(path.exists());
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
