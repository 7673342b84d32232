//! Process bootstrap helpers, grounded on `src/cli/runtime.rs`'s
//! `load_local_env_overrides`/`init_logging` pair.

use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// When set, short-circuits tracing/metrics-server bootstrap so a
/// dry-run invocation (e.g. from an outer test harness) never binds a
/// port or installs a process-wide subscriber.
pub const SKIP_BOOTSTRAP_ENV: &str = "SKIP_APP_BOOTSTRAP";

pub fn bootstrap_skipped() -> bool {
    env::var(SKIP_BOOTSTRAP_ENV).is_ok()
}

/// Reads `config/local.env` into the process environment for any key not
/// already set, so `AGENT_BENCH_*` overrides can live in a file outside
/// version control. Absent file or unreadable lines are non-fatal.
pub fn load_local_env_overrides() {
    let path = Path::new("config/local.env");
    if !path.exists() {
        return;
    }

    match fs::read_to_string(path) {
        Ok(contents) => {
            for (idx, raw_line) in contents.lines().enumerate() {
                let line = raw_line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                let Some((key, value)) = line.split_once('=') else {
                    warn!(line = idx + 1, "invalid local.env entry; skipping");
                    continue;
                };
                let key = key.trim();
                if key.is_empty() || env::var(key).is_ok() {
                    continue;
                }
                env::set_var(key, unescape_value(value.trim()));
            }
            info!(path = %path.display(), "loaded environment overrides from local.env");
        }
        Err(err) => {
            warn!(path = %path.display(), ?err, "failed to read local.env overrides");
        }
    }
}

pub fn init_logging(level: &str, debug: bool) -> Result<()> {
    if bootstrap_skipped() {
        return Ok(());
    }

    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("invalid log level")?
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

fn unescape_value(value: &str) -> String {
    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        let inner = &value[1..value.len() - 1];
        inner
            .replace("\\\"", "\"")
            .replace("\\n", "\n")
            .replace("\\r", "\r")
            .replace("\\t", "\t")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescape_value_strips_quotes_and_escapes() {
        assert_eq!(unescape_value("\"a\\nb\""), "a\nb");
        assert_eq!(unescape_value("plain"), "plain");
    }

    #[test]
    fn bootstrap_skipped_reflects_env_var() {
        env::remove_var(SKIP_BOOTSTRAP_ENV);
        assert!(!bootstrap_skipped());
        env::set_var(SKIP_BOOTSTRAP_ENV, "1");
        assert!(bootstrap_skipped());
        env::remove_var(SKIP_BOOTSTRAP_ENV);
    }
}
