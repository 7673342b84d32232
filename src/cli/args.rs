//! CLI surface, grounded on `src/cli/env.rs::CliArgs`'s shape (a flat
//! set of process-level flags parsed once at startup). This binary has
//! no subcommands: every invocation runs the configured benchmark sweep.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Configuration file path (defaults to `config/agent-bench.yaml`,
    /// then `~/.config/agent-bench/config.yaml`).
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log level (ignored if `--debug` is set).
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Force debug-level logging regardless of `--log-level`.
    #[arg(short, long)]
    pub debug: bool,

    /// Metrics server port override (set to 0 to disable). Falls back to
    /// the configured `metrics_port` when absent.
    #[arg(long)]
    pub metrics_port: Option<u16>,

    /// Results output directory override.
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Drive a scripted, in-memory browser instead of launching a real
    /// headless Chromium instance. Useful for dry-running the wiring
    /// against fixtures without a display or network access.
    #[arg(long)]
    pub dry_run: bool,
}
