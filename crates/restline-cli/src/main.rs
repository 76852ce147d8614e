//! restline - extract LMS datasets and drive remote dataset refreshes
//!
//! `extract` pulls one dataset from the LMS REST API into the output folder;
//! `refresh` triggers a dataset refresh and polls it to completion.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "restline")]
#[command(about = "Paginated REST extraction and refresh polling")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./restline.toml or ~/.config/restline/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Extract one dataset from the LMS API
    Extract(cmd::extract::ExtractArgs),
    /// Trigger a dataset refresh and wait for it to finish
    Refresh(cmd::refresh::RefreshArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(restline_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug; progress lines show activity
    //   non-TTY: info unless --debug; logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    restline_core::init_logging(quiet, cli.debug, multi);

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Command::Extract(args) => cmd::extract::run(args, &config, &progress),
        Command::Refresh(args) => cmd::refresh::run(args, &config, &progress),
        Command::Config => {
            print_config(&config);
            Ok(())
        }
    }
}

fn configured(value: &Option<String>) -> &'static str {
    if value.as_deref().is_some_and(|v| !v.is_empty()) {
        "configured"
    } else {
        "not set"
    }
}

fn print_config(config: &Config) {
    use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Setting").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);

    let creds = config.lms_credentials();
    table.add_row(vec!["API base URL", &config.api.base_url]);
    table.add_row(vec!["Token URL", &creds.token_url]);
    table.add_row(vec!["Grant type", creds.grant_type.as_str()]);
    table.add_row(vec!["Client ID", &config.auth.client_id]);
    table.add_row(vec!["Client secret", configured(&config.auth.client_secret)]);
    table.add_row(vec!["Password", configured(&config.auth.password)]);
    table.add_row(vec![
        "Page size",
        &format!(
            "{} (export: {})",
            config.api.page_size, config.api.export_page_size
        ),
    ]);
    table.add_row(vec![
        "Workers",
        &format!("{} (max: {})", config.workers.default, config.workers.max),
    ]);
    table.add_row(vec!["Exclude substring", &config.api.exclude_substring]);
    table.add_row(vec![
        "Output",
        &config
            .output
            .root
            .join(&config.output.destination)
            .display()
            .to_string(),
    ]);
    table.add_row(vec!["Refresh base URL", &config.refresh.base_url]);
    table.add_row(vec![
        "Refresh target",
        &format!(
            "{}/{}",
            config.refresh.workspace_id, config.refresh.dataset_id
        ),
    ]);
    table.add_row(vec![
        "Refresh secret",
        configured(&config.refresh.client_secret),
    ]);
    table.add_row(vec![
        "Poll interval",
        &format!(
            "{}s (timeout: {}s)",
            config.refresh.interval_secs, config.refresh.timeout_secs
        ),
    ]);
    table.add_row(vec![
        "Notifications",
        if config.notify.enabled {
            "enabled"
        } else {
            "disabled"
        },
    ]);

    eprintln!("\n{table}");
}
