//! Extract subcommand - pull one LMS dataset into the output folder

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use restline_core::{LocalObjectSink, ReqwestTransport, SharedProgress, fmt_num};
use restline_lms::ExtractionEngine;

use super::{notify_outcome, print_summary};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Dataset to extract (user, courses, enrollments, reports)
    pub dataset: String,

    /// Number of concurrent page workers
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Local root directory for delivered files
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Folder below the output root
    #[arg(long)]
    pub destination: Option<String>,

    /// Report name for the `reports` dataset
    #[arg(long)]
    pub report_name: Option<String>,
}

pub fn run(args: ExtractArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let result = extract(&args, config, progress);
    notify_outcome(
        &config.notify,
        &format!("lms_{}", args.dataset),
        "extract",
        &result,
    );
    result
}

/// Unknown dataset names are passed through; the engine rejects them after
/// authenticating, like any other run failure.
fn extract(args: &ExtractArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let mut lms = config.lms(&args.dataset, args.workers);
    if let Some(dest) = &args.destination {
        lms.destination = dest.clone();
    }
    if let Some(name) = &args.report_name {
        lms.report_name = name.clone();
    }
    if lms.base_url.is_empty() {
        anyhow::bail!("api.base_url is not configured");
    }
    let root = args
        .output
        .clone()
        .unwrap_or_else(|| config.output.root.clone());

    let label = args.dataset.as_str();
    log::info!("Extracting {label}");
    log::info!("  Output: {}", root.display());
    log::info!("  Workers: {}", lms.workers);

    let transport = ReqwestTransport::new();
    let sink = LocalObjectSink::new(root.clone());
    let pb = progress.stage_line(label);
    let summary = ExtractionEngine::new(&lms, &transport, &sink)
        .with_progress(pb)
        .run()
        .with_context(|| format!("{label} extraction failed"))?;

    print_summary(
        "Extract",
        &[
            ("Dataset", summary.dataset.to_string()),
            ("Records", fmt_num(summary.records)),
            ("API calls", summary.api_calls.to_string()),
            (
                "Delivered",
                summary
                    .delivered_key
                    .as_deref()
                    .map_or_else(|| "-".to_string(), |k| root.join(k).display().to_string()),
            ),
            ("Time", format!("{:.1}s", summary.elapsed.as_secs_f64())),
        ],
    );
    Ok(())
}
