use std::io::{self, IsTerminal};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dirgrab_core::listing::normalize_origin;
use dirgrab_core::{
    DownloadContext, DownloadEngine, HttpClient, Identity, ListingWalker, LogProgress,
    OutputNameTransform, ProgressReporter, ResponseCache, StripSubstrings, TerminalProgress,
};
use tracing::{debug, info};

use crate::app::{exit_handler, terminal};
use crate::cli::Args;
use crate::config::{self, Settings};
use crate::{ProcessExit, output};

pub(crate) async fn run_dirgrab() -> Result<ProcessExit> {
    let args = Args::parse();

    let no_color = terminal::is_no_color_requested(args.no_color);
    let use_bars = terminal::should_use_progress_bars(
        io::stderr().is_terminal(),
        args.quiet,
        args.no_progress || args.dry_run,
        terminal::is_dumb_terminal(),
    );
    let progress = use_bars.then(|| Arc::new(TerminalProgress::new()));
    terminal::init_tracing(
        terminal::default_log_level(args.quiet, args.verbose),
        no_color,
        progress.as_deref(),
    );
    debug!(?args, "CLI arguments parsed");

    let file_config = config::load_default_file_config()?;
    let settings = Settings::resolve(&args, file_config.as_ref())?;
    debug!(?settings, "settings resolved");

    let origin = normalize_origin(&settings.origin)?;
    let client = Arc::new(
        HttpClient::new_with_timeouts(settings.connect_timeout_secs, settings.read_timeout_secs)
            .context("Failed to build HTTP client")?,
    );
    let mut cache = match settings.cache_file.as_deref() {
        Some(path) => ResponseCache::load(path)
            .await
            .with_context(|| format!("Failed to open listing cache '{}'", path.display()))?,
        None => ResponseCache::in_memory(),
    };

    info!(origin = %origin, "Discovering resources");
    let identifiers = ListingWalker::new(&mut cache, client.as_ref())
        .with_max_depth(settings.max_depth)
        .discover(&origin)
        .await
        .context("Discovery failed")?;
    info!(resources = identifiers.len(), "Found {} resources", identifiers.len());

    if args.dry_run {
        for identifier in &identifiers {
            println!("{identifier}");
        }
        return Ok(ProcessExit::Success);
    }

    tokio::fs::create_dir_all(&settings.output_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create output directory '{}'",
                settings.output_dir.display()
            )
        })?;

    let naming: Arc<dyn OutputNameTransform> = if settings.strip.is_empty() {
        Arc::new(Identity)
    } else {
        Arc::new(StripSubstrings::new(settings.strip.iter().cloned()))
    };
    let reporter: Arc<dyn ProgressReporter> = match progress {
        Some(bars) => bars,
        None => Arc::new(LogProgress::new()),
    };

    let ctx = DownloadContext {
        fetcher: client,
        origin,
        output_dir: settings.output_dir.clone(),
        naming,
        reporter,
    };
    let engine = DownloadEngine::new(settings.workers)?;
    let report = engine.run_all(identifiers, ctx).await;

    output::print_completion_summary(&report, &settings.output_dir, args.quiet);

    Ok(exit_handler::determine_exit_outcome(
        report.completed(),
        report.failed(),
    ))
}
