//! CLI argument definitions using clap derive macros.
//!
//! Options that can also come from the config file are `Option`s here so the
//! merge can tell an explicit flag from a default.

use std::path::PathBuf;

use clap::Parser;

/// Mirror a web server directory listing to a local directory.
///
/// Dirgrab walks an auto-generated index page and every nested listing below
/// it, then downloads each discovered file concurrently. Files that already
/// exist locally are skipped, so an interrupted run can simply be repeated.
#[derive(Parser, Debug)]
#[command(name = "dirgrab")]
#[command(author, version, about)]
pub struct Args {
    /// URL of the top-level listing (may also be set in the config file)
    #[arg(value_name = "ORIGIN")]
    pub origin: Option<String>,

    /// Directory receiving downloaded files [default: output]
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Listing cache file [default: html-cache.json]
    #[arg(long, value_name = "FILE")]
    pub cache_file: Option<PathBuf>,

    /// Do not read or write the listing cache file
    #[arg(long)]
    pub no_cache: bool,

    /// Maximum concurrent downloads (1-64) [default: 3]
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=64))]
    pub workers: Option<u8>,

    /// Maximum listing depth below the origin [default: 32]
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Remove this substring from output file names (repeatable)
    #[arg(long, value_name = "TEXT")]
    pub strip: Vec<String>,

    /// List discovered resources and exit without downloading
    #[arg(long)]
    pub dry_run: bool,

    /// Disable progress bars (log each transfer instead)
    #[arg(long)]
    pub no_progress: bool,

    /// Disable colored log output
    #[arg(long)]
    pub no_color: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}
