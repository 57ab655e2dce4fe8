//! CLI surface (spec.md §6 "Bulk-ingester CLI"), a `clap`-derive option
//! struct in the same shape as the workspace's other CLI layouts.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "krfin-ingest", about = "Resumable bulk ingester over the DART/KIS providers")]
pub struct IngestArgs {
    /// How many companies to crawl, in corp-code master-list order.
    #[arg(long, default_value_t = 5)]
    pub companies: usize,

    /// How many fiscal years back from the current year to fetch.
    #[arg(long, default_value_t = 1)]
    pub years: i64,

    /// Demo database path. Defaults to the per-user config directory.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Clears the demo database before running.
    #[arg(long)]
    pub reset: bool,

    /// Prints checkpoint progress and exits without crawling.
    #[arg(long)]
    pub status: bool,
}
