#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the CARE/DAC ZIP enrichment pipeline.
//!
//! Running with no arguments reads `High_CARE_ZIPs_CA.csv` from the
//! project root, caches boundary data under `data/`, and writes
//! `CARE_DAC_ZIPs_Enriched.csv` next to the input. Every flag only
//! overrides one of those locations.
//!
//! Uses `indicatif-log-bridge` (via [`care_dac_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and download bars never fight for the terminal.

use std::path::PathBuf;
use std::time::Instant;

use care_dac::pipeline::{self, PipelineConfig};
use care_dac::paths;
use care_dac_cli_utils::IndicatifProgress;
use clap::Parser;

#[derive(Parser)]
#[command(
    name = "care_dac",
    about = "Enrich CARE program ZIPs with SB 535 disadvantaged-community and county data"
)]
struct Cli {
    /// Project root holding the CARE input, output and `data/` directory
    /// (defaults to the workspace root)
    #[arg(long)]
    root: Option<PathBuf>,
    /// CARE input CSV (defaults to `<root>/High_CARE_ZIPs_CA.csv`)
    #[arg(long)]
    care_csv: Option<PathBuf>,
    /// Enriched output CSV (defaults to `<root>/CARE_DAC_ZIPs_Enriched.csv`)
    #[arg(long)]
    output: Option<PathBuf>,
    /// Directory for cached boundary shapefiles (defaults to `<root>/data`)
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Re-download boundary archives even if a shapefile is already cached
    #[arg(long)]
    force_download: bool,
}

impl Cli {
    fn into_config(self) -> PipelineConfig {
        let root = self.root.unwrap_or_else(paths::project_root);
        let defaults = PipelineConfig::for_root(&root);

        PipelineConfig {
            data_dir: self.data_dir.unwrap_or(defaults.data_dir),
            care_csv: self.care_csv.unwrap_or(defaults.care_csv),
            output: self.output.unwrap_or(defaults.output),
            force_download: self.force_download,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = care_dac_cli_utils::init_logger();
    let config = Cli::parse().into_config();

    log::debug!("Pipeline config: {config:?}");

    let start = Instant::now();
    let summary = pipeline::run(&config, |id| {
        IndicatifProgress::download_bar(&multi, &format!("Downloading {id}"))
    })
    .await?;

    log::info!(
        "Finished in {:.1}s: {} rows written",
        start.elapsed().as_secs_f64(),
        summary.rows_written
    );

    Ok(())
}
