use anyhow::{Context, Result};
use clap::Parser;
use skim::SkimConfig;
use std::path::PathBuf;

const LAYOUT_HELP: &str = "\
The observation directory is expected to hold

    OBS/logs/
    OBS/parsets/
    OBS/results/
    OBS/vds/

with pipeline images under results/, one subdirectory per pipeline run named
after the run start time, e.g. under L2009_13591_8/results/:

    2009-10-13T13:43:09/
    2009-10-13T13:44:49/

Example: skim images for a particular pipeline run of L2009_13591_8

    skim --run=2009-10-13T13:44:49 /pipeline_runtime/jobs/L2009_13591_8";

/// Build a LOFAR Sky Image (HDF5) from the sub-band images of one pipeline run
#[derive(Parser, Debug)]
#[command(name = "skim", version, about, after_help = LAYOUT_HELP)]
struct Cli {
    /// Observation output directory
    observation: PathBuf,

    /// Pipeline run start time (yyyy-mm-ddThh:mm:ss), naming a directory under OBS/results/
    #[arg(long, value_parser = parse_run_label)]
    run: String,
}

fn parse_run_label(label: &str) -> Result<String, String> {
    chrono::NaiveDateTime::parse_from_str(label, "%Y-%m-%dT%H:%M:%S")
        .map(|_| label.to_string())
        .map_err(|e| format!("'{}' is not an ISO 8601 time yyyy-mm-ddThh:mm:ss: {}", label, e))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = SkimConfig::default();
    let summary = skim::skim_observation(&cli.observation, &cli.run, &config)
        .with_context(|| format!("Failed to build sky image for {}", cli.observation.display()))?;

    println!("Processing complete.");
    println!("LOFAR Sky Image file form: {}", summary);
    Ok(())
}
