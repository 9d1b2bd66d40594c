use anyhow::{Context, Result, anyhow};
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use coursestats::cache::{DatasetCache, DirectorySource};
use coursestats::engine::{AnalysisRequest, AnalysisResponse};
use coursestats::output;
use log::{error, info};
use serde::Deserialize;
use std::{fs, process};

/// Run a sequence of analysis requests, reusing each course's data between requests
#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Directory with one `<course>.json` file per course
    data_dir: String,
    /// Requests file (JSON): a list of {course, recheck, stats, filters, separation_keys}
    requests: String,
    /// Output file (JSON): one response per request
    outfile: String,
    /// Produce compact JSON files
    #[arg(long)]
    compact: bool,
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

#[derive(Deserialize)]
struct BatchRequest {
    course: String,
    #[serde(default)]
    recheck: bool,
    #[serde(flatten)]
    request: AnalysisRequest,
}

fn process(args: &Args) -> Result<()> {
    let data = fs::read_to_string(&args.requests)
        .with_context(|| format!("reading {}", args.requests))?;
    let requests: Vec<BatchRequest> =
        serde_json::from_str(&data).with_context(|| format!("parsing {}", args.requests))?;
    info!(target: "coursestats", "requests: {}", requests.len());
    let mut cache = DatasetCache::new(DirectorySource::new(&args.data_dir));
    let mut responses: Vec<AnalysisResponse> = vec![];
    for (i, r) in requests.iter().enumerate() {
        let response = if r.recheck {
            cache.recheck(&r.course, &r.request)
        } else {
            cache.analyze(&r.course, &r.request)
        };
        let response = response.map_err(|e| anyhow!("request {} ({}): {e}", i + 1, r.course))?;
        responses.push(response);
    }
    info!(
        target: "coursestats",
        "{} requests answered with {} fetches",
        responses.len(),
        cache.fetches()
    );
    output::write_json(&args.outfile, &responses, args.compact)
        .map_err(|e| anyhow!("writing {}: {e}", args.outfile))?;
    Ok(())
}

fn main() {
    let args = Args::parse();
    pretty_env_logger::formatted_timed_builder()
        .filter_level(args.verbose.log_level_filter())
        .init();
    if let Err(e) = process(&args) {
        error!(target: "coursestats", "{e:#}");
        process::exit(1);
    }
}
