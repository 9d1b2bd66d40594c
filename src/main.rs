use chrono::Local;
use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use coursestats::engine::{self, AnalysisRequest, StatSelection};
use coursestats::errors::{self, Result};
use coursestats::filter::FilterSpec;
use coursestats::grouping::SeparationKey;
use coursestats::input::RawDataset;
use coursestats::names;
use coursestats::output;
use coursestats::period::{Season, Year};
use coursestats::statistic::Statistic;
use itertools::Itertools;
use log::{error, info};
use std::{fs, process};

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Input file (JSON): raw course data, bare or as a service response with `raw_data`
    infile: String,
    /// Output file (JSON)
    outfile: String,
    /// Statistic to calculate (repeatable; default: overall quality, instructor effectiveness, intellectual challenge, workload)
    #[arg(long)]
    stat: Vec<String>,
    /// Earliest year to include
    #[arg(long)]
    min_year: Option<Year>,
    /// Latest year to include
    #[arg(long)]
    max_year: Option<Year>,
    /// Only the last three academic years (explicit --min-year/--max-year take precedence)
    #[arg(long)]
    recent: bool,
    /// Season to include, as a tag (FA) or a name (Fall); repeatable
    #[arg(long)]
    season: Vec<Season>,
    /// Instructor to include, spelled exactly as in the data; repeatable
    #[arg(long)]
    instructor: Vec<String>,
    /// Also include every spelling in the data with the same last name as an --instructor
    #[arg(long)]
    instructor_variants: bool,
    /// Separate into groups by instructor, year, season, exact_period, course_code, course_name, or any other field; repeatable
    #[arg(long, value_parser = parse_separation_key)]
    separate_by: Vec<SeparationKey>,
    /// Report errors as a JSON file
    #[arg(long)]
    error_file: Option<String>,
    /// Produce compact JSON files
    #[arg(long)]
    compact: bool,
    /// Verbosity
    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,
}

fn parse_separation_key(s: &str) -> std::result::Result<SeparationKey, String> {
    SeparationKey::parse(s).map_err(|e| e.to_string())
}

fn build_filters(args: &Args, dataset: &RawDataset) -> Result<FilterSpec> {
    let mut filters = if args.recent {
        FilterSpec::recent_years(Local::now().date_naive())
    } else {
        FilterSpec::default()
    };
    if args.min_year.is_some() {
        filters.min_year = args.min_year;
    }
    if args.max_year.is_some() {
        filters.max_year = args.max_year;
    }
    if let (Some(min), Some(max)) = (filters.min_year, filters.max_year) {
        if min > max {
            return Err(errors::invalid_argument(format!(
                "year range {min}-{max} is empty"
            )));
        }
    }
    filters.seasons = args.season.iter().copied().collect();
    for name in &args.instructor {
        if args.instructor_variants {
            let variants = names::instructor_variants(name, &dataset.instances);
            info!(target: "coursestats", "instructor '{}': {}", name, variants.iter().join("; "));
            filters.instructors.extend(variants);
        } else {
            filters.instructors.insert(name.clone());
        }
    }
    Ok(filters)
}

fn build_request(args: &Args, dataset: &RawDataset) -> Result<AnalysisRequest> {
    let stats = if args.stat.is_empty() {
        StatSelection::from_statistics(&Statistic::defaults())
    } else {
        if let Some(bad) = args.stat.iter().find(|s| Statistic::parse(s).is_none()) {
            return Err(errors::invalid_argument(format!(
                "unknown statistic '{bad}', expected one of: {}",
                Statistic::ALL.iter().map(|s| s.id()).join(", ")
            )));
        }
        StatSelection(args.stat.clone())
    };
    Ok(AnalysisRequest {
        stats,
        filters: build_filters(args, dataset)?,
        separation_keys: args.separate_by.clone(),
    })
}

fn process(args: &Args) -> Result<()> {
    info!(target: "coursestats", "read: {}", args.infile);
    let indata = fs::read_to_string(&args.infile)?;
    let dataset = RawDataset::from_json(&indata)?;
    if dataset.is_empty() {
        return Err(errors::invalid_input_ref("no offerings found"));
    }
    let request = build_request(args, &dataset)?;
    let response = engine::process_analysis_request(&dataset, &request);
    for group in &response.groups {
        for r in &group.stats {
            info!(target: "coursestats", "{}: {}: {}", group.name, r.stat, output::pretty_stat(r));
        }
    }
    info!(target: "coursestats", "write: {}", args.outfile);
    output::write_json(&args.outfile, &response, args.compact)?;
    Ok(())
}

fn main() {
    let args = Args::parse();
    pretty_env_logger::formatted_timed_builder()
        .filter_level(args.verbose.log_level_filter())
        .init();
    match process(&args) {
        Ok(()) => (),
        Err(e) => {
            match args.error_file {
                Some(filename) => match output::store_error(&filename, &*e) {
                    Ok(()) => {
                        info!(target: "coursestats", "error reported: {e}");
                    }
                    Err(e2) => {
                        error!(target: "coursestats", "{e}");
                        error!(target: "coursestats", "{e2}");
                    }
                },
                None => error!(target: "coursestats", "{e}"),
            }
            process::exit(1);
        }
    }
}
