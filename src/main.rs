//! Run the front analysis pipeline on a directory of ERA5 NetCDF downloads.

use clap::Parser;
use frontal_analysis::{
    archive::NetCdfArchive,
    pipeline::{Pipeline, PipelineConfig, StageOutcome},
    plot::{LogRenderer, TimeRange},
    preprocess::Variable,
};
use std::{fs::File, path::PathBuf, process::ExitCode, sync::Mutex};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "front-pipeline")]
#[command(about = "Identify 850 hPa frontal zones in ERA5 data", long_about = None)]
struct Args {
    /// Directory holding the raw era5_<var>_*.nc files
    #[arg(short, long, default_value = "./raw_data")]
    input_dir: PathBuf,

    /// Directory for the processed archives, front mask, and plots
    #[arg(short, long, default_value = "./outputs")]
    output_dir: PathBuf,

    /// Latitude bounds of the analysis domain
    #[arg(long, num_args = 2, value_names = ["A", "B"], default_values_t = [35.0, 45.0])]
    lat_range: Vec<f64>,

    /// Longitude bounds of the analysis domain
    #[arg(long, num_args = 2, value_names = ["A", "B"], default_values_t = [25.0, 45.0])]
    lon_range: Vec<f64>,

    /// Variables to preprocess
    #[arg(long = "vars", value_delimiter = ',', default_value = "q,t,u,v")]
    variables: Vec<Variable>,

    /// First date or time to plot, e.g. 2025-10-01 or "2025-10-01 06:00"
    #[arg(long, requires = "end")]
    start: Option<String>,

    /// Last date or time to plot, a date alone includes the whole day
    #[arg(long, requires = "start")]
    end: Option<String>,

    /// Most images to make
    #[arg(long, default_value_t = 5)]
    max_plots: usize,

    /// Log file, written in addition to stdout
    #[arg(long, default_value = "pipeline.log")]
    log_file: PathBuf,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let log_file = match File::create(&args.log_file) {
        Ok(f) => f,
        Err(err) => {
            eprintln!("unable to create {}: {}", args.log_file.display(), err);
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(log_file)),
        )
        .init();

    let mut config = PipelineConfig::new(&args.input_dir)
        .with_output_dir(&args.output_dir)
        .with_lat_range(args.lat_range[0], args.lat_range[1])
        .with_lon_range(args.lon_range[0], args.lon_range[1])
        .with_variables(args.variables.clone())
        .with_max_plots(args.max_plots);

    if let (Some(start), Some(end)) = (&args.start, &args.end) {
        match TimeRange::parse(start, end) {
            Ok(range) => config = config.with_time_range(range),
            Err(err) => {
                error!(%err, "bad plot time range");
                return ExitCode::FAILURE;
            }
        }
    } else {
        info!("no plot time range given, plotting from the start of the data");
    }

    let mut pipeline = Pipeline::new(config, NetCdfArchive, LogRenderer);
    let report = pipeline.run();

    for (var, outcome) in &report.preprocess {
        if let StageOutcome::Failed(msg) = outcome {
            warn!(variable = %var, %msg, "preprocessing did not complete");
        }
    }

    info!(
        frames = report.frames,
        images = report.plots.len(),
        "plotting summary"
    );

    if report.succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
