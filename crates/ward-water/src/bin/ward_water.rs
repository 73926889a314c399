use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info};
use ward_water::core::RawHistogram;
use ward_water::io::{resolve, write_frequency_json, WaterRunConfig, WaterRunReport};
use ward_water::thresholds::solve_raw_histogram;
use ward_water::{OtsuParams, PermanentWaterPipeline, TieBreak};

#[derive(Parser)]
#[command(name = "ward-water", version, about = "Per-ward SAR water detection")]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the permanent-water pipeline described by a JSON config.
    Run { config: PathBuf },
    /// Solve one raw histogram (`histogram`, `bucketMeans`) and print the threshold.
    Otsu {
        histogram: PathBuf,
        #[arg(long, value_enum, default_value_t = TieArg::Highest)]
        tie_break: TieArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TieArg {
    Lowest,
    Highest,
}

impl From<TieArg> for TieBreak {
    fn from(t: TieArg) -> Self {
        match t {
            TieArg::Lowest => TieBreak::Lowest,
            TieArg::Highest => TieBreak::Highest,
        }
    }
}

type BoxError = Box<dyn std::error::Error>;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let res = match cli.command {
        Command::Run { config } => run(&config),
        Command::Otsu {
            histogram,
            tie_break,
        } => otsu(&histogram, tie_break.into()),
    };
    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn log_level(verbose: u8) -> log::LevelFilter {
    match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

/// `log` records go through `LogTracer` into the span-aware subscriber.
#[cfg(feature = "tracing")]
fn init_logging(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_log::LogTracer::init();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level(verbose).as_str().to_ascii_lowercase()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(not(feature = "tracing"))]
fn init_logging(verbose: u8) {
    let _ = env_logger::Builder::new()
        .filter_level(log_level(verbose))
        .parse_default_env()
        .format_timestamp_millis()
        .try_init();
}

fn otsu(path: &Path, tie_break: TieBreak) -> Result<(), BoxError> {
    let raw: RawHistogram = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    let solution = solve_raw_histogram(&raw, &OtsuParams { tie_break })?;
    info!(
        "split {} of {}, between-class variance {:.3}",
        solution.split_index,
        raw.histogram.len(),
        solution.between_class_variance
    );
    println!("{}", solution.threshold);
    Ok(())
}

fn run(config_path: &Path) -> Result<(), BoxError> {
    let cfg = WaterRunConfig::load_json(config_path)?;
    let base = config_path.parent().unwrap_or(Path::new("."));
    let mut report = WaterRunReport::new(config_path);
    let report_path = cfg.output_path(base);

    let res = cfg
        .build_catalog()
        .map_err(BoxError::from)
        .and_then(|catalog| {
            let scenes = cfg.load_scenes(base)?;
            let pipeline = PermanentWaterPipeline::with_pixel_reducer(cfg.build_params());
            Ok(pipeline.run(&scenes, &catalog)?)
        });

    let res = match res {
        Ok(res) => res,
        Err(e) => {
            report.set_error(&e);
            report.write_json(&report_path)?;
            return Err(e);
        }
    };

    let frequency_path = cfg.frequency_path(base);
    let written = write_frequency_json(&res.frequency, &frequency_path)
        .map_err(BoxError::from)
        .and_then(|()| write_pngs(&cfg, base, &res));
    report.set_result(&cfg, &res);
    if let Err(e) = written {
        report.set_error(&e);
        report.write_json(&report_path)?;
        return Err(e);
    }
    report.frequency_path = Some(frequency_path.to_string_lossy().into_owned());

    report.write_json(&report_path)?;
    info!("report written to {}", report_path.display());
    Ok(())
}

#[cfg(feature = "image")]
fn write_pngs(
    cfg: &WaterRunConfig,
    base: &Path,
    res: &ward_water::PermanentWaterResult,
) -> Result<(), BoxError> {
    use ward_water::export::{write_frequency_png, write_mask_png};

    if let Some(p) = &cfg.frequency_png_path {
        write_frequency_png(&res.frequency, resolve(base, p))?;
    }
    if let (Some(p), Some(mask)) = (&cfg.permanent_png_path, &res.permanent) {
        write_mask_png(mask, resolve(base, p))?;
    }
    Ok(())
}

#[cfg(not(feature = "image"))]
fn write_pngs(
    cfg: &WaterRunConfig,
    base: &Path,
    _res: &ward_water::PermanentWaterResult,
) -> Result<(), BoxError> {
    if let Some(p) = cfg
        .frequency_png_path
        .as_ref()
        .or(cfg.permanent_png_path.as_ref())
    {
        log::warn!(
            "built without `image`, skipping {}",
            resolve(base, p).display()
        );
    }
    Ok(())
}
