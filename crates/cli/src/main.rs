//! Kart telemetry analysis CLI
//!
//! `analyze` turns a logger CSV and a vehicle config into an analysis
//! document; `calibrate` replays a recorded sample file through the
//! calibration engine. Exit codes: 0 success, 2 malformed input,
//! 3 I/O failure, 4 invalid configuration.

use analyzer::{
    analyze_csv, AnalysisError, AnalysisSettings, CalibrationError, Calibrator, EngineLimits,
    ErrorKind, MotionSample, VehicleConfig,
};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

const EXIT_MALFORMED: u8 = 2;
const EXIT_IO: u8 = 3;
const EXIT_CONFIG: u8 = 4;

#[derive(Parser, Debug)]
#[command(name = "kartdyno", about = "Kart telemetry power analysis", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyse a logger CSV into a power/torque curve document
    Analyze {
        /// Logger CSV file
        #[arg(long)]
        csv: PathBuf,

        /// Vehicle configuration JSON; defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Lap indices to analyse, e.g. 2,3,4; all laps when omitted
        #[arg(long, value_delimiter = ',')]
        laps: Vec<usize>,

        #[arg(long, default_value_t = 4000.0)]
        min_rpm: f64,

        #[arg(long, default_value_t = 16000.0)]
        max_rpm: f64,

        /// Wheel-power sanity cap (CV)
        #[arg(long, default_value_t = 100.0)]
        max_power: f64,

        /// Curve smoothing level, 0-100
        #[arg(long = "filter", default_value_t = 50.0)]
        filter_level: f64,

        /// Output path for the JSON document; stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Replay a recorded sample file through the calibration engine
    Calibrate {
        /// JSON file with gravitySamples and forwardSamples arrays
        #[arg(long)]
        samples: PathBuf,
    },
}

/// On-disk shape of a recorded calibration session.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalibrationRecording {
    gravity_samples: Vec<MotionSample>,
    forward_samples: Vec<MotionSample>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("calibration engine: {0}")]
    Calibration(#[from] CalibrationError),

    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("configuration file {path}: {source}")]
    ConfigFile {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("sample file {path}: {source}")]
    SampleFile {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            CliError::Analysis(err) => match err.kind() {
                ErrorKind::MalformedInput | ErrorKind::InsufficientSamples => EXIT_MALFORMED,
                ErrorKind::ConfigurationInvalid => EXIT_CONFIG,
            },
            CliError::Calibration(_) => EXIT_MALFORMED,
            CliError::Read { .. } | CliError::Write { .. } => EXIT_IO,
            CliError::ConfigFile { .. } => EXIT_CONFIG,
            CliError::SampleFile { .. } => EXIT_MALFORMED,
        }
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Analyze {
            csv,
            config,
            laps,
            min_rpm,
            max_rpm,
            max_power,
            filter_level,
            out,
        } => {
            let vehicle = load_config(config.as_deref())?;
            let settings = AnalysisSettings {
                selected_laps: laps,
                limits: EngineLimits {
                    min_rpm,
                    max_rpm,
                    max_power_cv: max_power,
                },
                filter_level,
            };
            analyze(&csv, &vehicle, &settings, out.as_deref())
        }
        Command::Calibrate { samples } => calibrate(&samples),
    }
}

fn analyze(
    csv: &Path,
    vehicle: &VehicleConfig,
    settings: &AnalysisSettings,
    out: Option<&Path>,
) -> Result<(), CliError> {
    let bytes = std::fs::read(csv).map_err(|source| CliError::Read {
        path: csv.to_path_buf(),
        source,
    })?;
    info!("analysing {} ({} bytes)", csv.display(), bytes.len());

    let document = analyze_csv(&bytes, vehicle, settings)?;
    info!(
        "{} accepted samples, {} bins, peak {:.1} CV at {:.0} rpm",
        document.accepted_samples,
        document.bins.len(),
        document.statistics.peak_power_cv,
        document.statistics.peak_power_rpm,
    );

    let json = serde_json::to_string_pretty(&document).expect("document serialises");
    match out {
        Some(path) => {
            std::fs::write(path, json).map_err(|source| CliError::Write {
                path: path.to_path_buf(),
                source,
            })?;
            info!("wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn calibrate(samples: &Path) -> Result<(), CliError> {
    let bytes = std::fs::read(samples).map_err(|source| CliError::Read {
        path: samples.to_path_buf(),
        source,
    })?;
    let recording: CalibrationRecording =
        serde_json::from_slice(&bytes).map_err(|source| CliError::SampleFile {
            path: samples.to_path_buf(),
            source,
        })?;
    info!(
        "replaying {} gravity + {} forward samples",
        recording.gravity_samples.len(),
        recording.forward_samples.len()
    );

    let mut calibrator = Calibrator::new();
    for sample in &recording.gravity_samples {
        calibrator.push_sample(sample);
    }
    calibrator.finish_gravity_phase()?;
    for sample in &recording.forward_samples {
        calibrator.push_sample(sample);
    }
    let calibration = calibrator.finish_forward_phase()?;

    if calibration.gravity_magnitude_warning {
        tracing::warn!(
            "stationary mean is {:.2} m/s², far from 9.81; was the kart moving?",
            calibration.gravity.norm()
        );
    }
    info!("calibration quality {:.2}", calibration.quality);
    let json = serde_json::to_string_pretty(&calibration).expect("calibration serialises");
    println!("{json}");
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<VehicleConfig, CliError> {
    let Some(path) = path else {
        return Ok(VehicleConfig::default());
    };
    let bytes = std::fs::read(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| CliError::ConfigFile {
        path: path.to_path_buf(),
        source,
    })
}

fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("failed to set tracing subscriber");
}
