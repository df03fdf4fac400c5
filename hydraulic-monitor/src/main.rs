//! Hydraulic Monitor - Main Entry Point
//!
//! Predicts hydraulic valve conditions from recorded FS1/PS2 cycles using a
//! persisted predictor artifact.
//!
//! Usage:
//!     hydraulic-monitor predict --model model.bin --data-dir data_subset
//!     hydraulic-monitor predict --cycle 42 --json
//!     hydraulic-monitor inspect --model model.bin

mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use config::MonitorConfig;
use hydraulic_core::{persist, Predictor, SensorData, Severity, ValveCondition};
use serde::Serialize;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "hydraulic-monitor")]
#[command(about = "Hydraulic valve condition monitor")]
#[command(version)]
struct Args {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Predict valve conditions for recorded cycles
    Predict {
        /// Predictor artifact (overrides config)
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Directory with FS1/PS2 files (overrides config)
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Predict a single cycle instead of all of them
        #[arg(long)]
        cycle: Option<usize>,

        /// Print predictions as JSON
        #[arg(long)]
        json: bool,
    },

    /// Describe the pipeline stored in an artifact
    Inspect {
        /// Predictor artifact (overrides config)
        #[arg(short, long)]
        model: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct CyclePrediction {
    cycle: usize,
    condition: ValveCondition,
    description: &'static str,
    severity: Severity,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    hydraulic_core::tracing::init_with_filter(&args.log_level);

    info!("Hydraulic Monitor v{}", env!("CARGO_PKG_VERSION"));

    let config = MonitorConfig::load(args.config.as_deref())?;

    match args.command {
        Command::Predict {
            model,
            data_dir,
            cycle,
            json,
        } => {
            let model = model.unwrap_or_else(|| config.model_path.clone());
            let data_dir = data_dir.unwrap_or_else(|| config.data_dir.clone());
            predict(&config, model, data_dir, cycle, json)
        }
        Command::Inspect { model } => {
            let model = model.unwrap_or(config.model_path);
            let predictor: Predictor = persist::load_from_path(&model)?;
            println!("{}", serde_json::to_string_pretty(&predictor.summary())?);
            Ok(())
        }
    }
}

fn predict(
    config: &MonitorConfig,
    model: PathBuf,
    data_dir: PathBuf,
    cycle: Option<usize>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let predictor: Predictor = persist::load_from_path(&model)?;
    let data = SensorData::load(&data_dir, &config.sensor_files())?;

    let (first, conditions) = match cycle {
        Some(index) => {
            let (low, high) = data.cycle(index)?;
            (index, predictor.predict(low, high)?)
        }
        None => (
            0,
            predictor.predict(data.low_rate.view(), data.high_rate.view())?,
        ),
    };

    info!("Predicted {} of {} cycles", conditions.len(), data.cycles());

    let predictions: Vec<CyclePrediction> = conditions
        .into_iter()
        .enumerate()
        .map(|(offset, condition)| CyclePrediction {
            cycle: first + offset,
            condition,
            description: condition.description(),
            severity: condition.severity(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&predictions)?);
    } else {
        for p in &predictions {
            println!("cycle {:>5}: {} [{}]", p.cycle, p.condition, p.severity);
        }
    }

    Ok(())
}
