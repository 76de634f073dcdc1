use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod events;
mod log_analysis;
mod models;
mod ranking;
mod report;
mod validate;
mod warehouse;
mod window;

use config::{EventsConfig, LogAnalysisConfig, StreamConfig, WarehouseConfig};
use window::{StreamEnd, DEFAULT_WINDOW};

#[derive(Parser)]
#[command(name = "data-cleaning-pipelines")]
#[command(about = "Single-pass cleaning for sensor logs, warehouse exports and event streams")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank sensors by ERROR lines in a status log
    SensorErrors {
        #[arg(long, default_value = config::DEFAULT_LOG_PATH)]
        log: PathBuf,
        #[arg(long, default_value_t = config::DEFAULT_TOP_N)]
        top: usize,
    },
    /// Print rolling temperature averages for readings on stdin
    RollingAverage {
        #[arg(long, default_value_t = DEFAULT_WINDOW)]
        window: usize,
    },
    /// Validate and clean a warehouse user export
    CleanWarehouse {
        #[arg(long, default_value = config::DEFAULT_WAREHOUSE_INPUT)]
        input: PathBuf,
        #[arg(long, default_value = config::DEFAULT_WAREHOUSE_CLEANED)]
        cleaned: PathBuf,
        #[arg(long, default_value = config::DEFAULT_WAREHOUSE_INVALID)]
        invalid: PathBuf,
    },
    /// Validate and normalize a JSON-lines event stream
    ValidateEvents {
        #[arg(long, default_value = config::DEFAULT_EVENTS_INPUT)]
        input: PathBuf,
        #[arg(long, default_value = config::DEFAULT_EVENTS_CLEANED)]
        cleaned: PathBuf,
        #[arg(long, default_value = config::DEFAULT_EVENTS_INVALID)]
        invalid: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::SensorErrors { log, top } => {
            let config = LogAnalysisConfig {
                log_path: log,
                top_n: top,
            };
            let tally = log_analysis::analyze_log(&config.log_path)?;
            let ranks = ranking::top_sensors_by_errors(&tally, config.top_n);
            print!("{}", report::render_top_errors(config.top_n, &ranks));
        }
        Commands::RollingAverage { window } => {
            let config = StreamConfig::new(window)?;
            run_rolling_average(&config).await?;
        }
        Commands::CleanWarehouse {
            input,
            cleaned,
            invalid,
        } => {
            let config = WarehouseConfig {
                input,
                cleaned,
                invalid,
            };
            let summary = warehouse::clean_warehouse(&config)?;
            println!("Cleaning complete. Skipped {} invalid rows.", summary.invalid);
        }
        Commands::ValidateEvents {
            input,
            cleaned,
            invalid,
        } => {
            let config = EventsConfig {
                input,
                cleaned,
                invalid,
            };
            let summary = events::validate_events(&config)?;
            println!(
                "Validation complete. Processed {} events: {} valid, {} invalid.",
                summary.total, summary.valid, summary.invalid
            );
        }
    }

    Ok(())
}

async fn run_rolling_average(config: &StreamConfig) -> anyhow::Result<()> {
    println!("Reading sensor data... (Ctrl+C to stop)");

    let mut averager = window::RollingAverager::new(config.window);
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();

    let end = window::stream_until_shutdown(
        stdin,
        &mut averager,
        &mut stdout,
        tokio::signal::ctrl_c(),
    )
    .await?;
    if end == StreamEnd::Interrupted {
        // the blocking stdin read cannot be cancelled, so runtime
        // shutdown would otherwise wait for one more line
        std::process::exit(0);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subcommands_fall_back_to_data_directory() {
        let cli = Cli::try_parse_from(["data-cleaning-pipelines", "sensor-errors"]).unwrap();
        match cli.command {
            Commands::SensorErrors { log, top } => {
                assert_eq!(log, PathBuf::from(config::DEFAULT_LOG_PATH));
                assert_eq!(top, 5);
            }
            _ => panic!("expected sensor-errors"),
        }
    }

    #[test]
    fn paths_can_be_overridden() {
        let cli = Cli::try_parse_from([
            "data-cleaning-pipelines",
            "validate-events",
            "--input",
            "in.jsonl",
            "--invalid",
            "bad.jsonl",
        ])
        .unwrap();
        match cli.command {
            Commands::ValidateEvents {
                input,
                cleaned,
                invalid,
            } => {
                assert_eq!(input, PathBuf::from("in.jsonl"));
                assert_eq!(cleaned, PathBuf::from(config::DEFAULT_EVENTS_CLEANED));
                assert_eq!(invalid, PathBuf::from("bad.jsonl"));
            }
            _ => panic!("expected validate-events"),
        }
    }

    #[test]
    fn window_flag_is_parsed() {
        let cli =
            Cli::try_parse_from(["data-cleaning-pipelines", "rolling-average", "--window", "4"])
                .unwrap();
        assert!(matches!(cli.command, Commands::RollingAverage { window: 4 }));
    }
}
