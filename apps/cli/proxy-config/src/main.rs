use proxy_config::cli::Cli;
use proxy_config::error::{AppError, EXIT_FAILURE};
use proxy_config::logger::initialize as LoggerInitialize;
use proxy_config::run::run;

use common::ErrorLocation;

use std::panic::Location;
use std::process::ExitCode;

use clap::Parser;
use log::error;
use serde_json::Value;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logger FIRST
    if let Err(e) = LoggerInitialize(cli.log_dir.as_deref()) {
        eprintln!("{e}");
        return ExitCode::from(EXIT_FAILURE);
    }

    let outcome = run(&cli).await.and_then(|config| {
        serde_json::to_string_pretty(&Value::Object(config)).map_err(|e| AppError::App {
            message: format!("Failed to encode config: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })
    });

    match outcome {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            if let Ok(report) = serde_json::to_string(&e) {
                eprintln!("{report}");
            }
            ExitCode::from(e.exit_code())
        }
    }
}
