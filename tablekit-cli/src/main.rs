mod cli;
mod commands;
mod error;
mod paths;

use std::process::ExitCode;

use clap::Parser;
use simplelog::Config;
use simplelog::LevelFilter;
use simplelog::WriteLogger;

use crate::cli::Cli;

fn init_logging() {
    let (path, file) = match paths::open_log() {
        Ok(Some(log)) => log,
        Ok(None) => return,
        Err(e) => {
            eprintln!("Cannot open log file: {}", e);
            return;
        }
    };
    if WriteLogger::init(LevelFilter::Debug, Config::default(), file).is_err() {
        eprintln!("Logger already initialized");
        return;
    }
    log::debug!("Logging to {}", path.display());
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    match cli::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
