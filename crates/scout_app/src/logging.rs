//! Logger initialization for the scout binary.
//!
//! Terminal output, `./scout.log`, or both.

use std::fs::File;
use std::path::PathBuf;

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

const LOG_FILE: &str = "./scout.log";

/// Destination for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LogDestination {
    /// Write to terminal (stderr for warnings and errors, stdout otherwise).
    #[default]
    Terminal,
    /// Write to ./scout.log in current directory.
    File,
    /// Write to both file and terminal.
    Both,
}

/// Initialize the global logger. Falls back to the terminal when the log file
/// cannot be created.
pub fn initialize(destination: LogDestination, level: LevelFilter) {
    let config = build_config();

    let file_logger = match destination {
        LogDestination::File | LogDestination::Both => create_file_logger(level, config.clone()),
        LogDestination::Terminal => None,
    };
    let wants_terminal = destination != LogDestination::File || file_logger.is_none();

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    if wants_terminal {
        loggers.push(TermLogger::new(
            level,
            config,
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ));
    }
    if let Some(file_logger) = file_logger {
        loggers.push(file_logger);
    }

    let _ = CombinedLogger::init(loggers);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn create_file_logger(level: LevelFilter, config: Config) -> Option<Box<WriteLogger<File>>> {
    let log_path = PathBuf::from(LOG_FILE);
    match File::create(&log_path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not create log file at {:?}: {}", log_path, err);
            None
        }
    }
}
