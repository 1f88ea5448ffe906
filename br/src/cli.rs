//! CLI argument parsing for blockrender

use clap::Parser;
use std::path::PathBuf;

/// blockrender - compose reusable text blocks into templates
#[derive(Parser, Debug)]
#[command(name = "br")]
#[command(author, version, about = "Render templates by substituting ${name} placeholders with text blocks", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Keep running and re-render whenever blocks or templates change
    #[arg(short, long)]
    pub watch: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR); overrides --verbose
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

impl Cli {
    /// Resolve the effective log level name
    ///
    /// Priority: --log-level > --verbose > config file > INFO.
    pub fn effective_log_level(&self, config_log_level: Option<&str>) -> String {
        if let Some(level) = &self.log_level {
            return level.clone();
        }
        if self.verbose {
            return "DEBUG".to_string();
        }
        config_log_level.unwrap_or("INFO").to_string()
    }
}
