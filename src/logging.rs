//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--debug` / `-v` / `-q` / `-s` flags (if provided)
//! 2. `RDS_LOG` environment variable (e.g. "info", "debug", "off")
//! 3. default to `info`
//!
//! Logs go to stderr so that stdout carries only task output.

use anyhow::{anyhow, Result};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;

/// Environment variable consulted when no verbosity flag is given
pub const LOG_ENV_VAR: &str = "RDS_LOG";

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// No log output at all
    Silent = 0,

    /// Errors only
    Quiet = 1,

    /// Commands being run, warnings and errors
    Normal = 2,

    /// Resolution and discovery details
    Verbose = 3,

    /// Everything
    Debug = 4,
}

impl Verbosity {
    pub fn level(self) -> LevelFilter {
        match self {
            Verbosity::Silent => LevelFilter::OFF,
            Verbosity::Quiet => LevelFilter::ERROR,
            Verbosity::Normal => LevelFilter::INFO,
            Verbosity::Verbose => LevelFilter::DEBUG,
            Verbosity::Debug => LevelFilter::TRACE,
        }
    }
}

/// Initialise the global logging subscriber.
///
/// Fails if a subscriber is already installed.
pub fn init_logging(verbosity: Option<Verbosity>) -> Result<()> {
    let level = match verbosity {
        Some(v) => v.level(),
        None => std::env::var(LOG_ENV_VAR)
            .ok()
            .and_then(|s| parse_level_str(&s))
            .unwrap_or(LevelFilter::INFO),
    };

    fmt()
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to initialise logging: {}", e))
}

fn parse_level_str(s: &str) -> Option<LevelFilter> {
    match s.trim().to_lowercase().as_str() {
        "off" | "silent" => Some(LevelFilter::OFF),
        "error" => Some(LevelFilter::ERROR),
        "warn" | "warning" => Some(LevelFilter::WARN),
        "info" => Some(LevelFilter::INFO),
        "debug" => Some(LevelFilter::DEBUG),
        "trace" => Some(LevelFilter::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert!(Verbosity::Debug > Verbosity::Verbose);
        assert!(Verbosity::Verbose > Verbosity::Normal);
        assert!(Verbosity::Normal > Verbosity::Quiet);
        assert!(Verbosity::Quiet > Verbosity::Silent);
        assert_eq!(Verbosity::Silent.level(), LevelFilter::OFF);
        assert_eq!(Verbosity::Normal.level(), LevelFilter::INFO);
    }

    #[test]
    fn test_parse_level_str() {
        assert_eq!(parse_level_str("DEBUG"), Some(LevelFilter::DEBUG));
        assert_eq!(parse_level_str(" warning "), Some(LevelFilter::WARN));
        assert_eq!(parse_level_str("off"), Some(LevelFilter::OFF));
        assert_eq!(parse_level_str("loud"), None);
    }
}
