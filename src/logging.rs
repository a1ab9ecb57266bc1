//! Log level handling and tracing setup.

use std::fmt;
use std::str::FromStr;
use tracing_subscriber::{fmt as tracing_fmt, EnvFilter};

/// npm-style log levels; forwarded verbatim to the build orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Silly,
    Verbose,
    #[default]
    Info,
    Warn,
    Error,
    Silent,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Silly => "silly",
            Self::Verbose => "verbose",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Silent => "silent",
        }
    }

    /// Equivalent `tracing` filter directive.
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Silly => "trace",
            Self::Verbose => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Silent => "off",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "silly" | "trace" => Ok(Self::Silly),
            "verbose" | "debug" => Ok(Self::Verbose),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "silent" | "off" => Ok(Self::Silent),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Install the global subscriber, writing to stderr. `RUST_LOG` wins when set.
pub fn init(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dev_workspace={0},kws={0}", level.as_filter())));

    let _ = tracing_fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
