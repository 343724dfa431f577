//! Logging for cachet.
//!
//! Modules log through `tracing`; this module re-exports the macros and
//! installs a subscriber. Output defaults to JSON on STDOUT at INFO level.
//!
//! # Examples
//!
//! ```no_run
//! use cachet_core::logging::*;
//! use tracing::Level;
//!
//! let _guard = LogConfig::new()
//!     .level(Level::DEBUG)
//!     .format(LogFormat::Pretty)
//!     .init()
//!     .expect("subscriber already installed");
//!
//! debug!(directive = "no_cache", "Declared class-level Cache-Control");
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - standard `EnvFilter` directives (takes precedence)
//! - `CACHET_LOG_LEVEL=trace|debug|info|warn|error`
//! - `CACHET_LOG_FORMAT=json|plain|pretty|compact`

use crate::error::{Error, Result};
use std::env;
use std::io;
use tracing::Level;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

pub use tracing::{debug, error, info, trace, warn};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Output format for log messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event (default)
    Json,
    Plain,
    /// Multi-line, for development
    Pretty,
    Compact,
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "plain" => Some(LogFormat::Plain),
            "pretty" => Some(LogFormat::Pretty),
            "compact" => Some(LogFormat::Compact),
            _ => None,
        }
    }
}

/// Output destination for logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
}

/// Subscriber settings.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Print the module path of each event
    pub targets: bool,
    /// ANSI colors, ignored for JSON
    pub ansi: bool,
    /// `EnvFilter` directives such as `cachet_core::action=trace`; replaces
    /// `level` when set
    pub filter: Option<String>,
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `CACHET_LOG_LEVEL` and `CACHET_LOG_FORMAT`.
    /// Unrecognized values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(level) = env::var("CACHET_LOG_LEVEL")
            .ok()
            .and_then(|s| s.trim().parse::<Level>().ok())
        {
            config.level = level;
        }
        if let Some(format) = env::var("CACHET_LOG_FORMAT")
            .ok()
            .and_then(|s| LogFormat::parse(&s))
        {
            config.format = format;
        }

        config
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn targets(mut self, enable: bool) -> Self {
        self.targets = enable;
        self
    }

    pub fn ansi(mut self, enable: bool) -> Self {
        self.ansi = enable;
        self
    }

    pub fn filter(mut self, directives: impl Into<String>) -> Self {
        self.filter = Some(directives.into());
        self
    }

    fn env_filter(&self) -> EnvFilter {
        let fallback = || EnvFilter::new(self.level.as_str());
        match &self.filter {
            Some(directives) => EnvFilter::try_new(directives).unwrap_or_else(|_| fallback()),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback()),
        }
    }

    fn fmt_layer(&self, writer: NonBlocking) -> BoxedLayer {
        let layer = fmt::layer().with_writer(writer).with_target(self.targets);
        match self.format {
            LogFormat::Json => layer.json().boxed(),
            LogFormat::Plain => layer.with_ansi(self.ansi).boxed(),
            LogFormat::Pretty => layer.pretty().with_ansi(self.ansi).boxed(),
            LogFormat::Compact => layer.compact().with_ansi(self.ansi).boxed(),
        }
    }

    /// Install the global subscriber.
    ///
    /// Keep the returned guard alive; dropping it flushes buffered output.
    /// Fails with [`Error::Config`] if a global subscriber is already set.
    pub fn init(self) -> Result<WorkerGuard> {
        let (writer, guard) = match self.output {
            LogOutput::Stdout => tracing_appender::non_blocking(io::stdout()),
            LogOutput::Stderr => tracing_appender::non_blocking(io::stderr()),
        };

        tracing_subscriber::registry()
            .with(self.fmt_layer(writer))
            .with(self.env_filter())
            .try_init()
            .map_err(|e| Error::Config(format!("failed to install log subscriber: {}", e)))?;

        Ok(guard)
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Json,
            output: LogOutput::Stdout,
            targets: true,
            ansi: false,
            filter: None,
        }
    }
}
