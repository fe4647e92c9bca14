//! Structured logging for Towermesh
//!
//! Every tower control loop runs inside a `tower` span, so each event a
//! tower emits carries the tower's identity. This crate wires those events to
//! an output:
//!
//! - **JSONL Output**: Structured JSON lines for log aggregation (default)
//! - **Pretty Output**: Human-readable console output for development
//! - **File Rotation**: Daily/hourly/never rotation via tracing-appender
//! - **Env Filtering**: `RUST_LOG` wins over the configured default level
//!
//! # Quick Start
//!
//! ```ignore
//! use towermesh_logging::{TowermeshSubscriberBuilder, LogConfig};
//!
//! // JSONL to console
//! let _guard = TowermeshSubscriberBuilder::new().init();
//!
//! // Pretty output, routing decisions included
//! let _guard = TowermeshSubscriberBuilder::new()
//!     .with_config(LogConfig::default().with_directive("towermesh_routing=trace"))
//!     .with_pretty(true)
//!     .init();
//! ```

pub mod config;

pub use config::{ConsoleOutput, FileConfig, LogConfig, RotationStrategy};
pub use tracing_appender::non_blocking::WorkerGuard;

use std::fs::{self, File};

use thiserror::Error;
use tracing::Subscriber;
use tracing_appender::non_blocking::NonBlocking;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::{Format, Json, JsonFields};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Errors raised while setting up logging
#[derive(Debug, Error)]
pub enum LoggingError {
    /// A filter directive did not parse
    #[error("Invalid filter directive: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    /// The log directory or file could not be created
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The rolling file appender could not be created
    #[error("File appender error: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),

    /// A global subscriber is already installed
    #[error("Global subscriber already set: {0}")]
    AlreadyInitialized(String),
}

/// Builder for configuring and initializing the Towermesh logging subscriber
///
/// Console output is JSONL unless switched with [`with_pretty`](Self::with_pretty)
/// or [`with_console`](Self::with_console).
pub struct TowermeshSubscriberBuilder {
    config: LogConfig,
}

impl TowermeshSubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the level used when `RUST_LOG` is unset
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.level = level.into();
        self
    }

    /// Set the console output
    pub fn with_console(mut self, console: ConsoleOutput) -> Self {
        self.config.console = console;
        self
    }

    /// Colored pretty console output, or JSONL
    pub fn with_pretty(self, pretty: bool) -> Self {
        self.with_console(if pretty {
            ConsoleOutput::Pretty { ansi: true }
        } else {
            ConsoleOutput::Jsonl
        })
    }

    /// Initialize the subscriber globally, reporting failures on stderr
    ///
    /// Keep the returned guard alive for as long as file output is needed.
    pub fn init(self) -> Option<WorkerGuard> {
        match self.try_init() {
            Ok(guard) => guard,
            Err(e) => {
                eprintln!("Warning: Failed to initialize logging: {}", e);
                None
            }
        }
    }

    /// Try to initialize the subscriber globally
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let filter = build_filter(&self.config)?;
        let location = self.config.source_location;

        let (pretty_console, jsonl_console) = match self.config.console {
            ConsoleOutput::Off => (None, None),
            ConsoleOutput::Jsonl => (None, Some(jsonl_layer(location, std::io::stdout))),
            ConsoleOutput::Pretty { ansi } => {
                (Some(fmt::layer().with_ansi(ansi).with_target(true)), None)
            }
        };

        let (file_layer, guard) = match &self.config.file {
            Some(file_config) => {
                let (writer, guard) = file_writer(file_config)?;
                (Some(jsonl_layer(location, writer)), Some(guard))
            }
            None => (None, None),
        };

        Registry::default()
            .with(filter)
            .with(pretty_console)
            .with(jsonl_console)
            .with(file_layer)
            .try_init()
            .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

        Ok(guard)
    }
}

impl Default for TowermeshSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the event filter: `RUST_LOG` if set, else the default level, plus
/// any configured directives
pub fn build_filter(config: &LogConfig) -> Result<EnvFilter, LoggingError> {
    let mut filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));
    for directive in &config.directives {
        filter = filter.add_directive(directive.parse()?);
    }
    Ok(filter)
}

/// Flattened JSON events with the current span and the span list
fn jsonl_layer<S, W>(location: bool, writer: W) -> fmt::Layer<S, JsonFields, Format<Json>, W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + 'static,
{
    fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .flatten_event(true)
        .with_file(location)
        .with_line_number(location)
        .with_writer(writer)
}

/// Create the file writer; `Never` truncates a single file, the others append
/// to rolling files
fn file_writer(config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    fs::create_dir_all(&config.directory)?;

    let rotation = match config.rotation {
        RotationStrategy::Never => {
            let path = config.directory.join(format!("{}.log", config.prefix));
            let file = File::create(path)?;
            return Ok(tracing_appender::non_blocking(file));
        }
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
    };

    let appender = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(&config.prefix)
        .filename_suffix("log")
        .build(&config.directory)?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Initialize logging for testing (minimal output)
///
/// Safe to call from every test; only the first call installs a subscriber.
pub fn init_testing() {
    let _ = TowermeshSubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .try_init();
}
