use crate::kind::AVAILABLE_LOGGERS;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while resolving experiment loggers from a run config.
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error(
        "Unknown logger type: {name}. Available loggers are: {}.\n\
         To enable the logger, set `trainer.logger` to `true` or use one of available loggers \
         in the config.\nTo disable the logger, set `trainer.logger` to `false`.",
        AVAILABLE_LOGGERS.join(", ")
    )]
    UnknownLogger { name: String },

    #[error("Missing required config field `{0}`")]
    MissingField(String),

    #[error("Config field `{field}` must be {expected}")]
    InvalidField {
        field: String,
        expected: &'static str,
    },

    #[error("Failed to prepare log directory {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by [`init_tracing`](crate::console::init_tracing).
#[derive(Debug, Error)]
pub enum InitError {
    #[error("tracing subscriber already initialised")]
    AlreadyInitialised,

    #[error("invalid log level `{0}` (expected trace, debug, info, warn or error)")]
    InvalidLevel(String),

    #[error(transparent)]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}
