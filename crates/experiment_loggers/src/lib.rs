//! Experiment logger resolution for training runs.
//!
//! ```no_run
//! use experiment_loggers::{get_experiment_loggers, LoggerSelection};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config: serde_yaml::Value = serde_yaml::from_str(
//!     "trainer: {logger: [tensorboard, csv]}\nproject: {path: ./results}",
//! )?;
//! let resolution = get_experiment_loggers(config)?;
//! if let LoggerSelection::Enabled(loggers) = resolution.loggers {
//!     for logger in &loggers {
//!         println!("{} -> {}", logger.kind(), logger.log_dir().display());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod config;
pub mod console;
pub mod error;
pub mod kind;
pub mod resolver;

pub use adapters::{CometLogger, CsvLogger, ExperimentLogger, Metrics, TensorBoardLogger, WandbLogger};
pub use console::init_tracing;
pub use error::{InitError, LoggerError};
pub use kind::{LoggerKind, AVAILABLE_LOGGERS};
pub use resolver::{
    get_experiment_loggers, get_experiment_loggers_with, LoggerSelection, Resolution,
    ResolverOptions,
};
