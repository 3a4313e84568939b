use crate::error::LoggerError;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Names accepted in `trainer.logger`, in the order they are reported.
pub const AVAILABLE_LOGGERS: [&str; 4] = ["tensorboard", "wandb", "csv", "comet"];

/// The experiment-tracking backends a run can log to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LoggerKind {
    Tensorboard,
    Wandb,
    Csv,
    Comet,
}

impl LoggerKind {
    /// Parses a `trainer.logger` entry.
    pub fn parse(name: &str) -> Result<Self, LoggerError> {
        name.parse().map_err(|_| LoggerError::UnknownLogger {
            name: name.to_string(),
        })
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}
