//! Turns a run configuration's `trainer.logger` selection into logger adapters.

use crate::adapters::{CometLogger, CsvLogger, ExperimentLogger, TensorBoardLogger, WandbLogger};
use crate::config::{self, LOGGER_FIELD};
use crate::error::LoggerError;
use crate::kind::LoggerKind;
use serde_yaml::Value;
use std::fs;
use std::path::Path;

/// Loggers selected by a run configuration.
#[derive(Debug)]
pub enum LoggerSelection {
    Disabled,
    Enabled(Vec<Box<dyn ExperimentLogger>>),
}

impl LoggerSelection {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled(_))
    }

    /// Empty when disabled.
    pub fn loggers(&self) -> &[Box<dyn ExperimentLogger>] {
        match self {
            Self::Disabled => &[],
            Self::Enabled(loggers) => loggers,
        }
    }

    pub fn into_loggers(self) -> Option<Vec<Box<dyn ExperimentLogger>>> {
        match self {
            Self::Disabled => None,
            Self::Enabled(loggers) => Some(loggers),
        }
    }
}

#[derive(Debug)]
pub struct Resolution {
    pub loggers: LoggerSelection,
    /// Input configuration without `trainer.logger`.
    pub config: Value,
}

#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Create `<project.path>/logs` for backends that need it up front. When
    /// off, the directory must already exist.
    pub create_log_dirs: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            create_log_dirs: true,
        }
    }
}

/// Resolves loggers with [`ResolverOptions::default`].
pub fn get_experiment_loggers(config: Value) -> Result<Resolution, LoggerError> {
    get_experiment_loggers_with(config, &ResolverOptions::default())
}

pub fn get_experiment_loggers_with(
    config: Value,
    options: &ResolverOptions,
) -> Result<Resolution, LoggerError> {
    tracing::info!("Loading the experiment logger(s)");

    let loggers = match selected_kinds(config::lookup(&config, &LOGGER_FIELD))? {
        None => {
            tracing::debug!("experiment logging disabled");
            LoggerSelection::Disabled
        }
        Some(kinds) => LoggerSelection::Enabled(
            kinds
                .into_iter()
                .map(|kind| build_logger(kind, &config, options))
                .collect::<Result<_, _>>()?,
        ),
    };

    Ok(Resolution {
        loggers,
        config: config::without_logger(config),
    })
}

/// `None` when logging is disabled. Every name is checked before any adapter
/// is built.
fn selected_kinds(selection: Option<&Value>) -> Result<Option<Vec<LoggerKind>>, LoggerError> {
    let invalid = || LoggerError::InvalidField {
        field: LOGGER_FIELD.join("."),
        expected: "false, null, true, a logger name or a list of logger names",
    };

    match selection {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(None),
        Some(Value::Bool(true)) => Ok(Some(vec![LoggerKind::Tensorboard])),
        Some(Value::String(name)) => Ok(Some(vec![LoggerKind::parse(name)?])),
        Some(Value::Sequence(names)) => names
            .iter()
            .map(|name| name.as_str().ok_or_else(invalid).and_then(LoggerKind::parse))
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(_) => Err(invalid()),
    }
}

fn build_logger(
    kind: LoggerKind,
    config: &Value,
    options: &ResolverOptions,
) -> Result<Box<dyn ExperimentLogger>, LoggerError> {
    let save_dir = config::logs_dir(config)?;

    let logger: Box<dyn ExperimentLogger> = match kind {
        LoggerKind::Tensorboard => Box::new(TensorBoardLogger::new(
            save_dir,
            TensorBoardLogger::DEFAULT_NAME,
            false,
        )),
        LoggerKind::Wandb => {
            let project = config::project_name(config)?;
            let name = config::run_name(config, || config::model_class(config))?;
            prepare_log_dir(&save_dir, options)?;
            Box::new(WandbLogger::new(save_dir, project, name))
        }
        LoggerKind::Comet => {
            let project = config::project_name(config)?;
            let name = config::run_name(config, || config::model_name(config))?;
            prepare_log_dir(&save_dir, options)?;
            Box::new(CometLogger::new(save_dir, project, name))
        }
        LoggerKind::Csv => Box::new(CsvLogger::new(save_dir, CsvLogger::DEFAULT_NAME)),
    };

    tracing::info!(
        logger = %logger.kind(),
        name = logger.name(),
        save_dir = %logger.save_dir().display(),
        "experiment logger ready"
    );
    Ok(logger)
}

fn prepare_log_dir(dir: &Path, options: &ResolverOptions) -> Result<(), LoggerError> {
    let io = |source| LoggerError::Io {
        path: dir.to_path_buf(),
        source,
    };

    if options.create_log_dirs {
        fs::create_dir_all(dir).map_err(io)
    } else if dir.is_dir() {
        Ok(())
    } else {
        Err(io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "log directory does not exist and creation is disabled",
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).expect("valid yaml")
    }

    #[test]
    fn test_selected_kinds() {
        assert!(matches!(selected_kinds(None), Ok(None)));
        assert!(matches!(selected_kinds(Some(&Value::Null)), Ok(None)));
        assert!(matches!(selected_kinds(Some(&value("false"))), Ok(None)));
        assert_eq!(
            selected_kinds(Some(&value("true"))).ok().flatten(),
            Some(vec![LoggerKind::Tensorboard])
        );
        assert_eq!(
            selected_kinds(Some(&value("[csv, wandb]"))).ok().flatten(),
            Some(vec![LoggerKind::Csv, LoggerKind::Wandb])
        );
        assert_eq!(
            selected_kinds(Some(&value("[]"))).ok().flatten(),
            Some(vec![])
        );
    }

    #[test]
    fn test_selected_kinds_rejects_other_values() {
        for bad in ["3", "{tensorboard: true}", "[csv, 1]"] {
            assert!(matches!(
                selected_kinds(Some(&value(bad))),
                Err(LoggerError::InvalidField { .. })
            ));
        }
    }

    #[test]
    fn test_unknown_name_in_list_fails_before_building() {
        assert!(matches!(
            selected_kinds(Some(&value("[csv, mlflow]"))),
            Err(LoggerError::UnknownLogger { name }) if name == "mlflow"
        ));
    }
}
