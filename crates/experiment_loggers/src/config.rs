//! Read access to the run configuration fields the logger resolver uses.
//!
//! | Field                     | Used for                                  |
//! |---------------------------|-------------------------------------------|
//! | `trainer.logger`          | backend selection                          |
//! | `project.path`            | `<project.path>/logs` save directory       |
//! | `data.class_path`         | W&B / Comet project (last dotted segment)  |
//! | `data.init_args.category` | run name prefix                            |
//! | `model.class_path`        | run name (last dotted segment)             |
//! | `model.name`              | Comet experiment name without a category   |

use crate::error::LoggerError;
use serde_yaml::Value;
use std::path::PathBuf;

pub const LOGGER_FIELD: [&str; 2] = ["trainer", "logger"];
pub const LOG_DIR_NAME: &str = "logs";

pub(crate) fn lookup<'a>(config: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(config, |node, key| node.as_mapping()?.get(*key))
}

fn required_str<'a>(config: &'a Value, path: &[&str]) -> Result<&'a str, LoggerError> {
    let field = path.join(".");
    match lookup(config, path) {
        None | Some(Value::Null) => Err(LoggerError::MissingField(field)),
        Some(value) => value.as_str().ok_or(LoggerError::InvalidField {
            field,
            expected: "a string",
        }),
    }
}

/// `"vision.models.Padim"` -> `"Padim"`
pub fn last_segment(class_path: &str) -> &str {
    class_path.rsplit('.').next().unwrap_or(class_path)
}

/// `<project.path>/logs`
pub fn logs_dir(config: &Value) -> Result<PathBuf, LoggerError> {
    Ok(PathBuf::from(required_str(config, &["project", "path"])?).join(LOG_DIR_NAME))
}

/// Last segment of `data.class_path`, used as the tracking project.
pub fn project_name(config: &Value) -> Result<String, LoggerError> {
    Ok(last_segment(required_str(config, &["data", "class_path"])?).to_string())
}

/// Last segment of `model.class_path`.
pub fn model_class(config: &Value) -> Result<String, LoggerError> {
    Ok(last_segment(required_str(config, &["model", "class_path"])?).to_string())
}

pub fn model_name(config: &Value) -> Result<String, LoggerError> {
    Ok(required_str(config, &["model", "name"])?.to_string())
}

/// `data.init_args.category`; numbers are accepted and rendered as text.
pub fn category(config: &Value) -> Result<Option<String>, LoggerError> {
    match lookup(config, &["data", "init_args", "category"]) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(category)) => Ok(Some(category.clone())),
        Some(Value::Number(category)) => Ok(Some(category.to_string())),
        Some(_) => Err(LoggerError::InvalidField {
            field: "data.init_args.category".into(),
            expected: "a string or a number",
        }),
    }
}

/// `"<category> <model>"` when the dataset has a category, `fallback` otherwise.
pub fn run_name(config: &Value, fallback: impl FnOnce() -> Result<String, LoggerError>) -> Result<String, LoggerError> {
    match category(config)? {
        Some(category) => Ok(format!("{} {}", category, model_class(config)?)),
        None => fallback(),
    }
}

/// Copy of `config` without `trainer.logger`.
pub fn without_logger(mut config: Value) -> Value {
    let [section, key] = LOGGER_FIELD;
    if let Some(trainer) = config
        .as_mapping_mut()
        .and_then(|root| root.get_mut(section))
        .and_then(Value::as_mapping_mut)
    {
        trainer.remove(key);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn config(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).expect("valid yaml")
    }

    #[test]
    fn test_lookup_nested() {
        let cfg = config("data: {init_args: {category: bottle}}");
        assert_eq!(
            lookup(&cfg, &["data", "init_args", "category"]).and_then(Value::as_str),
            Some("bottle")
        );
        assert!(lookup(&cfg, &["data", "class_path"]).is_none());
        assert!(lookup(&cfg, &["data", "init_args", "category", "deeper"]).is_none());
    }

    #[test]
    fn test_missing_and_invalid_fields() {
        let cfg = config("project: {path: 7}");
        assert!(matches!(
            logs_dir(&cfg),
            Err(LoggerError::InvalidField { field, .. }) if field == "project.path"
        ));
        assert!(matches!(
            project_name(&cfg),
            Err(LoggerError::MissingField(field)) if field == "data.class_path"
        ));
    }

    #[test]
    fn test_run_name_with_and_without_category() -> Result<()> {
        let with = config("{data: {init_args: {category: 3}}, model: {class_path: a.b.Padim}}");
        assert_eq!(run_name(&with, || Ok("unused".into()))?, "3 Padim");

        let without = config("{data: {init_args: {}}, model: {class_path: a.b.Padim}}");
        assert_eq!(run_name(&without, || model_class(&without))?, "Padim");
        Ok(())
    }

    #[test]
    fn test_without_logger_keeps_other_fields() {
        let cfg = config("{trainer: {logger: csv, max_epochs: 1}, project: {path: ./results}}");
        let reduced = without_logger(cfg);
        assert!(lookup(&reduced, &LOGGER_FIELD).is_none());
        assert_eq!(
            lookup(&reduced, &["trainer", "max_epochs"]).and_then(Value::as_u64),
            Some(1)
        );
        assert!(lookup(&reduced, &["project", "path"]).is_some());
    }
}
