use serde_yaml::Value;
use std::path::Path;

/// Run configuration rooted at `project_path` with the given `trainer.logger`
/// YAML snippet and an optional dataset category.
pub fn run_config(project_path: &Path, logger: &str, category: Option<&str>) -> Value {
    let category = category
        .map(|c| format!("\n    category: {c}"))
        .unwrap_or_default();
    let yaml = format!(
        r#"
trainer:
  logger: {logger}
  max_epochs: 1
project:
  path: "{}"
data:
  class_path: vision.data.MVTec
  init_args:
    root: ./datasets/MVTec{category}
model:
  class_path: vision.models.Padim
  name: padim
"#,
        project_path.display()
    );
    serde_yaml::from_str(&yaml).expect("test config must be valid YAML")
}

pub fn trainer_has_logger(config: &Value) -> bool {
    config["trainer"]
        .as_mapping()
        .is_some_and(|trainer| trainer.contains_key("logger"))
}
