use super::run_dir::RunDirectory;
use super::{run_id, sanitize, ExperimentLogger, Metrics, RunLocation};
use crate::kind::LoggerKind;
use anyhow::Result;
use image::DynamicImage;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

const EXPERIMENT_KEY_LEN: usize = 32;

/// Offline Comet experiment under
/// `<save_dir>/comet/<project>/<experiment>/<experiment key>/`.
#[derive(Debug)]
pub struct CometLogger {
    save_dir: PathBuf,
    project_name: String,
    experiment_name: String,
    experiment_key: String,
    run: RunDirectory,
}

impl CometLogger {
    pub fn new(
        save_dir: impl Into<PathBuf>,
        project_name: impl Into<String>,
        experiment_name: impl Into<String>,
    ) -> Self {
        let save_dir = save_dir.into();
        let project_name = project_name.into();
        let experiment_name = experiment_name.into();
        let experiment_key = run_id(EXPERIMENT_KEY_LEN);
        let root = save_dir
            .join("comet")
            .join(sanitize(&project_name))
            .join(sanitize(&experiment_name))
            .join(&experiment_key);

        let mut metadata = Mapping::new();
        metadata.insert("backend".into(), LoggerKind::Comet.as_str().into());
        metadata.insert("project_name".into(), project_name.clone().into());
        metadata.insert("experiment_name".into(), experiment_name.clone().into());
        metadata.insert("experiment_key".into(), experiment_key.clone().into());

        Self {
            save_dir,
            project_name,
            experiment_name,
            experiment_key,
            run: RunDirectory::new(RunLocation::Fixed(root), Value::Mapping(metadata)),
        }
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn experiment_key(&self) -> &str {
        &self.experiment_key
    }
}

impl ExperimentLogger for CometLogger {
    fn kind(&self) -> LoggerKind {
        LoggerKind::Comet
    }

    fn name(&self) -> &str {
        &self.experiment_name
    }

    fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    fn log_dir(&self) -> PathBuf {
        self.run.root()
    }

    fn log_hyperparams(&mut self, params: &Value) -> Result<()> {
        self.run.write_hyperparams(params)
    }

    fn log_metrics(&mut self, metrics: &Metrics, step: u64) -> Result<()> {
        self.run.append_metrics(metrics, step)
    }

    fn add_image(&mut self, image: &DynamicImage, name: &str, step: u64) -> Result<()> {
        self.run.save_image(image, name, step).map(|_| ())
    }
}
