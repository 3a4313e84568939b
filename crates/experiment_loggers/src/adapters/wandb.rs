use super::run_dir::RunDirectory;
use super::{run_id, sanitize, ExperimentLogger, Metrics, RunLocation};
use crate::kind::LoggerKind;
use anyhow::Result;
use image::DynamicImage;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

const RUN_ID_LEN: usize = 8;

/// Offline Weights & Biases run under
/// `<save_dir>/wandb/offline-run-<project>-<name>-<run id>/`.
///
/// Every logger draws a fresh run id, so reruns of the same project and name
/// never share a directory.
#[derive(Debug)]
pub struct WandbLogger {
    save_dir: PathBuf,
    project: String,
    name: String,
    run_id: String,
    run: RunDirectory,
}

impl WandbLogger {
    pub fn new(save_dir: impl Into<PathBuf>, project: impl Into<String>, name: impl Into<String>) -> Self {
        let save_dir = save_dir.into();
        let project = project.into();
        let name = name.into();
        let run_id = run_id(RUN_ID_LEN);
        let root = save_dir.join("wandb").join(format!(
            "offline-run-{}-{}-{}",
            sanitize(&project),
            sanitize(&name),
            run_id
        ));

        let mut metadata = Mapping::new();
        metadata.insert("backend".into(), LoggerKind::Wandb.as_str().into());
        metadata.insert("project".into(), project.clone().into());
        metadata.insert("name".into(), name.clone().into());
        metadata.insert("id".into(), run_id.clone().into());
        metadata.insert("mode".into(), "offline".into());

        Self {
            save_dir,
            project,
            name,
            run_id,
            run: RunDirectory::new(RunLocation::Fixed(root), Value::Mapping(metadata)),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

impl ExperimentLogger for WandbLogger {
    fn kind(&self) -> LoggerKind {
        LoggerKind::Wandb
    }

    fn name(&self) -> &str {
        &self.name
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
