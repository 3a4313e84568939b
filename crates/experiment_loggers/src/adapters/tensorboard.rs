use super::run_dir::RunDirectory;
use super::{ExperimentLogger, Metrics, RunLocation};
use crate::kind::LoggerKind;
use anyhow::Result;
use image::DynamicImage;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

/// TensorBoard-style run under `<save_dir>/<name>/version_<n>/`. The version
/// is claimed on the first write.
#[derive(Debug)]
pub struct TensorBoardLogger {
    save_dir: PathBuf,
    name: String,
    log_graph: bool,
    run: RunDirectory,
}

impl TensorBoardLogger {
    pub const DEFAULT_NAME: &'static str = "Tensorboard Logs";

    pub fn new(save_dir: impl Into<PathBuf>, name: impl Into<String>, log_graph: bool) -> Self {
        let save_dir = save_dir.into();
        let name = name.into();
        let location = RunLocation::versioned(save_dir.join(&name));

        let mut metadata = Mapping::new();
        metadata.insert("backend".into(), LoggerKind::Tensorboard.as_str().into());
        metadata.insert("name".into(), name.clone().into());
        metadata.insert("log_graph".into(), log_graph.into());

        Self {
            save_dir,
            name,
            log_graph,
            run: RunDirectory::new(location, Value::Mapping(metadata)),
        }
    }

    /// Claimed version, or the next free one before the first write.
    pub fn version(&self) -> u32 {
        self.run.version().unwrap_or_default()
    }

    pub fn log_graph(&self) -> bool {
        self.log_graph
    }
}

impl ExperimentLogger for TensorBoardLogger {
    fn kind(&self) -> LoggerKind {
        LoggerKind::Tensorboard
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
        let path = self.run.save_image(image, name, step)?;
        tracing::trace!(path = %path.display(), "logged image");
        Ok(())
    }
}
