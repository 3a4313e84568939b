use super::{Metrics, RunLocation};
use anyhow::{Context, Result};
use image::DynamicImage;
use serde::Serialize;
use serde_yaml::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

const METADATA_FILE: &str = "run.yaml";
const HPARAMS_FILE: &str = "hparams.yaml";
const METRICS_FILE: &str = "metrics.jsonl";
const IMAGES_DIR: &str = "images";

#[derive(Serialize)]
struct MetricRecord<'a> {
    step: u64,
    #[serde(flatten)]
    metrics: &'a Metrics,
}

/// Offline run directory shared by the tensorboard, wandb and comet adapters.
///
/// ```text
/// <root>/
///   run.yaml        backend metadata, written once
///   hparams.yaml
///   metrics.jsonl   one {"step": n, "<metric>": v, ...} object per line
///   images/<name>_<step>.png
/// ```
#[derive(Debug)]
pub(crate) struct RunDirectory {
    location: RunLocation,
    metadata: Value,
    root: Option<PathBuf>,
}

impl RunDirectory {
    pub(crate) fn new(location: RunLocation, metadata: Value) -> Self {
        Self {
            location,
            metadata,
            root: None,
        }
    }

    /// The run directory; for versioned runs that have not written yet, the
    /// one they would claim now.
    pub(crate) fn root(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(|| self.location.path())
    }

    pub(crate) fn version(&self) -> Option<u32> {
        self.location.version()
    }

    fn prepare(&mut self) -> Result<PathBuf> {
        if let Some(root) = &self.root {
            return Ok(root.clone());
        }
        let root = self.location.create().with_context(|| {
            format!("Failed to create run directory {}", self.location.path().display())
        })?;
        let metadata = root.join(METADATA_FILE);
        fs::write(&metadata, serde_yaml::to_string(&self.metadata)?)
            .with_context(|| format!("Failed to write {}", metadata.display()))?;
        tracing::debug!(dir = %root.display(), "run directory ready");
        self.root = Some(root.clone());
        Ok(root)
    }

    pub(crate) fn write_hyperparams(&mut self, params: &Value) -> Result<()> {
        let path = self.prepare()?.join(HPARAMS_FILE);
        fs::write(&path, serde_yaml::to_string(params)?)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    pub(crate) fn append_metrics(&mut self, metrics: &Metrics, step: u64) -> Result<()> {
        let path = self.prepare()?.join(METRICS_FILE);
        let mut line = serde_json::to_vec(&MetricRecord { step, metrics })?;
        line.push(b'\n');
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut file| file.write_all(&line))
            .with_context(|| format!("Failed to append to {}", path.display()))
    }

    pub(crate) fn save_image(&mut self, image: &DynamicImage, name: &str, step: u64) -> Result<PathBuf> {
        let dir = self.prepare()?.join(IMAGES_DIR);
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}_{}.png", super::sanitize(name), step));
        image
            .save(&path)
            .with_context(|| format!("Failed to save image {}", path.display()))?;
        Ok(path)
    }
}
