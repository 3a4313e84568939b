use super::{ExperimentLogger, Metrics, RunLocation};
use crate::kind::LoggerKind;
use anyhow::{Context, Result};
use serde_yaml::Value;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const METRICS_FILE: &str = "metrics.csv";
const HPARAMS_FILE: &str = "hparams.yaml";

/// Plain CSV run under `<save_dir>/<name>/version_<n>/`. The version is
/// claimed on the first write.
///
/// `metrics.csv` has a `step` column followed by every metric name seen so
/// far, sorted. Rows are appended as they are logged; a metric name not seen
/// before rewrites the file once under the wider header, leaving the new
/// column empty in earlier rows.
#[derive(Debug)]
pub struct CsvLogger {
    save_dir: PathBuf,
    name: String,
    location: RunLocation,
    dir: Option<PathBuf>,
    /// Metric columns of the header on disk.
    columns: BTreeSet<String>,
}

impl CsvLogger {
    pub const DEFAULT_NAME: &'static str = "lightning_logs";

    pub fn new(save_dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        let save_dir = save_dir.into();
        let name = name.into();
        let location = RunLocation::versioned(save_dir.join(&name));
        Self {
            save_dir,
            name,
            location,
            dir: None,
            columns: BTreeSet::new(),
        }
    }

    /// Claimed version, or the next free one before the first write.
    pub fn version(&self) -> u32 {
        self.location.version().unwrap_or_default()
    }

    fn ensure_dir(&mut self) -> Result<PathBuf> {
        if let Some(dir) = &self.dir {
            return Ok(dir.clone());
        }
        let dir = self.location.create().with_context(|| {
            format!("Failed to create run directory {}", self.location.path().display())
        })?;
        self.dir = Some(dir.clone());
        Ok(dir)
    }
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn header<'a>(columns: impl IntoIterator<Item = &'a String>) -> String {
    let mut line = String::from("step");
    for column in columns {
        line.push(',');
        line.push_str(&escape(column));
    }
    line.push('\n');
    line
}

fn row(columns: &BTreeSet<String>, metrics: &Metrics, step: u64) -> String {
    let mut line = step.to_string();
    for column in columns {
        line.push(',');
        if let Some(value) = metrics.get(column) {
            let _ = write!(line, "{value}");
        }
    }
    line.push('\n');
    line
}

/// Rewrites `path` under the header of `new`, moving each cell of the rows
/// written under `old` to its column in `new`. Data cells are numeric, so
/// splitting on commas is exact.
fn widen(path: &Path, old: &BTreeSet<String>, new: &BTreeSet<String>) -> Result<()> {
    let existing = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
        Err(err) => return Err(err).with_context(|| format!("Failed to read {}", path.display())),
    };
    let targets: Vec<usize> = old
        .iter()
        .filter_map(|column| new.iter().position(|candidate| candidate == column))
        .collect();

    let mut out = header(new);
    for line in existing.lines().skip(1) {
        let mut cells = line.split(',');
        let step = cells.next().unwrap_or_default();
        let mut widened = vec![""; new.len()];
        for (&target, cell) in targets.iter().zip(cells) {
            widened[target] = cell;
        }
        out.push_str(step);
        for cell in widened {
            out.push(',');
            out.push_str(cell);
        }
        out.push('\n');
    }
    fs::write(path, out).with_context(|| format!("Failed to write {}", path.display()))
}

impl ExperimentLogger for CsvLogger {
    fn kind(&self) -> LoggerKind {
        LoggerKind::Csv
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    fn log_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| self.location.path())
    }

    fn log_hyperparams(&mut self, params: &Value) -> Result<()> {
        let path = self.ensure_dir()?.join(HPARAMS_FILE);
        fs::write(&path, serde_yaml::to_string(params)?)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    fn log_metrics(&mut self, metrics: &Metrics, step: u64) -> Result<()> {
        let path = self.ensure_dir()?.join(METRICS_FILE);

        let mut columns = self.columns.clone();
        columns.extend(metrics.keys().cloned());
        if columns.len() != self.columns.len() || !path.exists() {
            widen(&path, &self.columns, &columns)?;
            tracing::debug!(columns = columns.len(), path = %path.display(), "csv header written");
            self.columns = columns;
        }

        OpenOptions::new()
            .append(true)
            .open(&path)
            .and_then(|mut file| file.write_all(row(&self.columns, metrics, step).as_bytes()))
            .with_context(|| format!("Failed to append to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use image::{DynamicImage, RgbImage};

    fn metrics(pairs: &[(&str, f64)]) -> Metrics {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_header_grows_with_new_metrics() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut logger = CsvLogger::new(dir.path(), CsvLogger::DEFAULT_NAME);
        logger.log_metrics(&metrics(&[("train_loss", 0.5)]), 0)?;
        logger.log_metrics(&metrics(&[("image_AUROC", 0.9), ("train_loss", 0.25)]), 1)?;

        let text = fs::read_to_string(logger.log_dir().join(METRICS_FILE))?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["step,image_AUROC,train_loss", "0,,0.5", "1,0.9,0.25"]);
        Ok(())
    }

    #[test]
    fn test_rows_written_before_a_new_metric_are_widened() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut logger = CsvLogger::new(dir.path(), CsvLogger::DEFAULT_NAME);
        logger.log_metrics(&metrics(&[("a_loss", 1.0), ("c_acc", 0.5)]), 0)?;
        logger.log_metrics(&metrics(&[("a_loss", 0.75)]), 1)?;
        let path = logger.log_dir().join(METRICS_FILE);
        assert_eq!(fs::read_to_string(&path)?, "step,a_loss,c_acc\n0,1,0.5\n1,0.75,\n");

        // `b_f1` lands between the existing columns
        logger.log_metrics(&metrics(&[("b_f1", 0.25), ("c_acc", 0.625)]), 2)?;
        logger.log_metrics(&metrics(&[("a_loss", 0.5)]), 3)?;
        assert_eq!(
            fs::read_to_string(&path)?,
            "step,a_loss,b_f1,c_acc\n0,1,,0.5\n1,0.75,,\n2,,0.25,0.625\n3,0.5,,\n"
        );
        Ok(())
    }

    #[test]
    fn test_loggers_built_together_write_separate_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut first = CsvLogger::new(dir.path(), CsvLogger::DEFAULT_NAME);
        let mut second = CsvLogger::new(dir.path(), CsvLogger::DEFAULT_NAME);
        first.log_metrics(&metrics(&[("a", 1.0)]), 0)?;
        second.log_metrics(&metrics(&[("b", 2.0)]), 0)?;

        assert_ne!(first.log_dir(), second.log_dir());
        assert_eq!(fs::read_to_string(first.log_dir().join(METRICS_FILE))?, "step,a\n0,1\n");
        assert_eq!(fs::read_to_string(second.log_dir().join(METRICS_FILE))?, "step,b\n0,2\n");
        Ok(())
    }

    #[test]
    fn test_escape_quotes_special_fields() {
        assert_eq!(escape("loss"), "loss");
        assert_eq!(escape("a,b"), "\"a,b\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_images_are_ignored() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut logger = CsvLogger::new(dir.path(), "runs");
        let image = DynamicImage::ImageRgb8(RgbImage::new(2, 2));
        logger.add_image(&image, "sample", 0)?;
        assert!(!logger.log_dir().exists());
        Ok(())
    }
}
