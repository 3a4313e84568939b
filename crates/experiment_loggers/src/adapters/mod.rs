//! Offline experiment-logger adapters.
//!
//! Each adapter records a run under its backend's directory layout inside the
//! shared `<project.path>/logs` save directory. Run directories are created on
//! the first write, never at construction. Two loggers never share one: wandb
//! and comet runs carry a random run id, versioned runs claim their
//! `version_<n>` directory exclusively.

mod comet;
mod csv;
mod run_dir;
mod tensorboard;
mod wandb;

pub use self::comet::CometLogger;
pub use self::csv::CsvLogger;
pub use self::tensorboard::TensorBoardLogger;
pub use self::wandb::WandbLogger;

use crate::kind::LoggerKind;
use anyhow::Result;
use image::DynamicImage;
use rand::{distr::Alphanumeric, Rng};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Scalar metrics logged for one step, keyed by metric name.
pub type Metrics = BTreeMap<String, f64>;

pub trait ExperimentLogger: Debug + Send + Sync {
    fn kind(&self) -> LoggerKind;

    /// Run name as shown by the backend.
    fn name(&self) -> &str;

    /// Shared save directory (`<project.path>/logs`).
    fn save_dir(&self) -> &Path;

    /// Directory this run writes into.
    fn log_dir(&self) -> PathBuf;

    fn log_hyperparams(&mut self, params: &Value) -> Result<()>;

    fn log_metrics(&mut self, metrics: &Metrics, step: u64) -> Result<()>;

    /// Backends without image support ignore images.
    fn add_image(&mut self, _image: &DynamicImage, name: &str, step: u64) -> Result<()> {
        tracing::debug!(logger = %self.kind(), image = name, step, "image logging not supported");
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Next free `version_<n>` under `root`; 0 when `root` does not exist yet.
pub(crate) fn next_version(root: &Path) -> u32 {
    let Ok(entries) = fs::read_dir(root) else {
        return 0;
    };
    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            entry
                .file_name()
                .to_str()?
                .strip_prefix("version_")?
                .parse::<u32>()
                .ok()
        })
        .max()
        .map_or(0, |latest| latest + 1)
}

/// Creates `parent/version_<n>` for the first `n` no other run holds.
fn claim_version(parent: &Path) -> io::Result<u32> {
    fs::create_dir_all(parent)?;
    let mut version = next_version(parent);
    loop {
        match fs::create_dir(parent.join(format!("version_{version}"))) {
            Ok(()) => return Ok(version),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => version += 1,
            Err(err) => return Err(err),
        }
    }
}

/// Where a run writes.
#[derive(Debug)]
pub(crate) enum RunLocation {
    Fixed(PathBuf),
    /// `parent/version_<n>`, claimed on the first write.
    Versioned { parent: PathBuf, claimed: Option<u32> },
}

impl RunLocation {
    pub(crate) fn versioned(parent: PathBuf) -> Self {
        Self::Versioned {
            parent,
            claimed: None,
        }
    }

    /// Claimed version, or the one the run would claim if it wrote now.
    pub(crate) fn version(&self) -> Option<u32> {
        match self {
            Self::Fixed(_) => None,
            Self::Versioned { parent, claimed } => Some(claimed.unwrap_or_else(|| next_version(parent))),
        }
    }

    pub(crate) fn path(&self) -> PathBuf {
        match self {
            Self::Fixed(root) => root.clone(),
            Self::Versioned { parent, .. } => {
                parent.join(format!("version_{}", self.version().unwrap_or_default()))
            }
        }
    }

    /// Creates the directory, claiming a version the first time.
    pub(crate) fn create(&mut self) -> io::Result<PathBuf> {
        match self {
            Self::Fixed(root) => fs::create_dir_all(&*root).map(|()| root.clone()),
            Self::Versioned {
                claimed: Some(version),
                parent,
            } => Ok(parent.join(format!("version_{version}"))),
            Self::Versioned { parent, claimed } => {
                let version = claim_version(parent)?;
                *claimed = Some(version);
                Ok(parent.join(format!("version_{version}")))
            }
        }
    }
}

/// Lowercase alphanumeric id identifying one run.
pub(crate) fn run_id(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(|byte| char::from(byte).to_ascii_lowercase())
        .collect()
}

/// Makes a run or experiment name safe to use as a directory name.
pub(crate) fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '-',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_next_version() -> Result<()> {
        let dir = tempfile::tempdir()?;
        assert_eq!(next_version(&dir.path().join("missing")), 0);
        assert_eq!(next_version(dir.path()), 0);

        fs::create_dir(dir.path().join("version_0"))?;
        fs::create_dir(dir.path().join("version_4"))?;
        fs::create_dir(dir.path().join("version_x"))?;
        fs::write(dir.path().join("version_9"), b"not a directory")?;
        assert_eq!(next_version(dir.path()), 5);
        Ok(())
    }

    #[test]
    fn test_versions_are_claimed_on_create() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut first = RunLocation::versioned(dir.path().join("runs"));
        let mut second = RunLocation::versioned(dir.path().join("runs"));
        assert_eq!(first.version(), second.version());
        assert!(!dir.path().join("runs").exists());

        let first_dir = first.create()?;
        let second_dir = second.create()?;
        assert_eq!(first_dir, dir.path().join("runs/version_0"));
        assert_eq!(second_dir, dir.path().join("runs/version_1"));

        // claimed versions are stable
        assert_eq!(first.create()?, first_dir);
        assert_eq!(first.path(), first_dir);
        Ok(())
    }

    #[test]
    fn test_claim_skips_files_named_like_versions() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("version_0"), b"not a directory")?;
        assert_eq!(claim_version(dir.path())?, 1);
        Ok(())
    }

    #[test]
    fn test_run_ids_differ() {
        let id = run_id(8);
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        assert_ne!(run_id(16), run_id(16));
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("bottle Padim"), "bottle-Padim");
        assert_eq!(sanitize("a/b\\c"), "a-b-c");
        assert_eq!(sanitize("v1.0_x"), "v1.0_x");
    }
}
