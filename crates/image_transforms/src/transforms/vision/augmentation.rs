use crate::targets::ImageData;
use crate::transforms::operation::{to_params, Operation};
use crate::transforms::vision::photometric::default_probability;
use anyhow::{ensure, Result};
use ndarray::s;
use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::any::Any;

fn check_probability(p: f64) -> Result<()> {
    ensure!(
        (0.0..=1.0).contains(&p),
        "Probability must be in [0.0, 1.0] range (got {})",
        p
    );
    Ok(())
}

// ============================================================================
// HorizontalFlip
// ============================================================================

/// Mirrors left and right with probability `p`.
///
/// # Example
/// ```ignore
/// let flip = HorizontalFlip { p: 0.5 };
/// let augmented = flip.apply(ImageData::from(img), &mut rng)?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizontalFlip {
    #[serde(default = "default_probability")]
    pub p: f64,
}

impl Operation for HorizontalFlip {
    fn name(&self) -> &'static str {
        "HorizontalFlip"
    }

    fn apply(&self, data: ImageData, rng: &mut StdRng) -> Result<ImageData> {
        if !rng.random_bool(self.p) {
            return Ok(data);
        }
        Ok(match data {
            ImageData::Image(img) => ImageData::Image(img.fliph()),
            ImageData::Tensor(tensor) => ImageData::Tensor(tensor.slice(s![.., .., ..;-1]).to_owned()),
        })
    }

    fn params(&self) -> Result<Value> {
        to_params(self)
    }

    fn validate(&self) -> Result<()> {
        check_probability(self.p)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// VerticalFlip
// ============================================================================

/// Mirrors top and bottom with probability `p`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerticalFlip {
    #[serde(default = "default_probability")]
    pub p: f64,
}

impl Operation for VerticalFlip {
    fn name(&self) -> &'static str {
        "VerticalFlip"
    }

    fn apply(&self, data: ImageData, rng: &mut StdRng) -> Result<ImageData> {
        if !rng.random_bool(self.p) {
            return Ok(data);
        }
        Ok(match data {
            ImageData::Image(img) => ImageData::Image(img.flipv()),
            ImageData::Tensor(tensor) => ImageData::Tensor(tensor.slice(s![.., ..;-1, ..]).to_owned()),
        })
    }

    fn params(&self) -> Result<Value> {
        to_params(self)
    }

    fn validate(&self) -> Result<()> {
        check_probability(self.p)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
