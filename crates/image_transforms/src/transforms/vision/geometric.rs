use crate::targets::ImageData;
use crate::transforms::operation::{to_params, Operation};
use anyhow::{anyhow, ensure, Result};
use image::imageops::FilterType;
use ndarray::s;
use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::any::Any;

// ============================================================================
// Interpolation
// ============================================================================

/// Resampling filter, stored in pipeline files under the integer codes used by
/// OpenCV-based augmentation libraries.
///
/// | Code | Variant   | Filter                  |
/// |------|-----------|-------------------------|
/// | 0    | `Nearest` | Nearest neighbour       |
/// | 1    | `Linear`  | Bilinear (default)      |
/// | 2    | `Cubic`   | Catmull-Rom bicubic     |
/// | 4    | `Lanczos` | Lanczos with window 3   |
///
/// Code 3 (pixel-area resampling) has no counterpart and is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Interpolation {
    Nearest,
    #[default]
    Linear,
    Cubic,
    Lanczos,
}

impl TryFrom<u8> for Interpolation {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Nearest),
            1 => Ok(Self::Linear),
            2 => Ok(Self::Cubic),
            4 => Ok(Self::Lanczos),
            other => Err(format!(
                "unsupported interpolation code {other} (expected 0, 1, 2 or 4)"
            )),
        }
    }
}

impl From<Interpolation> for u8 {
    fn from(interpolation: Interpolation) -> Self {
        match interpolation {
            Interpolation::Nearest => 0,
            Interpolation::Linear => 1,
            Interpolation::Cubic => 2,
            Interpolation::Lanczos => 4,
        }
    }
}

impl From<Interpolation> for FilterType {
    fn from(interpolation: Interpolation) -> Self {
        match interpolation {
            Interpolation::Nearest => FilterType::Nearest,
            Interpolation::Linear => FilterType::Triangle,
            Interpolation::Cubic => FilterType::CatmullRom,
            Interpolation::Lanczos => FilterType::Lanczos3,
        }
    }
}

// ============================================================================
// Resize
// ============================================================================

/// Resizes an image to exactly `height` x `width`, ignoring the aspect ratio.
///
/// # Examples
/// ``` ignore
/// let resize = Resize::new(256, 256, Interpolation::Linear)?;
/// let resized = resize.apply(ImageData::from(img), &mut rng)?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resize {
    pub height: u32,
    pub width: u32,
    #[serde(default)]
    pub interpolation: Interpolation,
}

impl Resize {
    pub fn new(height: u32, width: u32, interpolation: Interpolation) -> Result<Self> {
        let resize = Self {
            height,
            width,
            interpolation,
        };
        resize.validate()?;
        Ok(resize)
    }
}

impl Operation for Resize {
    fn name(&self) -> &'static str {
        "Resize"
    }

    fn apply(&self, data: ImageData, _rng: &mut StdRng) -> Result<ImageData> {
        let img = data.into_image()?;
        Ok(ImageData::Image(img.resize_exact(
            self.width,
            self.height,
            self.interpolation.into(),
        )))
    }

    fn params(&self) -> Result<Value> {
        to_params(self)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.width > 0 && self.height > 0,
            "Image dimensions must be positive after resizing (got {}x{})",
            self.height,
            self.width
        );
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Crops
// ============================================================================

fn crop(data: ImageData, top: u32, left: u32, height: u32, width: u32) -> ImageData {
    match data {
        ImageData::Image(img) => ImageData::Image(img.crop_imm(left, top, width, height)),
        ImageData::Tensor(tensor) => {
            let (top, left) = (top as usize, left as usize);
            let (height, width) = (height as usize, width as usize);
            ImageData::Tensor(
                tensor
                    .slice(s![.., top..top + height, left..left + width])
                    .to_owned(),
            )
        }
    }
}

/// Returns the free space `(rows, cols)` left around a crop, failing when the
/// crop does not fit.
fn crop_margin(name: &str, data: &ImageData, height: u32, width: u32) -> Result<(u32, u32)> {
    let (image_height, image_width) = data.dimensions();
    if height > image_height || width > image_width {
        return Err(anyhow!(
            "{} size ({}, {}) is larger than the image ({}, {})",
            name,
            height,
            width,
            image_height,
            image_width
        ));
    }
    Ok((image_height - height, image_width - width))
}

fn ensure_positive(height: u32, width: u32) -> Result<()> {
    ensure!(
        height > 0 && width > 0,
        "Crop dimensions must be positive (got {}x{})",
        height,
        width
    );
    Ok(())
}

/// Crops the central `height` x `width` region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CenterCrop {
    pub height: u32,
    pub width: u32,
}

impl CenterCrop {
    pub fn new(height: u32, width: u32) -> Result<Self> {
        let crop = Self { height, width };
        crop.validate()?;
        Ok(crop)
    }
}

impl Operation for CenterCrop {
    fn name(&self) -> &'static str {
        "CenterCrop"
    }

    fn apply(&self, data: ImageData, _rng: &mut StdRng) -> Result<ImageData> {
        let (rows, cols) = crop_margin(self.name(), &data, self.height, self.width)?;
        Ok(crop(data, rows / 2, cols / 2, self.height, self.width))
    }

    fn params(&self) -> Result<Value> {
        to_params(self)
    }

    fn validate(&self) -> Result<()> {
        ensure_positive(self.height, self.width)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Crops a `height` x `width` region at a random offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomCrop {
    pub height: u32,
    pub width: u32,
}

impl Operation for RandomCrop {
    fn name(&self) -> &'static str {
        "RandomCrop"
    }

    fn apply(&self, data: ImageData, rng: &mut StdRng) -> Result<ImageData> {
        let (rows, cols) = crop_margin(self.name(), &data, self.height, self.width)?;
        let top = rng.random_range(0..=rows);
        let left = rng.random_range(0..=cols);
        Ok(crop(data, top, left, self.height, self.width))
    }

    fn params(&self) -> Result<Value> {
        to_params(self)
    }

    fn validate(&self) -> Result<()> {
        ensure_positive(self.height, self.width)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
