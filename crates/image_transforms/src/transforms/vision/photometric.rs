use crate::targets::ImageData;
use crate::transforms::operation::{to_params, Operation};
use anyhow::{ensure, Context, Result};
use image::{DynamicImage, ImageBuffer, Rgb32FImage};
use ndarray::{Array3, Axis};
use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::any::Any;

pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];
pub const CLIP_MEAN: [f32; 3] = [0.48145466, 0.4578275, 0.40821073];
pub const CLIP_STD: [f32; 3] = [0.26862954, 0.26130258, 0.27577711];

const DEFAULT_MAX_PIXEL_VALUE: f32 = 255.0;

/// RGB channel values as floats, without rescaling: 8-bit images keep their
/// `0..=255` range, float images pass through. Alpha is dropped and
/// 16-bit images go through 8-bit RGB first.
fn raw_rgb(img: DynamicImage) -> Result<Rgb32FImage> {
    match img {
        DynamicImage::ImageRgb32F(buf) => Ok(buf),
        DynamicImage::ImageRgba32F(_) => Ok(img.to_rgb32f()),
        other => {
            let rgb = other.to_rgb8();
            let (width, height) = rgb.dimensions();
            let values = rgb.into_raw().into_iter().map(f32::from).collect();
            ImageBuffer::from_raw(width, height, values)
                .context("Failed to build float image from 8-bit pixels")
        }
    }
}

/// Applies `f(value, channel)` to every element, keeping the container type.
fn map_channels<F>(data: ImageData, f: F) -> Result<ImageData>
where
    F: Fn(f32, usize) -> f32,
{
    match data {
        ImageData::Image(img) => {
            let mut buf = raw_rgb(img)?;
            for pixel in buf.pixels_mut() {
                for (c, value) in pixel.0.iter_mut().enumerate() {
                    *value = f(*value, c);
                }
            }
            Ok(ImageData::Image(DynamicImage::ImageRgb32F(buf)))
        }
        ImageData::Tensor(mut tensor) => {
            for (c, mut channel) in tensor.axis_iter_mut(Axis(0)).enumerate() {
                channel.mapv_inplace(|value| f(value, c));
            }
            Ok(ImageData::Tensor(tensor))
        }
    }
}

fn channel_count(data: &ImageData) -> usize {
    match data {
        ImageData::Image(_) => 3,
        ImageData::Tensor(tensor) => tensor.len_of(Axis(0)),
    }
}

// ============================================================================
// Normalize
// ============================================================================

/// Normalizes pixels with channel-wise statistics.
///
/// # Mathematical Operation:
/// ```text
/// output[c] = (input[c] - mean[c] * max_pixel_value) / (std[c] * max_pixel_value)
/// ```
///
/// Images come out as 32-bit float RGB. `[C, H, W]` tensors are normalized in
/// place and must have as many channels as `mean`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalize {
    #[serde(default = "imagenet_mean")]
    pub mean: Vec<f32>,
    #[serde(default = "imagenet_std")]
    pub std: Vec<f32>,
    #[serde(default = "default_max_pixel_value")]
    pub max_pixel_value: f32,
}

fn imagenet_mean() -> Vec<f32> {
    IMAGENET_MEAN.to_vec()
}

fn imagenet_std() -> Vec<f32> {
    IMAGENET_STD.to_vec()
}

fn default_max_pixel_value() -> f32 {
    DEFAULT_MAX_PIXEL_VALUE
}

impl Normalize {
    /// Creates new normalization parameters.
    pub fn new(mean: &[f32], std: &[f32]) -> Result<Self> {
        let normalize = Self {
            mean: mean.to_vec(),
            std: std.to_vec(),
            max_pixel_value: DEFAULT_MAX_PIXEL_VALUE,
        };
        normalize.validate()?;
        Ok(normalize)
    }

    /// ImageNet standard normalization (RGB)
    pub fn imagenet() -> Self {
        Self {
            mean: imagenet_mean(),
            std: imagenet_std(),
            max_pixel_value: DEFAULT_MAX_PIXEL_VALUE,
        }
    }

    /// CLIP pre-training statistics (RGB)
    pub fn clip() -> Self {
        Self {
            mean: CLIP_MEAN.to_vec(),
            std: CLIP_STD.to_vec(),
            max_pixel_value: DEFAULT_MAX_PIXEL_VALUE,
        }
    }
}

impl Operation for Normalize {
    fn name(&self) -> &'static str {
        "Normalize"
    }

    fn apply(&self, data: ImageData, _rng: &mut StdRng) -> Result<ImageData> {
        let channels = channel_count(&data);
        ensure!(
            channels == self.mean.len(),
            "Channel count mismatch: input has {} channels but normalization expects {}",
            channels,
            self.mean.len()
        );
        let max = self.max_pixel_value;
        map_channels(data, |value, c| {
            (value - self.mean[c] * max) / (self.std[c] * max)
        })
    }

    fn params(&self) -> Result<Value> {
        to_params(self)
    }

    fn validate(&self) -> Result<()> {
        ensure!(!self.mean.is_empty(), "Normalization mean cannot be empty");
        ensure!(
            self.mean.len() == self.std.len(),
            "The mean and standard deviation for normalization must match in dimension \
             (mean has {}, std has {})",
            self.mean.len(),
            self.std.len()
        );
        ensure!(
            self.std.iter().all(|s| *s != 0.0),
            "Normalization std must not contain zeros"
        );
        ensure!(
            self.max_pixel_value > 0.0,
            "max_pixel_value must be positive (got {})",
            self.max_pixel_value
        );
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// ToFloat
// ============================================================================

/// Divides every value by `max_value`, mapping 8-bit pixels into `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToFloat {
    #[serde(default = "default_max_pixel_value")]
    pub max_value: f32,
}

impl Default for ToFloat {
    fn default() -> Self {
        Self {
            max_value: DEFAULT_MAX_PIXEL_VALUE,
        }
    }
}

impl Operation for ToFloat {
    fn name(&self) -> &'static str {
        "ToFloat"
    }

    fn apply(&self, data: ImageData, _rng: &mut StdRng) -> Result<ImageData> {
        map_channels(data, |value, _| value / self.max_value)
    }

    fn params(&self) -> Result<Value> {
        to_params(self)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.max_value > 0.0,
            "max_value must be positive (got {})",
            self.max_value
        );
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// ToGray
// ============================================================================

/// With probability `p`, replaces every channel by the pixel's luminance
/// (`0.299 R + 0.587 G + 0.114 B`). The output keeps three channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToGray {
    #[serde(default = "default_probability")]
    pub p: f64,
}

pub(crate) fn default_probability() -> f64 {
    0.5
}

fn luminance(r: f32, g: f32, b: f32) -> f32 {
    0.299 * r + 0.587 * g + 0.114 * b
}

fn grayscale(data: ImageData) -> Result<ImageData> {
    match data {
        ImageData::Image(DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_)) => {
            map_gray_float(data)
        }
        ImageData::Image(img) => {
            let mut buf = img.to_rgb8();
            for pixel in buf.pixels_mut() {
                let [r, g, b] = pixel.0.map(f32::from);
                let l = luminance(r, g, b).round().clamp(0.0, 255.0) as u8;
                pixel.0 = [l; 3];
            }
            Ok(ImageData::Image(DynamicImage::ImageRgb8(buf)))
        }
        ImageData::Tensor(tensor) => {
            ensure!(
                tensor.len_of(Axis(0)) == 3,
                "ToGray expects a 3-channel tensor (got shape {:?})",
                tensor.shape()
            );
            let gray = luminance_plane(&tensor);
            let mut out = tensor;
            for mut channel in out.axis_iter_mut(Axis(0)) {
                channel.assign(&gray);
            }
            Ok(ImageData::Tensor(out))
        }
    }
}

fn map_gray_float(data: ImageData) -> Result<ImageData> {
    let img = data.into_image()?;
    let mut buf = raw_rgb(img)?;
    for pixel in buf.pixels_mut() {
        let [r, g, b] = pixel.0;
        pixel.0 = [luminance(r, g, b); 3];
    }
    Ok(ImageData::Image(DynamicImage::ImageRgb32F(buf)))
}

fn luminance_plane(tensor: &Array3<f32>) -> ndarray::Array2<f32> {
    let r = tensor.index_axis(Axis(0), 0);
    let g = tensor.index_axis(Axis(0), 1);
    let b = tensor.index_axis(Axis(0), 2);
    &r * 0.299 + &g * 0.587 + &b * 0.114
}

impl Operation for ToGray {
    fn name(&self) -> &'static str {
        "ToGray"
    }

    fn apply(&self, data: ImageData, rng: &mut StdRng) -> Result<ImageData> {
        if rng.random_bool(self.p) {
            grayscale(data)
        } else {
            Ok(data)
        }
    }

    fn params(&self) -> Result<Value> {
        to_params(self)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            (0.0..=1.0).contains(&self.p),
            "Probability must be in [0.0, 1.0] range (got {})",
            self.p
        );
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use rand::SeedableRng;

    fn solid(value: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb(value)))
    }

    #[test]
    fn test_normalize_image_uses_max_pixel_value() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(0);
        let norm = Normalize::new(&[0.5; 3], &[0.5; 3])?;
        let out = norm.apply(solid([255, 0, 128]).into(), &mut rng)?;

        let out = out.into_image()?;
        let buf = out.as_rgb32f().expect("normalize yields float RGB");
        let pixel = buf.get_pixel(0, 0);
        assert!((pixel[0] - 1.0).abs() < 1e-6);
        assert!((pixel[1] + 1.0).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_normalize_tensor_per_channel() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(0);
        let tensor = Array3::<f32>::from_elem((3, 8, 8), 255.0);
        let norm = Normalize::new(&[1.0; 3], &[1.0; 3])?;

        let normalized = norm.apply(tensor.into(), &mut rng)?.into_tensor()?;
        for c in 0..3 {
            let mean = normalized.index_axis(Axis(0), c).mean().unwrap_or(f32::NAN);
            assert!(mean.abs() < 1e-5);
        }
        Ok(())
    }

    #[test]
    fn test_normalize_channel_mismatch() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(0);
        let tensor = Array3::<f32>::zeros((1, 2, 2));
        assert!(Normalize::imagenet().apply(tensor.into(), &mut rng).is_err());
        Ok(())
    }

    #[test]
    fn test_normalize_rejects_mismatched_statistics() {
        assert!(Normalize::new(&[0.5; 3], &[0.5; 2]).is_err());
        assert!(Normalize::new(&[], &[]).is_err());
    }

    #[test]
    fn test_to_float_scales_into_unit_range() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(0);
        let out = ToFloat::default().apply(solid([255, 51, 0]).into(), &mut rng)?;
        let out = out.into_image()?;
        let pixel = *out.as_rgb32f().expect("float RGB").get_pixel(1, 1);
        assert_eq!(pixel, Rgb([1.0, 0.2, 0.0]));
        Ok(())
    }

    #[test]
    fn test_to_gray_always() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(0);
        let out = ToGray { p: 1.0 }.apply(solid([200, 100, 50]).into(), &mut rng)?;
        let out = out.into_image()?;
        let pixel = out.as_rgb8().expect("8-bit stays 8-bit").get_pixel(0, 0);
        assert_eq!(pixel[0], pixel[1]);
        assert_eq!(pixel[1], pixel[2]);
        Ok(())
    }
}
