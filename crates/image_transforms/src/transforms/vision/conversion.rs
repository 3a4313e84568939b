use crate::targets::ImageData;
use crate::transforms::operation::{to_params, Operation};
use anyhow::{ensure, Context, Result};
use image::DynamicImage;
use ndarray::Array3;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::any::Any;

// ============================================================================
// ToTensorV2
// ============================================================================

/// Converts an HWC image into a channel-first `[C, H, W]` f32 tensor.
///
/// Values are carried over unscaled: 8-bit images keep their `0..=255`
/// range, so the step usually follows `Normalize` or `ToFloat`.
///
/// Channel Handling
/// | Input Format  | Output Shape |
/// |---------------|--------------|
/// | Grayscale (L) | `[1, H, W]`  |
/// | RGB / RGB32F  | `[3, H, W]`  |
/// | RGBA / RGBA32F| `[4, H, W]`  |
/// | Other         | `[3, H, W]`  |
///
/// Tensors pass through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToTensorV2 {
    /// Kept for pipeline-file compatibility; masks are not pipeline targets.
    #[serde(default)]
    pub transpose_mask: bool,
}

fn widen(values: Vec<u8>) -> Vec<f32> {
    values.into_iter().map(f32::from).collect()
}

pub(crate) fn image_to_chw(img: DynamicImage) -> Result<Array3<f32>> {
    let (width, height) = (img.width(), img.height());
    ensure!(
        width > 0 && height > 0,
        "Image dimensions must be positive (got {}x{})",
        width,
        height
    );

    let (channels, values) = match img {
        DynamicImage::ImageLuma8(buf) => (1, widen(buf.into_raw())),
        DynamicImage::ImageRgb8(buf) => (3, widen(buf.into_raw())),
        DynamicImage::ImageRgba8(buf) => (4, widen(buf.into_raw())),
        DynamicImage::ImageRgb32F(buf) => (3, buf.into_raw()),
        DynamicImage::ImageRgba32F(buf) => (4, buf.into_raw()),
        // CMYK, 16-bit etc. go through 8-bit RGB
        other => (3, widen(other.to_rgb8().into_raw())),
    };

    let hwc = Array3::from_shape_vec((height as usize, width as usize, channels), values)
        .context("Pixel buffer does not match image dimensions")?;
    Ok(hwc.permuted_axes([2, 0, 1]).as_standard_layout().into_owned())
}

impl Operation for ToTensorV2 {
    fn name(&self) -> &'static str {
        "ToTensorV2"
    }

    fn apply(&self, data: ImageData, _rng: &mut StdRng) -> Result<ImageData> {
        match data {
            ImageData::Image(img) => Ok(ImageData::Tensor(image_to_chw(img)?)),
            tensor @ ImageData::Tensor(_) => Ok(tensor),
        }
    }

    fn params(&self) -> Result<Value> {
        to_params(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Rgb, RgbImage};
    use rand::SeedableRng;

    fn test_rgb_image() -> DynamicImage {
        let mut img = RgbImage::new(3, 2);
        for x in 0..3 {
            for y in 0..2 {
                img.put_pixel(x, y, Rgb([(x * 85) as u8, (y * 85) as u8, 128]));
            }
        }
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_to_tensor_is_channel_first() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(0);
        let tensor = ToTensorV2::default()
            .apply(test_rgb_image().into(), &mut rng)?
            .into_tensor()?;

        assert_eq!(tensor.shape(), &[3, 2, 3]); // CHW format
        // red channel of pixel (x=2, y=1), unscaled
        assert_eq!(tensor[[0, 1, 2]], 170.0);
        assert_eq!(tensor[[1, 1, 2]], 85.0);
        assert_eq!(tensor[[2, 0, 0]], 128.0);
        Ok(())
    }

    #[test]
    fn test_to_tensor_grayscale_has_one_channel() -> Result<()> {
        let img = DynamicImage::ImageLuma8(GrayImage::new(5, 4));
        assert_eq!(image_to_chw(img)?.shape(), &[1, 4, 5]);
        Ok(())
    }

    #[test]
    fn test_to_tensor_passes_tensors_through() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(0);
        let tensor = Array3::<f32>::ones((3, 2, 2));
        let out = ToTensorV2::default().apply(tensor.clone().into(), &mut rng)?;
        assert_eq!(out.into_tensor()?, tensor);
        Ok(())
    }
}
