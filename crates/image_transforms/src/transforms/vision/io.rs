use crate::transforms::Transform;
use anyhow::{Context, Result};
use image::{DynamicImage, ImageReader};
use std::path::PathBuf;

/// Decodes the image stored at a path.
///
/// The format is sniffed from the file header, so a PNG saved as `.jpg`
/// still loads. Usually the first step in front of a resolved pipeline:
///
/// ```ignore
/// let pipeline = LoadImage::new().then(get_transforms(settings)?);
/// let tensor = pipeline.apply(PathBuf::from("bottle/test/broken_large/000.png"))?;
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadImage;

impl LoadImage {
    pub fn new() -> Self {
        Self
    }
}

impl Transform<PathBuf, DynamicImage> for LoadImage {
    fn apply(&self, path: PathBuf) -> Result<DynamicImage> {
        let reader = ImageReader::open(&path)
            .with_context(|| format!("Cannot open image {}", path.display()))?
            .with_guessed_format()
            .with_context(|| format!("Cannot read image header of {}", path.display()))?;
        reader
            .decode()
            .with_context(|| format!("Cannot decode image {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};

    #[test]
    fn test_load_png_round_trip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("sample.png");
        RgbImage::from_pixel(6, 4, Rgb([10, 20, 30])).save(&path)?;

        let img = LoadImage::new().apply(path)?;
        assert_eq!(img.dimensions(), (6, 4));
        assert_eq!(img.to_rgb8().get_pixel(5, 3), &Rgb([10, 20, 30]));
        Ok(())
    }

    #[test]
    fn test_format_is_sniffed_from_content() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("mislabelled.jpg");
        RgbImage::from_pixel(3, 2, Rgb([1, 2, 3])).save_with_format(&path, image::ImageFormat::Png)?;

        assert_eq!(LoadImage::new().apply(path)?.dimensions(), (3, 2));
        Ok(())
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let err = LoadImage::new()
            .apply(PathBuf::from("does/not/exist.png"))
            .unwrap_err();
        assert!(err.to_string().contains("does/not/exist.png"));
    }
}
