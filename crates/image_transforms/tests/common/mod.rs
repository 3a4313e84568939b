use image::{DynamicImage, Rgb, RgbImage};
use serde_yaml::Mapping;

/// RGB image whose red channel grows left to right and green top to bottom.
pub fn gradient_image(width: u32, height: u32) -> DynamicImage {
    let mut img = RgbImage::new(width, height);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let r = (x * 255 / width.max(1)) as u8;
        let g = (y * 255 / height.max(1)) as u8;
        *pixel = Rgb([r, g, 128]);
    }
    DynamicImage::ImageRgb8(img)
}

/// Parses an inline YAML mapping of operations.
pub fn operations(yaml: &str) -> Mapping {
    serde_yaml::from_str(yaml).expect("test mapping must be valid YAML")
}
