use crate::error::TransformError;
use crate::targets::{ImageData, Targets, IMAGE};
use crate::transforms::operation::Operation;
use crate::transforms::Transform;
use anyhow::{ensure, Context, Result};
use image::DynamicImage;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::BTreeMap;

/// The only target type pipelines know how to process.
pub const IMAGE_TARGET_TYPE: &str = "image";

/// An ordered pipeline of [`Operation`]s applied to a set of [`Targets`].
///
/// Besides the primary `"image"`, a pipeline processes the additional targets
/// it was told about (e.g. `"depth_image"`). Every operation sees all targets
/// of one call with the same random draw, so a flipped image comes with a
/// flipped depth map.
///
/// # Example
/// ```ignore
/// let pipeline = Compose::new(vec![Box::new(HorizontalFlip { p: 0.5 })])
///     .with_additional_targets([("depth_image", "image")])?;
/// let output = pipeline.apply(Targets::new(rgb).with_target("depth_image", depth))?;
/// ```
#[derive(Debug, Default)]
pub struct Compose {
    operations: Vec<Box<dyn Operation>>,
    additional_targets: BTreeMap<String, String>,
}

impl Compose {
    pub fn new(operations: Vec<Box<dyn Operation>>) -> Self {
        Self {
            operations,
            additional_targets: BTreeMap::new(),
        }
    }

    /// Registers extra target names. Each must map to the `"image"` type.
    pub fn with_additional_targets<I, K, V>(mut self, targets: I) -> Result<Self, TransformError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, target_type) in targets {
            let (name, target_type) = (name.into(), target_type.into());
            if target_type != IMAGE_TARGET_TYPE {
                return Err(TransformError::InvalidTarget { name, target_type });
            }
            self.additional_targets.insert(name, target_type);
        }
        Ok(self)
    }

    pub fn operations(&self) -> &[Box<dyn Operation>] {
        &self.operations
    }

    /// Returns the operation at `index` if it is a `T`.
    pub fn operation<T: Operation + 'static>(&self, index: usize) -> Option<&T> {
        self.operations
            .get(index)
            .and_then(|operation| operation.as_any().downcast_ref::<T>())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.operations.iter().map(|operation| operation.name()).collect()
    }

    pub fn additional_targets(&self) -> &BTreeMap<String, String> {
        &self.additional_targets
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Runs the pipeline with a fixed seed; equal seeds give equal outputs.
    pub fn apply_seeded(&self, targets: Targets, seed: u64) -> Result<Targets> {
        ensure!(
            targets.contains(IMAGE),
            "Targets must contain an `{}` entry",
            IMAGE
        );
        for name in targets.names() {
            ensure!(
                name == IMAGE || self.additional_targets.contains_key(name),
                "Unknown target `{}`; register it as an additional target",
                name
            );
        }
        targets.check_shapes()?;

        let mut targets = targets;
        for (index, operation) in self.operations.iter().enumerate() {
            let operation_seed = seed.wrapping_add(index as u64);
            targets = targets.try_map(|name, data| {
                let mut rng = StdRng::seed_from_u64(operation_seed);
                operation
                    .apply(data, &mut rng)
                    .with_context(|| format!("{} failed on target `{}`", operation.name(), name))
            })?;
        }
        Ok(targets)
    }
}

impl Transform<Targets, Targets> for Compose {
    fn apply(&self, targets: Targets) -> Result<Targets> {
        self.apply_seeded(targets, rand::rng().random())
    }
}

impl Transform<DynamicImage, ImageData> for Compose {
    fn apply(&self, image: DynamicImage) -> Result<ImageData> {
        Transform::<Targets, Targets>::apply(self, Targets::new(image))?.into_image()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::vision::{HorizontalFlip, Interpolation, Normalize, Resize, ToTensorV2};
    use image::{GenericImageView, Rgb, RgbImage};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        let mut img = RgbImage::new(width, height);
        for (x, _, pixel) in img.enumerate_pixels_mut() {
            *pixel = Rgb([(x * 20) as u8, 0, 0]);
        }
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_compose_runs_in_order() -> Result<()> {
        let pipeline = Compose::new(vec![
            Box::new(Resize::new(4, 6, Interpolation::Nearest)?),
            Box::new(Normalize::imagenet()),
            Box::new(ToTensorV2::default()),
        ]);
        assert_eq!(pipeline.names(), vec!["Resize", "Normalize", "ToTensorV2"]);

        let output: ImageData = pipeline.apply(gradient(12, 12))?;
        assert_eq!(output.into_tensor()?.shape(), &[3, 4, 6]);
        Ok(())
    }

    #[test]
    fn test_random_draw_is_shared_across_targets() -> Result<()> {
        let pipeline = Compose::new(vec![Box::new(HorizontalFlip { p: 0.5 })])
            .with_additional_targets([("depth_image", "image")])?;

        for seed in 0..16 {
            let targets = Targets::new(gradient(8, 2)).with_target("depth_image", gradient(8, 2));
            let output = pipeline.apply_seeded(targets, seed)?;
            let image = output.get(IMAGE)?.as_image().expect("image");
            let depth = output.get("depth_image")?.as_image().expect("image");
            assert_eq!(image.get_pixel(0, 0), depth.get_pixel(0, 0));
        }
        Ok(())
    }

    #[test]
    fn test_unregistered_target_is_rejected() {
        let pipeline = Compose::new(vec![]);
        let targets = Targets::new(gradient(2, 2)).with_target("depth_image", gradient(2, 2));
        let err = Transform::<Targets, Targets>::apply(&pipeline, targets).unwrap_err();
        assert!(err.to_string().contains("depth_image"));
    }

    #[test]
    fn test_mismatched_target_shapes_fail() -> Result<()> {
        let pipeline = Compose::new(vec![]).with_additional_targets([("depth_image", "image")])?;
        let targets = Targets::new(gradient(4, 4)).with_target("depth_image", gradient(2, 2));
        assert!(pipeline.apply_seeded(targets, 0).is_err());
        Ok(())
    }

    #[test]
    fn test_only_image_targets_supported() {
        let err = Compose::new(vec![])
            .with_additional_targets([("defects", "mask")])
            .unwrap_err();
        assert!(matches!(err, TransformError::InvalidTarget { .. }));
    }

    #[test]
    fn test_operation_downcast() -> Result<()> {
        let pipeline = Compose::new(vec![Box::new(Resize::new(3, 5, Interpolation::Linear)?)]);
        let resize = pipeline.operation::<Resize>(0).expect("resize first");
        assert_eq!((resize.height, resize.width), (3, 5));
        assert!(pipeline.operation::<Normalize>(0).is_none());
        Ok(())
    }
}
