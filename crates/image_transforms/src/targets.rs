use anyhow::{anyhow, ensure, Result};
use image::DynamicImage;
use ndarray::Array3;
use std::collections::BTreeMap;

/// Name of the primary target every pipeline call must carry.
pub const IMAGE: &str = "image";

/// A single value flowing through a pipeline.
///
/// Operations before tensor conversion work on decoded images (HWC, 8-bit or
/// 32-bit float). `ToTensorV2` turns them into channel-first `[C, H, W]`
/// float tensors.
#[derive(Debug, Clone)]
pub enum ImageData {
    Image(DynamicImage),
    Tensor(Array3<f32>),
}

impl ImageData {
    /// Returns `(height, width)`.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            ImageData::Image(img) => (img.height(), img.width()),
            ImageData::Tensor(tensor) => {
                let (_, height, width) = tensor.dim();
                (height as u32, width as u32)
            }
        }
    }

    pub fn as_image(&self) -> Option<&DynamicImage> {
        match self {
            ImageData::Image(img) => Some(img),
            ImageData::Tensor(_) => None,
        }
    }

    pub fn as_tensor(&self) -> Option<&Array3<f32>> {
        match self {
            ImageData::Tensor(tensor) => Some(tensor),
            ImageData::Image(_) => None,
        }
    }

    pub fn into_image(self) -> Result<DynamicImage> {
        match self {
            ImageData::Image(img) => Ok(img),
            ImageData::Tensor(tensor) => Err(anyhow!(
                "Expected an image but found a tensor of shape {:?}",
                tensor.shape()
            )),
        }
    }

    pub fn into_tensor(self) -> Result<Array3<f32>> {
        match self {
            ImageData::Tensor(tensor) => Ok(tensor),
            ImageData::Image(img) => Err(anyhow!(
                "Expected a tensor but found a {}x{} image",
                img.width(),
                img.height()
            )),
        }
    }
}

impl From<DynamicImage> for ImageData {
    fn from(img: DynamicImage) -> Self {
        ImageData::Image(img)
    }
}

impl From<Array3<f32>> for ImageData {
    fn from(tensor: Array3<f32>) -> Self {
        ImageData::Tensor(tensor)
    }
}

/// The named inputs of one pipeline call.
///
/// Always holds an [`IMAGE`] entry; extra entries (e.g. `"depth_image"`) must
/// be registered as additional targets on the pipeline that processes them.
///
/// # Example
/// ```ignore
/// let targets = Targets::new(rgb).with_target("depth_image", depth);
/// let output = pipeline.apply(targets)?;
/// let image = output.get("image")?;
/// ```
///
/// The map is private so the primary image cannot be dropped from outside:
///
/// ```compile_fail
/// let mut targets = image_transforms::Targets::new(image::DynamicImage::new_rgb8(1, 1));
/// targets.targets.clear();
/// ```
#[derive(Debug, Clone)]
pub struct Targets {
    targets: BTreeMap<String, ImageData>,
}

impl Targets {
    /// Creates targets holding only the primary image.
    pub fn new(image: impl Into<ImageData>) -> Self {
        Self {
            targets: BTreeMap::from([(IMAGE.to_string(), image.into())]),
        }
    }

    /// Adds or overwrites a target.
    pub fn with_target(mut self, name: impl Into<String>, data: impl Into<ImageData>) -> Self {
        self.targets.insert(name.into(), data.into());
        self
    }

    pub fn get(&self, name: &str) -> Result<&ImageData> {
        self.targets
            .get(name)
            .ok_or_else(|| anyhow!("Target {} not found", name))
    }

    /// Removes an additional target. The primary image stays; use
    /// [`Targets::into_image`] to take it.
    pub fn remove(&mut self, name: &str) -> Result<ImageData> {
        ensure!(name != IMAGE, "The `{}` target cannot be removed", IMAGE);
        self.targets
            .remove(name)
            .ok_or_else(|| anyhow!("Target {} not found", name))
    }

    /// Consumes the targets, keeping only the primary image.
    pub fn into_image(mut self) -> Result<ImageData> {
        self.targets
            .remove(IMAGE)
            .ok_or_else(|| anyhow!("Target {} not found", IMAGE))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.targets.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.targets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// All targets must share height and width with the primary image.
    pub(crate) fn check_shapes(&self) -> Result<()> {
        let expected = self.get(IMAGE)?.dimensions();
        for (name, data) in &self.targets {
            let found = data.dimensions();
            ensure!(
                found == expected,
                "Target `{}` has shape {:?} (height, width) but `{}` has {:?}",
                name,
                found,
                IMAGE,
                expected
            );
        }
        Ok(())
    }

    pub(crate) fn try_map<F>(self, mut f: F) -> Result<Self>
    where
        F: FnMut(&str, ImageData) -> Result<ImageData>,
    {
        let targets = self
            .targets
            .into_iter()
            .map(|(name, data)| {
                let data = f(&name, data)?;
                Ok((name, data))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(Self { targets })
    }
}
