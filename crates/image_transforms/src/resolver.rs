//! Resolves the image pipeline of a run from configuration or from sizes.
//!
//! ```ignore
//! // Default pipeline: Resize -> CenterCrop -> Normalize(imagenet) -> ToTensorV2
//! let pipeline = TransformSettings::builder()
//!     .image_size(256)
//!     .center_crop(224)
//!     .build()
//!     .resolve()?;
//!
//! // Pipeline file written by `Compose::save` or an augmentation library
//! let pipeline = TransformSettings::builder()
//!     .config(TransformSource::File("transforms.yaml".into()))
//!     .build()
//!     .resolve()?;
//! ```

use crate::error::TransformError;
use crate::transforms::vision::{CenterCrop, Interpolation, Normalize, Resize, ToFloat, ToTensorV2};
use crate::transforms::registry::short_name;
use crate::transforms::{Compose, Operation, OperationRegistry};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_yaml::{Mapping, Value};
use std::fmt;
use std::path::PathBuf;
use strum::{Display, EnumIter, EnumString};
use tracing::info;

/// Targets every resolved pipeline accepts.
pub const DEFAULT_TARGETS: [(&str, &str); 2] = [("image", "image"), ("depth_image", "image")];

// ============================================================================
// Settings types
// ============================================================================

/// Normalization applied by the default pipeline.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NormalizationMethod {
    /// Scale 8-bit pixels into `[0, 1]` only.
    None,
    #[default]
    Imagenet,
    Clip,
}

impl NormalizationMethod {
    /// The operation implementing this method.
    pub fn operation(self) -> Box<dyn Operation> {
        match self {
            Self::None => Box::new(ToFloat::default()),
            Self::Imagenet => Box::new(Normalize::imagenet()),
            Self::Clip => Box::new(Normalize::clip()),
        }
    }
}

/// Height and width of an image. Configuration may give a single integer for
/// a square or a `[height, width]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub height: u32,
    pub width: u32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SizeRepr {
    Square(u32),
    Pair(u32, u32),
}

impl<'de> Deserialize<'de> for ImageSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match SizeRepr::deserialize(deserializer)? {
            SizeRepr::Square(side) => Self::square(side),
            SizeRepr::Pair(height, width) => Self::new(height, width),
        })
    }
}

impl Serialize for ImageSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.height, self.width).serialize(serializer)
    }
}

impl ImageSize {
    pub fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }

    pub fn square(side: u32) -> Self {
        Self::new(side, side)
    }

    /// Whether `other` fits inside `self` in both dimensions.
    pub fn contains(&self, other: &ImageSize) -> bool {
        other.height <= self.height && other.width <= self.width
    }
}

impl From<u32> for ImageSize {
    fn from(side: u32) -> Self {
        Self::square(side)
    }
}

impl From<(u32, u32)> for ImageSize {
    fn from((height, width): (u32, u32)) -> Self {
        Self::new(height, width)
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.height, self.width)
    }
}

/// Where a pipeline comes from.
#[derive(Debug)]
pub enum TransformSource {
    /// Operation name -> parameters, applied in mapping order.
    Operations(Mapping),
    /// A YAML pipeline file.
    File(PathBuf),
    /// A pipeline that is used as is.
    Pipeline(Compose),
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

impl TransformSource {
    /// Interprets a dynamic config value: mappings list operations, strings
    /// name a pipeline file, anything else is a type error.
    pub fn from_value(value: Value) -> Result<Self, TransformError> {
        match value {
            Value::Mapping(operations) => Ok(Self::Operations(operations)),
            Value::String(path) => Ok(Self::File(PathBuf::from(path))),
            other => Err(TransformError::UnsupportedConfig {
                found: value_kind(&other),
            }),
        }
    }
}

impl From<Compose> for TransformSource {
    fn from(pipeline: Compose) -> Self {
        Self::Pipeline(pipeline)
    }
}

impl From<Mapping> for TransformSource {
    fn from(operations: Mapping) -> Self {
        Self::Operations(operations)
    }
}

impl From<PathBuf> for TransformSource {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

// ============================================================================
// TransformSettings
// ============================================================================

/// Inputs of [`get_transforms`].
#[derive(Debug)]
pub struct TransformSettings {
    /// Pipeline definition; when set, the size fields only matter for
    /// `Operations` (a missing `Resize` is prepended).
    pub config: Option<TransformSource>,
    pub image_size: Option<ImageSize>,
    pub center_crop: Option<ImageSize>,
    pub normalization: NormalizationMethod,
    /// Append `ToTensorV2` to the default pipeline (defaults to true)
    pub to_tensor: bool,
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            config: None,
            image_size: None,
            center_crop: None,
            normalization: NormalizationMethod::default(),
            to_tensor: true,
        }
    }
}

fn setting<T: DeserializeOwned>(section: &Mapping, key: &str) -> Result<Option<T>, TransformError> {
    match section.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_yaml::from_value(value.clone())
            .map(Some)
            .map_err(|err| TransformError::InvalidSetting {
                key: key.to_string(),
                reason: err.to_string(),
            }),
    }
}

impl TransformSettings {
    pub fn builder() -> TransformSettingsBuilder {
        TransformSettingsBuilder::default()
    }

    /// Reads `image_size`, `center_crop`, `normalization`, `to_tensor` and
    /// `transform_config` from a data section such as `data.init_args`.
    pub fn from_config(section: &Value) -> Result<Self, TransformError> {
        let Some(section) = section.as_mapping() else {
            return Err(TransformError::InvalidSetting {
                key: "data".into(),
                reason: format!("expected a mapping, found {}", value_kind(section)),
            });
        };

        let config = match section.get("transform_config") {
            None | Some(Value::Null) => None,
            Some(value) => Some(TransformSource::from_value(value.clone())?),
        };

        Ok(Self {
            config,
            image_size: setting(section, "image_size")?,
            center_crop: setting(section, "center_crop")?,
            normalization: setting(section, "normalization")?.unwrap_or_default(),
            to_tensor: setting(section, "to_tensor")?.unwrap_or(true),
        })
    }

    pub fn resolve(self) -> Result<Compose, TransformError> {
        get_transforms(self)
    }
}

/// Builder for [`TransformSettings`] with method chaining
#[derive(Debug, Default)]
pub struct TransformSettingsBuilder {
    settings: TransformSettings,
}

impl TransformSettingsBuilder {
    pub fn config(mut self, config: impl Into<TransformSource>) -> Self {
        self.settings.config = Some(config.into());
        self
    }

    pub fn image_size(mut self, size: impl Into<ImageSize>) -> Self {
        self.settings.image_size = Some(size.into());
        self
    }

    pub fn center_crop(mut self, size: impl Into<ImageSize>) -> Self {
        self.settings.center_crop = Some(size.into());
        self
    }

    pub fn normalization(mut self, method: NormalizationMethod) -> Self {
        self.settings.normalization = method;
        self
    }

    pub fn to_tensor(mut self, to_tensor: bool) -> Self {
        self.settings.to_tensor = to_tensor;
        self
    }

    pub fn build(self) -> TransformSettings {
        self.settings
    }
}

// ============================================================================
// Resolution
// ============================================================================

fn resize(size: ImageSize) -> Result<Box<dyn Operation>, TransformError> {
    let resize = Resize::new(size.height, size.width, Interpolation::default())
        .map_err(|err| TransformError::invalid_parameters("Resize", err))?;
    Ok(Box::new(resize))
}

/// Returns the pipeline described by `settings`.
///
/// - `Operations`: optional leading `Resize` (only when the mapping has none
///   and an image size is set), then every listed operation, then `ToTensorV2`.
/// - `File`: the pipeline stored in the file.
/// - `Pipeline`: returned unchanged.
/// - no config: `Resize` -> optional `CenterCrop` -> normalization -> optional
///   `ToTensorV2`; requires an image size.
pub fn get_transforms(settings: TransformSettings) -> Result<Compose, TransformError> {
    match settings.config {
        Some(TransformSource::Operations(operations)) => {
            from_operations(operations, settings.image_size)
        }
        Some(TransformSource::File(path)) => {
            info!(path = %path.display(), "Reading transforms from pipeline file");
            Compose::load(&path)
        }
        Some(TransformSource::Pipeline(pipeline)) => {
            info!("Transforms loaded from Compose pipeline");
            Ok(pipeline)
        }
        None => default_transforms(
            settings.image_size,
            settings.center_crop,
            settings.normalization,
            settings.to_tensor,
        ),
    }
}

fn from_operations(
    operations: Mapping,
    image_size: Option<ImageSize>,
) -> Result<Compose, TransformError> {
    info!("Loading transforms from config");
    let registry = OperationRegistry::global();
    let mut steps: Vec<Box<dyn Operation>> = Vec::with_capacity(operations.len() + 2);

    let has_resize = operations
        .keys()
        .filter_map(Value::as_str)
        .any(|name| short_name(name) == "Resize");
    if !has_resize {
        if let Some(size) = image_size {
            steps.push(resize(size)?);
            info!(height = size.height, width = size.width, "Resize added");
        }
    }

    for (key, params) in operations {
        let name = key.as_str().ok_or_else(|| {
            TransformError::UnknownOperation(serde_yaml::to_string(&key).unwrap_or_default())
        })?;
        let operation = registry.build(name, params)?;
        info!(operation = ?operation, "Transform added");
        steps.push(operation);
    }

    steps.push(Box::new(ToTensorV2::default()));
    Compose::new(steps).with_additional_targets(DEFAULT_TARGETS)
}

fn default_transforms(
    image_size: Option<ImageSize>,
    center_crop: Option<ImageSize>,
    normalization: NormalizationMethod,
    to_tensor: bool,
) -> Result<Compose, TransformError> {
    info!("No config has been provided. Using default transforms.");
    let size = image_size.ok_or(TransformError::MissingImageSize)?;
    let mut steps = vec![resize(size)?];

    if let Some(crop) = center_crop {
        if !size.contains(&crop) {
            return Err(TransformError::CropTooLarge { image: size, crop });
        }
        let crop = CenterCrop::new(crop.height, crop.width)
            .map_err(|err| TransformError::invalid_parameters("CenterCrop", err))?;
        steps.push(Box::new(crop));
    }

    steps.push(normalization.operation());

    if to_tensor {
        steps.push(Box::new(ToTensorV2::default()));
    }

    Compose::new(steps).with_additional_targets(DEFAULT_TARGETS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_image_size_from_config_values() -> Result<()> {
        let square: ImageSize = serde_yaml::from_str("256")?;
        let pair: ImageSize = serde_yaml::from_str("[256, 128]")?;
        assert_eq!(square, ImageSize::new(256, 256));
        assert_eq!(pair, ImageSize::new(256, 128));
        Ok(())
    }

    #[test]
    fn test_normalization_names() -> Result<()> {
        assert_eq!(NormalizationMethod::from_str("clip")?, NormalizationMethod::Clip);
        assert_eq!(NormalizationMethod::None.to_string(), "none");
        let parsed: NormalizationMethod = serde_yaml::from_str("imagenet")?;
        assert_eq!(parsed, NormalizationMethod::Imagenet);
        Ok(())
    }

    #[test]
    fn test_every_method_has_an_operation() {
        for method in NormalizationMethod::iter() {
            let name = method.operation().name();
            assert!(name == "Normalize" || name == "ToFloat");
        }
    }

    #[test]
    fn test_source_from_value() {
        assert!(matches!(
            TransformSource::from_value(Value::from("transforms.yaml")),
            Ok(TransformSource::File(_))
        ));
        assert!(matches!(
            TransformSource::from_value(Value::Mapping(Mapping::new())),
            Ok(TransformSource::Operations(_))
        ));
        assert!(matches!(
            TransformSource::from_value(Value::from(42)),
            Err(TransformError::UnsupportedConfig { found: "number" })
        ));
    }

    #[test]
    fn test_settings_from_config() -> Result<()> {
        let section: Value = serde_yaml::from_str(
            "{image_size: [256, 192], center_crop: 128, normalization: clip, to_tensor: false}",
        )?;
        let settings = TransformSettings::from_config(&section)?;
        assert_eq!(settings.image_size, Some(ImageSize::new(256, 192)));
        assert_eq!(settings.center_crop, Some(ImageSize::square(128)));
        assert_eq!(settings.normalization, NormalizationMethod::Clip);
        assert!(!settings.to_tensor);
        assert!(settings.config.is_none());
        Ok(())
    }

    #[test]
    fn test_settings_reject_bad_values() -> Result<()> {
        let section: Value = serde_yaml::from_str("{normalization: zscore}")?;
        assert!(matches!(
            TransformSettings::from_config(&section),
            Err(TransformError::InvalidSetting { .. })
        ));

        let section: Value = serde_yaml::from_str("{transform_config: [Resize]}")?;
        assert!(matches!(
            TransformSettings::from_config(&section),
            Err(TransformError::UnsupportedConfig { found: "sequence" })
        ));
        Ok(())
    }
}
