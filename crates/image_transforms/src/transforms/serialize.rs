//! YAML pipeline files.
//!
//! The layout follows the serialization format of common augmentation
//! libraries, so files they write with only supported operations load here:
//!
//! ```yaml
//! __version__: 0.1.0
//! transform:
//!   __class_fullname__: Compose
//!   additional_targets: {image: image, depth_image: image}
//!   transforms:
//!     - {__class_fullname__: Resize, height: 256, width: 256, interpolation: 1}
//!     - {__class_fullname__: pytorch.transforms.ToTensorV2, transpose_mask: false}
//! ```
//!
//! Keys an operation does not know (`always_apply`, `p` on deterministic
//! operations, ...) are ignored on load.

use crate::error::TransformError;
use crate::transforms::registry::OperationRegistry;
use crate::transforms::Compose;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::Path;
use tracing::debug;

const CLASS_KEY: &str = "__class_fullname__";
const VERSION_KEY: &str = "__version__";
const COMPOSE_CLASS: &str = "Compose";

fn io_error(path: &Path, source: std::io::Error) -> TransformError {
    TransformError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn class_name(entry: &Mapping) -> Result<&str, TransformError> {
    entry
        .get(CLASS_KEY)
        .and_then(Value::as_str)
        .ok_or_else(|| TransformError::Format(format!("entry without a string `{CLASS_KEY}`")))
}

impl Compose {
    /// Reads a pipeline file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TransformError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| io_error(path, err))?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, TransformError> {
        let document: Value = serde_yaml::from_str(text)?;
        Self::from_value(&document)
    }

    /// Builds a pipeline from a parsed document, with or without the
    /// top-level `transform` wrapper.
    pub fn from_value(document: &Value) -> Result<Self, TransformError> {
        let root = document
            .as_mapping()
            .ok_or_else(|| TransformError::Format("document must be a mapping".into()))?;
        if let Some(version) = root.get(VERSION_KEY) {
            debug!(version = ?version, "Pipeline file version");
        }
        let compose = match root.get("transform") {
            Some(Value::Mapping(inner)) => inner,
            Some(_) => return Err(TransformError::Format("`transform` must be a mapping".into())),
            None => root,
        };

        let class = class_name(compose)?;
        if class.rsplit('.').next() != Some(COMPOSE_CLASS) {
            return Err(TransformError::Format(format!(
                "top-level transform must be `{COMPOSE_CLASS}`, found `{class}`"
            )));
        }

        let entries = match compose.get("transforms") {
            Some(Value::Sequence(entries)) => entries.as_slice(),
            Some(Value::Null) | None => &[],
            Some(_) => return Err(TransformError::Format("`transforms` must be a list".into())),
        };

        let registry = OperationRegistry::global();
        let mut operations = Vec::with_capacity(entries.len());
        for entry in entries {
            let entry = entry
                .as_mapping()
                .ok_or_else(|| TransformError::Format("each transform must be a mapping".into()))?;
            let name = class_name(entry)?;
            let mut params = entry.clone();
            params.remove(CLASS_KEY);
            operations.push(registry.build(name, Value::Mapping(params))?);
        }

        let additional_targets = match compose.get("additional_targets") {
            Some(Value::Mapping(targets)) => targets
                .iter()
                .map(|(name, target_type)| match (name.as_str(), target_type.as_str()) {
                    (Some(name), Some(target_type)) => {
                        Ok((name.to_string(), target_type.to_string()))
                    }
                    _ => Err(TransformError::Format(
                        "`additional_targets` must map names to types".into(),
                    )),
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(Value::Null) | None => Vec::new(),
            Some(_) => {
                return Err(TransformError::Format(
                    "`additional_targets` must be a mapping".into(),
                ))
            }
        };

        Compose::new(operations).with_additional_targets(additional_targets)
    }

    pub fn to_value(&self) -> Result<Value, TransformError> {
        let mut transforms = Vec::with_capacity(self.len());
        for operation in self.operations() {
            let params = operation
                .params()
                .map_err(|err| TransformError::invalid_parameters(operation.name(), err))?;
            let mut entry = Mapping::new();
            entry.insert(CLASS_KEY.into(), operation.name().into());
            if let Value::Mapping(params) = params {
                entry.extend(params);
            }
            transforms.push(Value::Mapping(entry));
        }

        let targets: Mapping = self
            .additional_targets()
            .iter()
            .map(|(name, target_type)| (Value::from(name.as_str()), Value::from(target_type.as_str())))
            .collect();

        let mut compose = Mapping::new();
        compose.insert(CLASS_KEY.into(), COMPOSE_CLASS.into());
        compose.insert("additional_targets".into(), Value::Mapping(targets));
        compose.insert("transforms".into(), Value::Sequence(transforms));

        let mut document = Mapping::new();
        document.insert(VERSION_KEY.into(), env!("CARGO_PKG_VERSION").into());
        document.insert("transform".into(), Value::Mapping(compose));
        Ok(Value::Mapping(document))
    }

    pub fn to_yaml_string(&self) -> Result<String, TransformError> {
        Ok(serde_yaml::to_string(&self.to_value()?)?)
    }

    /// Writes the pipeline in the format [`Compose::load`] reads.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TransformError> {
        let path = path.as_ref();
        fs::write(path, self.to_yaml_string()?).map_err(|err| io_error(path, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::transforms::vision::{Interpolation, Resize, ToTensorV2};
    use anyhow::Result;

    const LIBRARY_DUMP: &str = r#"
__version__: 1.3.1
transform:
  __class_fullname__: Compose
  additional_targets:
    image: image
    depth_image: image
  bbox_params: null
  is_check_shapes: true
  keypoint_params: null
  p: 1.0
  transforms:
  - __class_fullname__: Resize
    always_apply: true
    height: 256
    interpolation: 1
    p: 1
    width: 256
  - __class_fullname__: HorizontalFlip
    always_apply: false
    p: 0.25
  - __class_fullname__: pytorch.transforms.ToTensorV2
    always_apply: true
    p: 1.0
    transpose_mask: false
"#;

    #[test]
    fn test_load_library_dump() -> Result<()> {
        let pipeline = Compose::from_yaml_str(LIBRARY_DUMP)?;
        assert_eq!(pipeline.names(), vec!["Resize", "HorizontalFlip", "ToTensorV2"]);
        assert_eq!(pipeline.additional_targets().len(), 2);

        let resize = pipeline.operation::<Resize>(0).expect("resize");
        assert_eq!((resize.height, resize.width), (256, 256));
        assert_eq!(resize.interpolation, Interpolation::Linear);
        Ok(())
    }

    #[test]
    fn test_save_then_load_preserves_operations() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("transforms.yaml");

        let pipeline = Compose::new(vec![
            Box::new(Resize::new(64, 32, Interpolation::Cubic)?),
            Box::new(ToTensorV2::default()),
        ])
        .with_additional_targets([("depth_image", "image")])?;
        pipeline.save(&path)?;

        let loaded = Compose::load(&path)?;
        assert_eq!(loaded.names(), pipeline.names());
        assert_eq!(loaded.operation::<Resize>(0), pipeline.operation::<Resize>(0));
        assert_eq!(loaded.additional_targets(), pipeline.additional_targets());
        Ok(())
    }

    #[test]
    fn test_unknown_class_in_file() {
        let text = "transform: {__class_fullname__: Compose, transforms: [{__class_fullname__: OneOf}]}";
        let err = Compose::from_yaml_str(text).unwrap_err();
        assert!(matches!(err, TransformError::UnknownOperation(_)));
    }

    #[test]
    fn test_top_level_must_be_compose() {
        let err = Compose::from_yaml_str("transform: {__class_fullname__: Resize}").unwrap_err();
        assert!(matches!(err, TransformError::Format(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Compose::load("/nonexistent/transforms.yaml").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
