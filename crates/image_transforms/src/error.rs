use crate::resolver::ImageSize;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`TransformError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required value is missing or out of range.
    Value,
    /// The config source has an unsupported type.
    Type,
    /// The pipeline definition names or parameterises operations incorrectly.
    Configuration,
    /// Reading or writing a pipeline file failed.
    Io,
}

/// Errors raised while resolving, loading or saving a transform pipeline.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error(
        "Both config and image_size cannot be `None`. Provide either a config to de-serialize \
         transforms or an image_size to get the default transformations"
    )]
    MissingImageSize,

    #[error("Crop size may not be larger than image size. Found {image} and {crop}")]
    CropTooLarge { image: ImageSize, crop: ImageSize },

    #[error("config must be a mapping of operations, a file path or a `Compose` pipeline (got {found})")]
    UnsupportedConfig { found: &'static str },

    #[error("Transformation {0} is not a registered operation")]
    UnknownOperation(String),

    #[error("Invalid parameters for {name}: {reason}")]
    InvalidParameters { name: String, reason: String },

    #[error("Invalid transform setting `{key}`: {reason}")]
    InvalidSetting { key: String, reason: String },

    #[error("Target `{name}` has type `{target_type}`, only `image` targets are supported")]
    InvalidTarget { name: String, target_type: String },

    #[error("Malformed pipeline definition: {0}")]
    Format(String),

    #[error("Failed to access pipeline file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl TransformError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingImageSize | Self::CropTooLarge { .. } => ErrorKind::Value,
            Self::UnsupportedConfig { .. } => ErrorKind::Type,
            Self::UnknownOperation(_)
            | Self::InvalidParameters { .. }
            | Self::InvalidSetting { .. }
            | Self::InvalidTarget { .. }
            | Self::Format(_)
            | Self::Yaml(_) => ErrorKind::Configuration,
            Self::Io { .. } => ErrorKind::Io,
        }
    }

    pub(crate) fn invalid_parameters(name: impl Into<String>, err: anyhow::Error) -> Self {
        Self::InvalidParameters {
            name: name.into(),
            reason: format!("{err:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(TransformError::MissingImageSize.kind(), ErrorKind::Value);
        assert_eq!(
            TransformError::UnsupportedConfig { found: "number" }.kind(),
            ErrorKind::Type
        );
        assert_eq!(
            TransformError::UnknownOperation("Sharpen".into()).kind(),
            ErrorKind::Configuration
        );
    }

    #[test]
    fn test_crop_error_message_lists_both_sizes() {
        let err = TransformError::CropTooLarge {
            image: ImageSize::square(256),
            crop: ImageSize::new(300, 200),
        };
        let msg = err.to_string();
        assert!(msg.contains("(256, 256)"));
        assert!(msg.contains("(300, 200)"));
    }
}
