pub mod error;
pub mod resolver;
pub mod targets;
pub mod transforms;

pub use error::{ErrorKind, TransformError};
pub use resolver::{get_transforms, ImageSize, NormalizationMethod, TransformSettings, TransformSource};
pub use targets::{ImageData, Targets};
pub use transforms::{Compose, Operation, OperationRegistry, Transform};
