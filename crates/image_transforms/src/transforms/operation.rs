use crate::targets::ImageData;
use anyhow::Result;
use rand::rngs::StdRng;
use serde::Serialize;
use serde_yaml::Value;
use std::any::Any;
use std::fmt::Debug;

/// One named step of a [`Compose`](super::Compose) pipeline.
///
/// Operations are plain serde structs so that the registry can build them
/// from configuration and [`Compose::save`](super::Compose::save) can write
/// them back. Random operations draw from the `rng` handed in by the pipeline;
/// the pipeline seeds it identically for every target of one call.
pub trait Operation: Debug + Send + Sync {
    /// Registry name of the operation (e.g. `"Resize"`).
    fn name(&self) -> &'static str;

    fn apply(&self, data: ImageData, rng: &mut StdRng) -> Result<ImageData>;

    /// Parameters as written to a pipeline file.
    fn params(&self) -> Result<Value>;

    /// Checks parameters that serde cannot express.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any;
}

pub(crate) fn to_params<T: Serialize>(operation: &T) -> Result<Value> {
    Ok(serde_yaml::to_value(operation)?)
}
