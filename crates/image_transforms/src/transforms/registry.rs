use crate::error::TransformError;
use crate::transforms::operation::Operation;
use crate::transforms::vision::{
    CenterCrop, HorizontalFlip, Normalize, RandomCrop, Resize, ToFloat, ToGray, ToTensorV2,
    VerticalFlip,
};
use anyhow::Result;
use lazy_static::lazy_static;
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

/// Builds an operation from its (already parsed) YAML parameters.
pub type Constructor = fn(Value) -> Result<Box<dyn Operation>>;

lazy_static! {
    static ref BUILTIN: OperationRegistry = OperationRegistry::builtin();
}

/// Table of operation names and their typed constructors.
///
/// The built-in table is assembled once per process; [`OperationRegistry::global`]
/// hands out a shared reference to it. Lookups accept fully qualified class
/// names (`pytorch.transforms.ToTensorV2`) by matching the last dotted segment.
#[derive(Debug, Default, Clone)]
pub struct OperationRegistry {
    constructors: BTreeMap<&'static str, Constructor>,
}

fn construct<T>(params: Value) -> Result<Box<dyn Operation>>
where
    T: Operation + DeserializeOwned + 'static,
{
    let params = match params {
        Value::Null => Value::Mapping(Mapping::new()),
        other => other,
    };
    let operation: T = serde_yaml::from_value(params)?;
    operation.validate()?;
    Ok(Box::new(operation))
}

/// `pytorch.transforms.ToTensorV2` -> `ToTensorV2`
pub(crate) fn short_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

impl OperationRegistry {
    /// The registry of built-in operations.
    pub fn global() -> &'static OperationRegistry {
        &BUILTIN
    }

    fn builtin() -> Self {
        let mut registry = Self::default();
        registry.register("Resize", construct::<Resize>);
        registry.register("CenterCrop", construct::<CenterCrop>);
        registry.register("RandomCrop", construct::<RandomCrop>);
        registry.register("Normalize", construct::<Normalize>);
        registry.register("ToFloat", construct::<ToFloat>);
        registry.register("ToGray", construct::<ToGray>);
        registry.register("HorizontalFlip", construct::<HorizontalFlip>);
        registry.register("VerticalFlip", construct::<VerticalFlip>);
        registry.register("ToTensorV2", construct::<ToTensorV2>);
        registry
    }

    /// Adds or replaces a constructor.
    pub fn register(&mut self, name: &'static str, constructor: Constructor) {
        self.constructors.insert(name, constructor);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(short_name(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.constructors.keys().copied()
    }

    pub fn build(&self, name: &str, params: Value) -> Result<Box<dyn Operation>, TransformError> {
        let key = short_name(name);
        let constructor = self
            .constructors
            .get(key)
            .ok_or_else(|| TransformError::UnknownOperation(name.to_string()))?;
        constructor(params).map_err(|err| TransformError::invalid_parameters(key, err))
    }
}
