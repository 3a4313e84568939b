pub mod compose;
pub mod core;
pub mod operation;
pub mod registry;
mod serialize;
pub mod vision;

pub use self::core::{Chain, Transform};
pub use compose::Compose;
pub use operation::Operation;
pub use registry::OperationRegistry;
