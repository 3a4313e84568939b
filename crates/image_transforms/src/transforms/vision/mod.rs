//! src/transforms/vision/mod.rs
//!
//! Image operations that can appear in a [`Compose`](crate::Compose) pipeline.
//!
//! # Module Organization
//!
//! ```text
//! transforms/vision/
//! ├── geometric.rs     → Spatial transformations (resize, center/random crop)
//! ├── photometric.rs   → Pixel values (normalize, to-float, to-gray)
//! ├── conversion.rs    → Format conversions (image → [C, H, W] tensor)
//! ├── augmentation.rs  → Random flips
//! └── io.rs            → Image loading
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use crate::transforms::{Compose, vision::*};
//!
//! let pipeline = Compose::new(vec![
//!     Box::new(Resize::new(256, 256, Interpolation::Linear)?),
//!     Box::new(Normalize::imagenet()),
//!     Box::new(ToTensorV2::default()),
//! ]);
//! ```

pub mod augmentation;
pub mod conversion;
pub mod geometric;
pub mod io;
pub mod photometric;

pub use augmentation::{HorizontalFlip, VerticalFlip};
pub use conversion::ToTensorV2;
pub use geometric::{CenterCrop, Interpolation, RandomCrop, Resize};
pub use io::LoadImage;
pub use photometric::{Normalize, ToFloat, ToGray};
