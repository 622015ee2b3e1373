pub mod models;
pub mod storage;
pub mod validation;

pub use models::{ImageFile, ImageMetadata, ImageUpload};
pub use storage::{content_type_for, ImageStorage};
pub use validation::{ImageValidator, ValidationError};
