use serde::{Deserialize, Serialize};

/// Returned once from a successful upload. Nothing here is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub filename: String,
    pub original_name: String,
    pub size: u64,
    pub content_type: String,
}

#[derive(Debug)]
pub struct ImageUpload {
    pub original_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// An opened stored image, ready to be streamed back.
#[derive(Debug)]
pub struct ImageFile {
    pub filename: String,
    pub content_type: &'static str,
    pub size: u64,
    pub file: tokio::fs::File,
}
