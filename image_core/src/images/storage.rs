use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs as async_fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::{AppError, Result};
use super::models::{ImageFile, ImageMetadata, ImageUpload};
use super::validation::ImageValidator;

const TEMP_PREFIX: &str = ".upload-";
const TEMP_SUFFIX: &str = ".part";

/// The upload directory plus the rules for what may go into it.
#[derive(Clone)]
pub struct ImageStorage {
    root: Arc<PathBuf>,
    validator: ImageValidator,
}

impl ImageStorage {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: Arc::new(config.upload_dir.clone()),
            validator: ImageValidator::from_config(config),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn validator(&self) -> &ImageValidator {
        &self.validator
    }

    pub async fn initialize(&self) -> Result<()> {
        if !self.root.exists() {
            async_fs::create_dir_all(self.root.as_path()).await?;
            info!(path = %self.root.display(), "created storage directory");
        }
        Ok(())
    }

    pub async fn is_available(&self) -> bool {
        async_fs::metadata(self.root.as_path())
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// Writes an already validated upload under a fresh name.
    ///
    /// The bytes go to a hidden temporary file in the storage directory first
    /// and are renamed into place once flushed, so a failed write never leaves
    /// anything behind under the public name.
    pub async fn store(&self, upload: ImageUpload) -> Result<ImageMetadata> {
        let filename = generated_filename(Uuid::new_v4(), extension_of(&upload.original_name));
        let size = upload.data.len() as u64;

        let dir = self.root.to_path_buf();
        let target = dir.join(&filename);
        let data = upload.data;

        tokio::task::spawn_blocking(move || write_atomically(&dir, &target, &data))
            .await
            .map_err(|e| AppError::InternalError(e.to_string()))?
            .map_err(|e| AppError::InternalError(e.to_string()))?;

        debug!(filename = %filename, size, "stored image");

        Ok(ImageMetadata {
            filename,
            original_name: upload.original_name,
            size,
            content_type: upload.content_type,
        })
    }

    /// Opens a stored image by its public name.
    pub async fn open(&self, filename: &str) -> Result<ImageFile> {
        if !is_safe_filename(filename) {
            return Err(AppError::BadRequest(format!("Invalid filename: {:?}", filename)));
        }

        let path = self.root.join(filename);
        let metadata = match async_fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Err(image_not_found()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(image_not_found()),
            Err(e) => return Err(e.into()),
        };

        let file = match async_fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(image_not_found()),
            Err(e) => return Err(e.into()),
        };

        Ok(ImageFile {
            filename: filename.to_string(),
            content_type: content_type_for(filename),
            size: metadata.len(),
            file,
        })
    }
}

fn image_not_found() -> AppError {
    AppError::NotFound("Image not found".to_string())
}

fn write_atomically(dir: &Path, target: &Path, data: &[u8]) -> io::Result<()> {
    let mut temp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(dir)?;

    temp.write_all(data)?;
    temp.as_file().sync_all()?;
    temp.persist(target).map_err(|e| e.error)?;

    Ok(())
}

/// Extension of a client-supplied name: whatever follows the last `.` of the
/// final path component, or `""`.
pub fn extension_of(original_name: &str) -> &str {
    let base = original_name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(original_name);

    match base.rfind('.') {
        Some(idx) => &base[idx + 1..],
        None => "",
    }
}

/// `<uuid>.<ext>`, or the bare `<uuid>` when there is no extension (never a trailing dot).
pub fn generated_filename(id: Uuid, extension: &str) -> String {
    if extension.is_empty() {
        id.to_string()
    } else {
        format!("{}.{}", id, extension)
    }
}

/// Rejects anything that could leave the storage directory or reach a hidden
/// file, which includes in-flight temporary uploads.
pub fn is_safe_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.starts_with('.')
        && !filename.contains(|c: char| c == '/' || c == '\\' || c == '\0')
}

pub fn content_type_for(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
