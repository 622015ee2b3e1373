use axum::{
    body::Body,
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

use crate::{
    error::{AppError, Result},
    images::{ImageMetadata, ImageUpload, ValidationError},
    AppState,
};

pub const UPLOAD_FIELD: &str = "file";

pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ImageMetadata>> {
    let validator = state.storage.validator();

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let original_name = field
            .file_name()
            .ok_or_else(|| AppError::BadRequest("Missing filename".to_string()))?
            .to_string();

        let content_type = field.content_type().unwrap_or_default().to_string();

        let declared_size = field
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        if declared_size.is_some() {
            validator
                .validate_declared(declared_size, &content_type)
                .map_err(|e| rejected(&original_name, e))?;
        }

        let mut data = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            validator
                .validate_size((data.len() + chunk.len()) as u64)
                .map_err(|e| rejected(&original_name, e))?;
            data.extend_from_slice(&chunk);
        }

        // Without a declared length the size is only known now.
        validator
            .validate_content_type(&content_type)
            .map_err(|e| rejected(&original_name, e))?;

        let metadata = state
            .storage
            .store(ImageUpload {
                original_name,
                content_type,
                data,
            })
            .await?;

        info!(
            filename = %metadata.filename,
            original_name = %metadata.original_name,
            size = metadata.size,
            content_type = %metadata.content_type,
            "image uploaded"
        );

        return Ok(Json(metadata));
    }

    Err(AppError::BadRequest("No file found in request".to_string()))
}

pub async fn download_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response> {
    let image = state.storage.open(&filename).await?;

    info!(filename = %image.filename, size = image.size, "serving image");

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(image.content_type));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(image.size));
    headers.insert(header::CONTENT_DISPOSITION, content_disposition(&image.filename));

    let body = Body::from_stream(ReaderStream::new(image.file));

    Ok((StatusCode::OK, headers, body).into_response())
}

pub async fn square() -> Json<u32> {
    Json(2u32.pow(2))
}

fn rejected(original_name: &str, err: ValidationError) -> AppError {
    warn!(original_name = %original_name, error = %err, "rejected upload");
    err.into()
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::BadRequest(format!("Failed to read multipart field: {}", err.body_text()))
    }
}

fn content_disposition(filename: &str) -> HeaderValue {
    let value = if filename.bytes().all(|b| (0x20..0x7f).contains(&b)) {
        format!(
            "attachment; filename=\"{}\"",
            filename.replace('\\', "\\\\").replace('"', "\\\"")
        )
    } else {
        format!("attachment; filename*=utf-8''{}", percent_encode(filename))
    };

    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

// RFC 5987 attr-char
fn percent_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9'
            | b'!' | b'#' | b'$' | b'&' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition("abc.png"),
            HeaderValue::from_static("attachment; filename=\"abc.png\"")
        );
        assert_eq!(
            content_disposition("a\"b.png"),
            HeaderValue::from_static("attachment; filename=\"a\\\"b.png\"")
        );
    }

    #[test]
    fn test_content_disposition_non_ascii() {
        assert_eq!(
            content_disposition("ä.png"),
            HeaderValue::from_static("attachment; filename*=utf-8''%C3%A4.png")
        );
    }

    #[tokio::test]
    async fn test_square() {
        let Json(value) = square().await;
        assert_eq!(value, 4);
    }
}
