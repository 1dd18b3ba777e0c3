//! Multipart form reading shared by the upload and analyze endpoints

use std::collections::HashMap;

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;

use crate::services::UploadedImage;
use crate::ApiError;

/// Form field carrying the photo
pub const IMAGE_FIELD: &str = "image";

/// A parsed multipart form: the photo plus plain text fields
#[derive(Debug, Default)]
pub struct CatchForm {
    pub image: Option<UploadedImage>,
    fields: HashMap<String, String>,
}

impl CatchForm {
    /// Read every field; unknown file fields are ignored
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = CatchForm::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();

            if name == IMAGE_FIELD {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;

                // A file input left empty still submits a nameless part
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                form.image = Some(UploadedImage {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            } else if field.file_name().is_none() {
                let value = field.text().await.map_err(multipart_error)?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// Trimmed text field, `None` when absent or blank
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    pub fn take_image(&mut self) -> Result<UploadedImage, ApiError> {
        self.image
            .take()
            .ok_or_else(|| ApiError::BadRequest("No image file provided".to_string()))
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}
