/// Multipart form reading
///
/// Collects text fields into a map and buffers at most one file part,
/// enforcing the upload size limit while streaming. Forms with more than
/// [`MAX_FORM_PARTS`] parts are rejected.

use std::collections::HashMap;

use actix_multipart::Multipart;
use futures::StreamExt;

use crate::error::{AppError, ValidationError};
use crate::uploads::UploadError;

const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;
/// Upper bound on parts per form, file parts included
pub const MAX_FORM_PARTS: usize = 16;

#[derive(Debug)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    pub file: Option<UploadedFile>,
}

impl MultipartForm {
    /// Text value of a field, empty when absent
    pub fn text(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }
}

fn malformed() -> AppError {
    AppError::Validation(ValidationError::InvalidFormat("form".to_string()))
}

/// Read the whole form. Parts named `file_field` that carry a non-empty
/// filename are treated as the upload; everything else is text.
pub async fn read_form(
    mut payload: Multipart,
    file_field: &str,
    max_file_size: usize,
) -> Result<MultipartForm, AppError> {
    let mut form = MultipartForm::default();
    let mut parts = 0;

    while let Some(item) = payload.next().await {
        parts += 1;
        if parts > MAX_FORM_PARTS {
            tracing::warn!(limit = MAX_FORM_PARTS, "Multipart form has too many parts");
            return Err(malformed());
        }

        let mut field = item.map_err(|e| {
            tracing::warn!(error = %e, "Malformed multipart payload");
            malformed()
        })?;

        let disposition = field.content_disposition();
        let name = disposition.get_name().unwrap_or_default().to_string();
        let filename = disposition
            .get_filename()
            .filter(|f| !f.is_empty())
            .map(str::to_string);

        let limit = if filename.is_some() {
            max_file_size
        } else {
            MAX_TEXT_FIELD_BYTES
        };

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| {
                tracing::warn!(error = %e, field = %name, "Failed to read multipart field");
                malformed()
            })?;
            if bytes.len() + chunk.len() > limit {
                if filename.is_some() {
                    return Err(UploadError::TooLarge { max: max_file_size }.into());
                }
                return Err(AppError::Validation(ValidationError::TooLong(name, limit)));
            }
            bytes.extend_from_slice(&chunk);
        }

        match filename {
            Some(filename) if name == file_field => {
                if !bytes.is_empty() {
                    form.file = Some(UploadedFile { filename, bytes });
                }
            }
            Some(_) => {
                tracing::debug!(field = %name, "Ignoring unexpected file part");
            }
            None => {
                let value = String::from_utf8(bytes)
                    .map_err(|_| AppError::Validation(ValidationError::InvalidFormat(name.clone())))?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}
