/// Image upload storage
///
/// Files land in the configured directory as `<unix_ts>_<uuid><ext>` and are
/// served back under `/uploads`.

use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

use crate::configuration::UploadSettings;

/// URL prefix the upload directory is mounted at
pub const PUBLIC_PREFIX: &str = "/uploads";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("file exceeds maximum size of {max} bytes")]
    TooLarge { max: usize },
    #[error("failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    directory: PathBuf,
    max_file_size: usize,
}

impl UploadStore {
    pub fn new(directory: impl Into<PathBuf>, max_file_size: usize) -> Self {
        Self {
            directory: directory.into(),
            max_file_size,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    pub fn check_size(&self, len: usize) -> Result<(), UploadError> {
        if len > self.max_file_size {
            return Err(UploadError::TooLarge {
                max: self.max_file_size,
            });
        }
        Ok(())
    }

    /// Write the file and return the public path it is served from
    pub async fn save(&self, original_filename: &str, bytes: &[u8]) -> Result<String, UploadError> {
        self.check_size(bytes.len())?;

        let file_name = format!(
            "{}_{}{}",
            chrono::Utc::now().timestamp(),
            Uuid::new_v4(),
            sanitized_extension(original_filename)
        );

        tokio::fs::create_dir_all(&self.directory).await?;
        tokio::fs::write(self.directory.join(&file_name), bytes).await?;

        tracing::info!(file_name = %file_name, size = bytes.len(), "Upload stored");
        Ok(format!("{}/{}", PUBLIC_PREFIX, file_name))
    }

    /// Delete a file previously returned by [`UploadStore::save`].
    ///
    /// Paths outside the upload directory are ignored. Failures are logged,
    /// not returned, since callers are already on an error path.
    pub async fn remove(&self, public_path: &str) {
        let file_name = match public_path
            .strip_prefix(PUBLIC_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|name| !name.is_empty() && !name.contains('/') && !name.contains('\\') && !name.starts_with('.'))
        {
            Some(name) => name,
            None => {
                tracing::warn!(path = %public_path, "Refusing to remove path outside uploads");
                return;
            }
        };

        match tokio::fs::remove_file(self.directory.join(file_name)).await {
            Ok(()) => tracing::info!(file_name = %file_name, "Upload removed"),
            Err(e) => tracing::warn!(file_name = %file_name, error = %e, "Failed to remove upload"),
        }
    }
}

impl From<&UploadSettings> for UploadStore {
    fn from(settings: &UploadSettings) -> Self {
        Self::new(&settings.directory, settings.max_file_size_bytes)
    }
}

/// Keep a short alphanumeric extension, drop anything else
fn sanitized_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}
