use thiserror::Error;
use tracing::info;

use crate::managed::{ManagedClient, ManagedError};

pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

#[derive(Debug, Error, PartialEq)]
pub enum ImageError {
    #[error("No image file provided")]
    MissingImage,
    #[error("No file selected")]
    NoFileSelected,
    #[error("Invalid file type")]
    InvalidFileType,
    #[error("Invalid filename")]
    InvalidFilename,
}

/// An image received from the client, before validation
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub original_name: String,
    pub requested_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Name the object is stored under: the requested name if any, else the
    /// client's file name, sanitized. The extension check applies to the
    /// client's file name.
    pub fn stored_name(&self) -> Result<String, ImageError> {
        if self.original_name.is_empty() {
            return Err(ImageError::NoFileSelected);
        }
        if !allowed_file(&self.original_name) {
            return Err(ImageError::InvalidFileType);
        }
        let chosen = self
            .requested_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.original_name);
        let secured = secure_filename(chosen);
        if secured.is_empty() {
            return Err(ImageError::InvalidFilename);
        }
        Ok(secured)
    }
}

pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Reduce a client supplied name to a flat, ASCII-only file name.
///
/// Non-ASCII characters are dropped, path separators become spaces, runs of
/// whitespace become `_`, anything outside `[A-Za-z0-9_.-]` is removed and
/// leading/trailing dots and underscores are trimmed.
pub fn secure_filename(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

pub struct ImageService<'a> {
    client: &'a ManagedClient,
    bucket: &'a str,
}

impl<'a> ImageService<'a> {
    pub fn new(client: &'a ManagedClient, bucket: &'a str) -> Self {
        Self { client, bucket }
    }

    /// Store the image, overwriting an existing object of the same name
    pub async fn upload(&self, name: &str, upload: ImageUpload) -> Result<(), ManagedError> {
        let size = upload.bytes.len();
        self.client
            .upload_object(self.bucket, name, upload.bytes, &upload.content_type, true)
            .await?;
        info!("Uploaded patient image {} ({} bytes) to {}", name, size, self.bucket);
        Ok(())
    }

    pub fn public_url(&self, name: &str) -> Result<String, ManagedError> {
        self.client.public_url(self.bucket, name)
    }
}
