//! Image storage for product photos and avatars.
//!
//! Files are written under the media directory as `{uuid}.{ext}` and served
//! back from `{base_url}/{uuid}.{ext}`. The reference stored on a product or
//! user is that URL.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

/// An uploaded file as received from a multipart form.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Lowercase image extension from the file name, else the content type.
    fn extension(&self) -> Option<String> {
        let from_name = self
            .file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        let from_type = || {
            self.content_type
                .as_deref()
                .and_then(|ct| ct.strip_prefix("image/"))
                .map(str::to_ascii_lowercase)
        };

        from_name
            .or_else(from_type)
            .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
    }
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("only jpg, png, webp or gif images are accepted")]
    UnsupportedType,

    #[error("image must be at most {} MB", MAX_UPLOAD_BYTES / 1024 / 1024)]
    TooLarge,

    #[error("image is empty")]
    Empty,

    #[error("media storage error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Whether the upload itself was at fault.
    #[must_use]
    pub const fn is_rejected_upload(&self) -> bool {
        matches!(self, Self::UnsupportedType | Self::TooLarge | Self::Empty)
    }
}

/// Stores uploaded images and returns their public reference.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn store(&self, upload: Upload) -> Result<String, MediaError>;
}

/// Writes uploads to a local directory.
#[derive(Debug, Clone)]
pub struct LocalMediaStore {
    dir: PathBuf,
    base_url: String,
}

impl LocalMediaStore {
    /// Create the store, creating `dir` if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Io` if the directory cannot be created.
    pub async fn new(dir: impl AsRef<Path>, base_url: &str) -> Result<Self, MediaError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn store(&self, upload: Upload) -> Result<String, MediaError> {
        if upload.bytes.is_empty() {
            return Err(MediaError::Empty);
        }
        if upload.bytes.len() > MAX_UPLOAD_BYTES {
            return Err(MediaError::TooLarge);
        }
        let ext = upload.extension().ok_or(MediaError::UnsupportedType)?;

        let file_name = format!("{}.{ext}", Uuid::new_v4());
        let path = self.dir.join(&file_name);

        // Write to a temp file first so readers never see a partial image
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &upload.bytes).await?;
        fs::rename(&temp_path, &path).await?;

        tracing::debug!(file = %file_name, size = upload.bytes.len(), "Stored upload");

        Ok(format!("{}/{file_name}", self.base_url))
    }
}
