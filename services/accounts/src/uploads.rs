//! Profile photo storage on the local filesystem

use axum::body::Bytes;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use crate::error::{AccountError, AccountResult};

/// File received from a multipart upload
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Local storage for profile photos
#[derive(Debug, Clone)]
pub struct PhotoStorage {
    upload_dir: PathBuf,
    max_size: usize,
}

impl PhotoStorage {
    pub fn new(upload_dir: impl Into<PathBuf>, max_size: usize) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            max_size,
        }
    }

    /// Check that the upload is an image within the size limit
    pub fn validate(&self, upload: &PhotoUpload) -> AccountResult<()> {
        if !upload.content_type.starts_with("image") {
            return Err(AccountError::Validation(
                "Please upload an image file".to_string(),
            ));
        }

        if upload.data.len() > self.max_size {
            return Err(AccountError::Validation(format!(
                "Please upload an image less than {}",
                self.max_size
            )));
        }

        Ok(())
    }

    /// Name under which an account's photo is stored: `profile_<id><.ext>`
    pub fn stored_name(account_id: Uuid, file_name: &str) -> String {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_default();
        format!("profile_{}{}", account_id, extension)
    }

    /// Validate and write the photo, returning the stored file name
    pub async fn store(&self, account_id: Uuid, upload: &PhotoUpload) -> AccountResult<String> {
        self.validate(upload)?;

        let stored_name = Self::stored_name(account_id, &upload.file_name);
        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .map_err(AccountError::Upload)?;
        tokio::fs::write(self.upload_dir.join(&stored_name), &upload.data)
            .await
            .map_err(AccountError::Upload)?;

        info!("Stored photo {} for account {}", stored_name, account_id);
        Ok(stored_name)
    }
}
