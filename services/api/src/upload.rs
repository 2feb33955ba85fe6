//! Multipart upload staging
//!
//! Accepted files are streamed straight into the scratch directory as
//! `<id>_<sanitized name>`. A [`StagedUpload`] owns its file and deletes it
//! when dropped, so inputs never outlive the request that carried them.

use std::collections::HashMap;
use std::path::PathBuf;

use axum::extract::Multipart;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use common::{ScratchDir, ScratchError};

use crate::error::{ApiError, ApiResult};
use crate::validation::{file_stem, has_allowed_extension, sanitize_filename};

/// An uploaded file written to scratch storage
#[derive(Debug)]
pub struct StagedUpload {
    pub id: Uuid,
    /// Sanitized client file name
    pub file_name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
}

impl StagedUpload {
    pub fn stem(&self) -> &str {
        file_stem(&self.file_name)
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed upload {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove upload {}: {}", self.path.display(), e),
        }
    }
}

/// Parsed multipart form
#[derive(Debug, Default)]
pub struct UploadForm {
    /// Files from the file field with an accepted extension
    pub files: Vec<StagedUpload>,
    /// Names of files turned away by the extension check
    pub rejected: Vec<String>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    /// Stage every file of `file_field` whose extension is in `allowed` and
    /// collect the remaining text fields
    pub async fn read(
        mut multipart: Multipart,
        scratch: &ScratchDir,
        file_field: &str,
        allowed: &[&str],
    ) -> ApiResult<Self> {
        let mut form = UploadForm::default();

        while let Some(mut field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            if name != file_field {
                let value = field.text().await?;
                form.fields.insert(name, value);
                continue;
            }

            let original = match field.file_name() {
                Some(file_name) if !file_name.is_empty() => file_name.to_string(),
                _ => continue,
            };
            if !has_allowed_extension(&original, allowed) {
                form.rejected.push(sanitize_filename(&original));
                continue;
            }

            let id = ScratchDir::new_id();
            let file_name = sanitize_filename(&original);
            let mut staged = StagedUpload {
                id,
                path: scratch.path_for(id, &file_name)?,
                file_name,
                size_bytes: 0,
            };

            let mut file = tokio::fs::File::create(&staged.path)
                .await
                .map_err(ScratchError::from)?;
            while let Some(chunk) = field.chunk().await? {
                file.write_all(&chunk).await.map_err(ScratchError::from)?;
                staged.size_bytes += chunk.len() as u64;
            }
            file.flush().await.map_err(ScratchError::from)?;

            debug!(
                "Staged {} ({} bytes) at {}",
                staged.file_name,
                staged.size_bytes,
                staged.path.display()
            );
            form.files.push(staged);
        }

        Ok(form)
    }

    /// Text value of a non-file field
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// First of several alias names that is present
    pub fn field_any(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|name| self.field(name))
    }

    /// The one file a single-file endpoint works on
    pub fn into_single(mut self, rejected_message: &str) -> ApiResult<StagedUpload> {
        if self.files.is_empty() {
            return Err(if self.rejected.is_empty() {
                ApiError::BadRequest("No file provided".to_string())
            } else {
                ApiError::BadRequest(rejected_message.to_string())
            });
        }
        Ok(self.files.swap_remove(0))
    }
}
