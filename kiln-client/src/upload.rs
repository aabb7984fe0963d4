//! Upload endpoint
//!
//! Reference images are uploaded once before submission. Any failure here is
//! reported as [`ClientError::Upload`] so callers can tell it apart from a
//! failure of the job itself.

use kiln_core::domain::credential::Credential;
use kiln_core::domain::status::SUCCESS_STATUS;
use kiln_core::dto::upload::UploadData;
use std::path::Path;
use tracing::info;

use crate::error::{ClientError, Result};
use crate::transport::{FilePart, Transport};
use crate::{JobClient, decode_envelope};

const UPLOAD_PATH: &str = "/api/upload";

/// Returns the MIME type for the image formats the service accepts
fn image_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        _ => None,
    }
}

impl<T: Transport> JobClient<T> {
    /// Upload a local image and return its resource URL
    ///
    /// # Arguments
    /// * `path` - A `.jpg`, `.jpeg` or `.png` file
    /// * `credential` - Session credential forwarded to the service
    pub async fn upload(&self, path: &Path, credential: &Credential) -> Result<String> {
        let mime = image_mime(path).ok_or_else(|| {
            ClientError::InvalidRequest(format!(
                "{} must be a jpg or png file",
                path.display()
            ))
        })?;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ClientError::Upload(format!("cannot read {}: {}", path.display(), e)))?;

        info!("Uploading {} ({} bytes)", file_name, bytes.len());

        let file = FilePart {
            file_name,
            mime,
            bytes,
        };
        let raw = self
            .transport
            .post_file(UPLOAD_PATH, file, credential)
            .await
            .map_err(|e| ClientError::Upload(e.to_string()))?;

        let envelope = decode_envelope::<UploadData>(&raw)
            .map_err(|e| ClientError::Upload(e.to_string()))?;

        if envelope.status != SUCCESS_STATUS {
            return Err(ClientError::Upload(format!(
                "service answered {}: {}",
                envelope.status,
                envelope.message.unwrap_or_default()
            )));
        }

        envelope
            .data
            .map(|data| data.url)
            .ok_or_else(|| ClientError::Upload("response carries no resource URL".to_string()))
    }
}
