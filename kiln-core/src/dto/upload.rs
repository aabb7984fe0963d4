//! Upload DTOs

use serde::{Deserialize, Serialize};

/// Data returned by the upload endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadData {
    /// Public URL of the uploaded resource
    pub url: String,
}
