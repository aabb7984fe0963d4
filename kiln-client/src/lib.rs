//! Kiln HTTP Client
//!
//! A small, type-safe client for the generation service.
//!
//! The client is split in two layers:
//! - [`Transport`]: one request/response exchange, implemented over `reqwest`
//!   by [`HttpTransport`]
//! - [`JobClient`]: shapes job submissions, status queries and uploads on top
//!   of a transport and decodes the responses into the domain model
//!
//! # Example
//!
//! ```no_run
//! use kiln_client::JobClient;
//! use kiln_core::domain::credential::Credential;
//! use kiln_core::dto::job::JobSpec;
//!
//! #[tokio::main]
//! async fn main() -> kiln_client::Result<()> {
//!     let client = JobClient::new("https://klingai.kuaishou.com")?;
//!     let credential = Credential::new("session=...");
//!
//!     let job = client.submit(&JobSpec::text_to_image("a lighthouse"), &credential).await?;
//!     let snapshot = client.query_status(&job.id, &credential).await?;
//!
//!     println!("Job {} is at {}", job.id, snapshot.application_status);
//!     Ok(())
//! }
//! ```

pub mod error;
mod jobs;
pub mod transport;
mod upload;

pub use error::{ClientError, Result};
pub use jobs::StatusQuery;
pub use transport::{ClientConfig, FilePart, HttpTransport, RawResponse, Transport};

use kiln_core::dto::job::Envelope;
use serde::de::DeserializeOwned;

/// Typed façade over the generation service
///
/// Performs no validation of its own and never retries: one call is one
/// exchange with the service.
#[derive(Debug, Clone)]
pub struct JobClient<T = HttpTransport> {
    transport: T,
}

impl JobClient<HttpTransport> {
    /// Create a client for the service at `base_url` with default settings
    ///
    /// # Example
    /// ```
    /// use kiln_client::JobClient;
    ///
    /// let client = JobClient::new("http://localhost:8080").unwrap();
    /// ```
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_config(&ClientConfig::new(base_url))
    }

    pub fn with_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self::with_transport(HttpTransport::new(config)?))
    }
}

impl<T: Transport> JobClient<T> {
    /// Create a client on top of any transport
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

/// Decodes a response envelope, mapping schema mismatches to [`ClientError::Decode`]
fn decode_envelope<D: DeserializeOwned>(raw: &RawResponse) -> Result<Envelope<D>> {
    Ok(serde_json::from_str(&raw.body)?)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = JobClient::new("http://localhost:8080/").unwrap();
        assert_eq!(client.transport().base_url(), "http://localhost:8080");
    }

    #[test]
    fn decode_envelope_reports_schema_errors() {
        let raw = RawResponse {
            status: 200,
            body: "<html>maintenance</html>".into(),
        };
        let err = decode_envelope::<serde_json::Value>(&raw).unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }
}
