//! Transport layer
//!
//! The transport performs single request/response exchanges with the
//! generation service and knows nothing about the payloads it carries.
//! [`JobClient`](crate::JobClient) shapes requests on top of it.

use async_trait::async_trait;
use kiln_core::domain::credential::Credential;
use reqwest::Client;
use reqwest::header::COOKIE;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::debug;

use crate::error::{ClientError, Result};

/// Default base URL of the generation service
pub const DEFAULT_BASE_URL: &str = "https://klingai.kuaishou.com";

/// Raw response of a successful (2xx) exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// A file to send as a multipart upload
#[derive(Debug, Clone)]
pub struct FilePart {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

/// Single-shot request/response exchange with the service
///
/// Implementations must map non-2xx responses to [`ClientError::Api`] and
/// connection failures to [`ClientError::Transport`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a JSON body with POST
    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
        credential: &Credential,
    ) -> Result<RawResponse>;

    /// Sends a GET request with query parameters
    async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
        credential: &Credential,
    ) -> Result<RawResponse>;

    /// Uploads a file as multipart form data under the `file` field
    async fn post_file(
        &self,
        path: &str,
        file: FilePart,
        credential: &Credential,
    ) -> Result<RawResponse>;
}

/// Settings for the HTTP transport
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the service (e.g., "https://klingai.kuaishou.com")
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Timeout for a whole request, including reading the body
    pub timeout: Duration,
    pub user_agent: String,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            timeout: Duration::from_secs(60),
            user_agent: format!("kiln/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// [`Transport`] backed by a pooled `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    client: Client,
}

impl HttpTransport {
    /// Creates a transport from the given configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;
        Ok(Self::with_client(&config.base_url, client))
    }

    /// Creates a transport with a custom HTTP client
    ///
    /// This allows you to configure proxies, TLS settings, etc.
    pub fn with_client(base_url: &str, client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the service
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Reads the body and checks the status code
    async fn handle_response(&self, response: reqwest::Response) -> Result<RawResponse> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        let body = response.text().await?;
        debug!("Received {} bytes (status {})", body.len(), status);

        Ok(RawResponse {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
        credential: &Credential,
    ) -> Result<RawResponse> {
        let response = self
            .client
            .post(self.url(path))
            .header(COOKIE, credential.expose())
            .json(body)
            .send()
            .await?;

        self.handle_response(response).await
    }

    async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
        credential: &Credential,
    ) -> Result<RawResponse> {
        let response = self
            .client
            .get(self.url(path))
            .header(COOKIE, credential.expose())
            .query(query)
            .send()
            .await?;

        self.handle_response(response).await
    }

    async fn post_file(
        &self,
        path: &str,
        file: FilePart,
        credential: &Credential,
    ) -> Result<RawResponse> {
        let part = Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(file.mime)?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.url(path))
            .header(COOKIE, credential.expose())
            .multipart(form)
            .send()
            .await?;

        self.handle_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport_for(server: &MockServer) -> HttpTransport {
        HttpTransport::new(&ClientConfig::new(server.uri())).unwrap()
    }

    #[test]
    fn test_base_url_trims_trailing_slash() {
        let transport = HttpTransport::with_client("http://localhost:8080/", Client::new());
        assert_eq!(transport.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.user_agent.starts_with("kiln/"));
    }

    #[tokio::test]
    async fn get_sends_cookie_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/task/status"))
            .and(query_param("taskId", "123"))
            .and(header("cookie", "session=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"status\":200}"))
            .expect(1)
            .mount(&server)
            .await;

        let raw = transport_for(&server)
            .get(
                "/api/task/status",
                &[("taskId", "123")],
                &Credential::from("session=abc"),
            )
            .await
            .unwrap();

        assert_eq!(raw.status, 200);
        assert_eq!(raw.body, "{\"status\":200}");
    }

    #[tokio::test]
    async fn post_json_sends_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/task/submit"))
            .and(body_json(json!({"type": "mmu_txt2img_aiweb"})))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let raw = transport_for(&server)
            .post_json(
                "/api/task/submit",
                &json!({"type": "mmu_txt2img_aiweb"}),
                &Credential::from("c"),
            )
            .await
            .unwrap();

        assert_eq!(raw.body, "ok");
    }

    #[tokio::test]
    async fn non_success_status_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = transport_for(&server)
            .get("/api/task/status", &[], &Credential::from("c"))
            .await
            .unwrap_err();

        match err {
            ClientError::Api { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "overloaded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn post_file_sends_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_string("done"))
            .expect(1)
            .mount(&server)
            .await;

        let file = FilePart {
            file_name: "cat.png".into(),
            mime: "image/png",
            bytes: vec![1, 2, 3],
        };
        let raw = transport_for(&server)
            .post_file("/api/upload", file, &Credential::from("c"))
            .await
            .unwrap();

        assert_eq!(raw.body, "done");
        let requests = server.received_requests().await.unwrap();
        let content_type = requests[0].headers.get("content-type").unwrap();
        assert!(content_type.to_str().unwrap().starts_with("multipart/form-data"));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let config = ClientConfig {
            connect_timeout: Duration::from_millis(500),
            ..ClientConfig::new("http://127.0.0.1:1")
        };
        let err = HttpTransport::new(&config)
            .unwrap()
            .get("/api/task/status", &[], &Credential::from("c"))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Transport(_)));
    }
}
