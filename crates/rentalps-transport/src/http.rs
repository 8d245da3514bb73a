//! HTTP transport implementation using `reqwest`.

use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::{ApiRequest, ApiResponse, HttpTransport, Method, TransportError};

/// A `reqwest`-based [`HttpTransport`] rooted at the API base URL.
///
/// The cookie store is enabled so the refresh credential the server sets
/// as an HTTP-only cookie rides along on `/auth/refresh`, the same way a
/// browser sends credentialed requests. Cheap to clone: clones share the
/// connection pool and the cookie jar.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
    base_url: Url,
}

impl ReqwestTransport {
    /// Creates a transport with its own client and cookie jar.
    pub fn new(base_url: Url) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self::with_client(http, base_url))
    }

    /// Uses a preconfigured client (timeouts, proxies, TLS roots).
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        tracing::debug!(base_url = %base_url, "HTTP transport created");
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends `path` to the base URL, keeping the base's own path
    /// (`/api`). `Url::join` would replace it for absolute paths.
    fn url_for(&self, path: &str) -> Result<Url, TransportError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Url::parse(&format!("{base}/{path}"))
            .map_err(|e| TransportError::InvalidUrl(format!("{path}: {e}")))
    }
}

fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.url_for(&request.path)?;
        let mut builder = self.http.request(to_reqwest(request.method), url);
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or_default().to_string();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?
            .to_vec();

        tracing::trace!(method = %request.method, path = %request.path, status = status.as_u16(), "response received");

        let response = ApiResponse {
            status: status.as_u16(),
            status_text,
            body,
        };
        if response.is_success() {
            Ok(response)
        } else {
            Err(TransportError::Status(response))
        }
    }
}
