// REST API client wrapper
//
// Thin layer over reqwest: joins paths onto the configured base URL, applies
// the configured timeout, measures elapsed time and tries to deserialize the
// body into the caller's type. Non-2xx statuses are data, not errors.

use crate::config::TestConfiguration;
use crate::error::Result;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use url::Url;

/// Response of a request whose body is deserialized into `T`.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    /// HTTP status code
    pub status: StatusCode,
    /// Deserialized body, `None` when the body is empty or not a `T`
    pub data: Option<T>,
    /// Raw body text
    pub body: String,
    /// Time from sending the request to reading the full body
    pub elapsed: Duration,
}

/// Response of a request whose body is ignored (DELETE).
#[derive(Debug, Clone, Copy)]
pub struct ApiStatus {
    pub status: StatusCode,
    pub elapsed: Duration,
}

impl<T> ApiResponse<T> {
    /// Status matches and a payload was deserialized.
    pub fn is(&self, expected: StatusCode) -> bool {
        self.status == expected && self.data.is_some()
    }
}

/// Client for the API under test. Cheap to clone; clones share the
/// connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Builds a client for `API.BaseUrl` with the `API.Timeout` request timeout.
    pub fn new(config: &TestConfiguration) -> Result<Self> {
        let client = Client::builder().timeout(config.api_timeout()).build()?;
        let base_url = Url::parse(config.api_base_url())?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves an endpoint path against the base URL.
    ///
    /// Leading slashes are ignored so a base URL with a path prefix
    /// (`http://host/api/`) keeps its prefix.
    pub fn url_for(&self, endpoint: &str) -> Result<Url> {
        join_path(&self.base_url, endpoint)
    }

    /// GET `endpoint` with optional query parameters.
    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: Option<&[(&str, &str)]>,
    ) -> Result<ApiResponse<T>> {
        let mut request = self.request(Method::GET, endpoint)?;
        if let Some(query) = query {
            request = request.query(query);
        }
        self.execute(Method::GET, endpoint, request).await
    }

    /// POST a JSON body to `endpoint`.
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<ApiResponse<T>> {
        let request = self.request(Method::POST, endpoint)?.json(body);
        self.execute(Method::POST, endpoint, request).await
    }

    /// PUT a JSON body to `endpoint`.
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<ApiResponse<T>> {
        let request = self.request(Method::PUT, endpoint)?.json(body);
        self.execute(Method::PUT, endpoint, request).await
    }

    /// DELETE `endpoint`.
    pub async fn delete(&self, endpoint: &str) -> Result<ApiStatus> {
        let request = self.request(Method::DELETE, endpoint)?;
        let start = Instant::now();
        let response = request.send().await?;
        let status = response.status();
        // Drain the body so elapsed covers the whole exchange.
        let _ = response.bytes().await?;
        let elapsed = start.elapsed();
        tracing::info!(method = "DELETE", endpoint, status = status.as_u16(), ?elapsed, "API call");
        Ok(ApiStatus { status, elapsed })
    }

    /// True when the status matches and a payload was deserialized.
    pub fn validate_response<T>(response: &ApiResponse<T>, expected: StatusCode) -> bool {
        response.is(expected)
    }

    /// True when the exchange took at most `max_ms` milliseconds.
    pub fn validate_response_time(elapsed: Duration, max_ms: u64) -> bool {
        elapsed <= Duration::from_millis(max_ms)
    }

    fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        Ok(self.client.request(method, self.url_for(endpoint)?))
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        request: RequestBuilder,
    ) -> Result<ApiResponse<T>> {
        let start = Instant::now();
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        let elapsed = start.elapsed();

        let data = if body.trim().is_empty() {
            None
        } else {
            match serde_json::from_str(&body) {
                Ok(data) => Some(data),
                Err(e) => {
                    tracing::warn!(%method, endpoint, error = %e, "Response body did not match the expected type");
                    None
                }
            }
        };

        tracing::info!(%method, endpoint, status = status.as_u16(), ?elapsed, "API call");
        Ok(ApiResponse {
            status,
            data,
            body,
            elapsed,
        })
    }
}

/// Joins `path` onto `base`, keeping any path prefix `base` carries.
pub(crate) fn join_path(base: &Url, path: &str) -> Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let prefix = format!("{}/", base.path());
        base.set_path(&prefix);
    }
    Ok(base.join(path.trim_start_matches('/'))?)
}
