//! HTTP transport for the chat-completion API.
//!
//! [`Transport`] owns the HTTP client, the base URL, and the bearer credential.  It issues one
//! POST per call and never retries.  Both entry points race the request against a
//! [`CancellationToken`]; losing the race drops the request future and with it the socket.

use std::env;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::Stream;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, RequestBuilder, Response};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::wire::ApiErrorEnvelope;

/// Base URL used when none is configured.
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/";

/// Endpoint for chat completions, relative to the base URL.
pub const CHAT_COMPLETIONS_ENDPOINT: &str = "chat/completions";

/// Environment variable consulted when no API key is given.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A byte stream over a live response body.
pub type ByteStream =
    std::pin::Pin<Box<dyn Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send>>;

/// Client for the completion API's HTTP surface.
#[derive(Debug, Clone)]
pub struct Transport {
    api_key: String,
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
}

impl Transport {
    /// Create a new transport against the default API URL.
    ///
    /// The API key can be provided directly or read from the `OPENAI_API_KEY` environment
    /// variable; passing `-` also selects the environment variable.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_options(api_key, None, None)
    }

    /// Create a new transport with custom settings.
    ///
    /// `timeout` bounds single-shot requests end to end.  Streams are bounded only by the
    /// connect timeout and the caller's cancellation token.
    pub fn with_options(
        api_key: Option<String>,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let api_key = match api_key.filter(|key| key != "-") {
            Some(key) => key,
            None => env::var(API_KEY_ENV).map_err(|_| {
                Error::authentication(format!(
                    "must provide an API key via --api-key or set {API_KEY_ENV}"
                ))
            })?,
        };
        if api_key.trim().is_empty() {
            return Err(Error::authentication("API key is empty"));
        }

        let base_url = parse_base_url(base_url.as_deref().unwrap_or(DEFAULT_API_URL))?;
        let client = ReqwestClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            api_key,
            client,
            base_url,
            timeout: timeout.unwrap_or(DEFAULT_TIMEOUT),
        })
    }

    /// The base URL every endpoint is resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| Error::authentication("API key contains invalid header characters"))?;
        headers.insert(header::AUTHORIZATION, bearer);
        Ok(headers)
    }

    fn endpoint(&self, endpoint: &str) -> Result<Url> {
        Ok(self.base_url.join(endpoint)?)
    }

    /// POST `body` and return the live response body as a byte stream.
    ///
    /// The returned stream owns the connection; dropping it closes the connection.
    pub async fn post_stream<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
        cancel: &CancellationToken,
    ) -> Result<ByteStream> {
        let mut headers = self.default_headers()?;
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        let request = self
            .client
            .post(self.endpoint(endpoint)?)
            .headers(headers)
            .json(body);
        let response = self.execute(request, endpoint, cancel).await?;
        Ok(Box::pin(response.bytes_stream()))
    }

    /// POST `body` and return the fully buffered response body.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
        cancel: &CancellationToken,
    ) -> Result<Bytes> {
        let request = self
            .client
            .post(self.endpoint(endpoint)?)
            .headers(self.default_headers()?)
            .timeout(self.timeout)
            .json(body);
        let response = self.execute(request, endpoint, cancel).await?;
        let read = async {
            response
                .bytes()
                .await
                .map_err(|e| self.map_request_error(e))
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::abort("request cancelled")),
            bytes = read => bytes,
        }
    }

    async fn execute(
        &self,
        request: RequestBuilder,
        endpoint: &str,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        CLIENT_REQUESTS.click();
        let started = Instant::now();
        tracing::debug!(endpoint, "sending completion request");
        // The error body is read inside the raced future so a stalled body stays cancellable.
        let work = async {
            match request.send().await {
                Ok(response) if response.status().is_success() => Ok(response),
                Ok(response) => Err(Self::process_error_response(response).await),
                Err(e) => Err(self.map_request_error(e)),
            }
        };
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::abort("request cancelled")),
            result = work => result,
        };
        CLIENT_REQUEST_DURATION.add(started.elapsed().as_secs_f64());
        if let Err(err) = &result {
            CLIENT_REQUEST_ERRORS.click();
            tracing::debug!(endpoint, error = %err, "completion request failed");
        }
        result
    }

    fn map_request_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {}", e),
                Some(self.timeout.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
        }
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();
        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|val| val.to_str().ok())
            .map(String::from);

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {}", e),
                    Some(Box::new(e)),
                );
            }
        };

        match serde_json::from_str::<ApiErrorEnvelope>(&error_body) {
            Ok(envelope) => envelope.error.into_error(Some(status_code), request_id),
            Err(_) => {
                let message = if error_body.trim().is_empty() {
                    format!("HTTP status {status_code}")
                } else {
                    error_body
                };
                Error::api(Some(status_code), None, message, request_id)
            }
        }
    }
}

fn parse_base_url(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)?;
    if url.cannot_be_a_base() {
        return Err(Error::validation(
            format!("base URL {base_url} cannot be a base"),
            Some("base_url".to_string()),
        ));
    }
    // Url::join replaces the last path segment unless the path ends with '/'.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_creation() {
        let transport = Transport::new(Some("test-key".to_string())).unwrap();
        assert_eq!(transport.api_key, "test-key");
        assert_eq!(transport.base_url.as_str(), DEFAULT_API_URL);
        assert_eq!(transport.timeout, DEFAULT_TIMEOUT);

        let transport = Transport::with_options(
            Some("test-key".to_string()),
            Some("http://localhost:8080/v1".to_string()),
            Some(Duration::from_secs(5)),
        )
        .unwrap();
        assert_eq!(transport.base_url().as_str(), "http://localhost:8080/v1/");
        assert_eq!(transport.timeout, Duration::from_secs(5));
    }

    #[test]
    fn endpoint_resolution_keeps_the_base_path() {
        let transport = Transport::new(Some("k".to_string())).unwrap();
        assert_eq!(
            transport.endpoint(CHAT_COMPLETIONS_ENDPOINT).unwrap().as_str(),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn bearer_header() {
        let transport = Transport::new(Some("sk-abc".to_string())).unwrap();
        let headers = transport.default_headers().unwrap();
        assert_eq!(headers[header::AUTHORIZATION], "Bearer sk-abc");
        assert_eq!(
            headers[header::CONTENT_TYPE],
            "application/json; charset=utf-8"
        );
    }

    #[test]
    fn invalid_settings_are_rejected() {
        assert!(Transport::new(Some("  ".to_string())).unwrap_err().is_authentication());
        let err = Transport::with_options(
            Some("k".to_string()),
            Some("not a url".to_string()),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Url { .. }));
        let err = Transport::with_options(
            Some("k".to_string()),
            Some("mailto:someone@example.com".to_string()),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }
}
