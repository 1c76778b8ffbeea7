//! Error types for llm-chat.
//!
//! Every failure the completion pipeline can produce is a variant of [`Error`].  The variants
//! fall into four families: transport failures (the request never produced a usable body),
//! framing failures (the SSE structure is broken), decode failures (a frame or body does not
//! match the expected JSON shape), and cancellation.

use std::error;
use std::fmt;
use std::io;
use std::str::Utf8Error;
use std::sync::Arc;

/// The specific shape mismatch behind a [`Error::Decode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// The payload was not valid JSON.
    InvalidJson,
    /// The `choices` array was missing or empty.
    NoChoices,
    /// The `choices` array did not contain exactly one element.
    WrongChoiceCount(usize),
    /// A streamed choice did not carry a well-formed `delta`.
    MalformedDelta,
    /// A single-shot choice did not carry a well-formed `message`.
    MalformedMessage,
    /// A streamed delta had no content and was not a normal stop.
    NoContent,
    /// A single-shot message had neither content nor a function call.
    NoContentOrFunctionCall,
}

impl fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeErrorKind::InvalidJson => write!(f, "invalid JSON"),
            DecodeErrorKind::NoChoices => write!(f, "no choices"),
            DecodeErrorKind::WrongChoiceCount(n) => {
                write!(f, "wrong choice count (expected 1, got {n})")
            }
            DecodeErrorKind::MalformedDelta => write!(f, "malformed delta"),
            DecodeErrorKind::MalformedMessage => write!(f, "malformed message"),
            DecodeErrorKind::NoContent => write!(f, "no content"),
            DecodeErrorKind::NoContentOrFunctionCall => write!(f, "no content or function call"),
        }
    }
}

/// The main error type for llm-chat.
#[derive(Clone, Debug)]
pub enum Error {
    /// The API reported an error, either with a non-2xx status or inside a response body.
    Api {
        /// HTTP status code, when the error came with one.
        status_code: Option<u16>,
        /// Error code string from the API.
        code: Option<String>,
        /// Human-readable error message.
        message: String,
        /// Request ID for debugging and support.
        request_id: Option<String>,
    },

    /// Authentication error.
    Authentication {
        /// Human-readable error message.
        message: String,
    },

    /// API timeout error.
    Timeout {
        /// Human-readable error message.
        message: String,
        /// Duration of the timeout in seconds.
        duration: Option<f64>,
    },

    /// The caller cancelled the request.
    Abort {
        /// Human-readable error message.
        message: String,
    },

    /// Connection error.
    Connection {
        /// Human-readable error message.
        message: String,
        /// Underlying cause.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// HTTP client error.
    HttpClient {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// Reading the response body failed mid-stream.
    Streaming {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// An SSE frame did not follow the `data:` framing convention.
    Framing {
        /// Human-readable error message.
        message: String,
    },

    /// A frame or response body did not match the expected JSON shape.
    Decode {
        /// What was wrong with the payload.
        kind: DecodeErrorKind,
        /// Human-readable error message.
        message: String,
    },

    /// Error during JSON serialization of a request.
    Serialization {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// I/O error.
    Io {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Arc<io::Error>,
    },

    /// Error during validation of configuration or request parameters.
    Validation {
        /// Human-readable error message.
        message: String,
        /// Parameter that failed validation.
        param: Option<String>,
    },

    /// A URL parsing or manipulation error.
    Url {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<url::ParseError>,
    },

    /// Encoding/decoding error.
    Encoding {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Creates a new API error.
    pub fn api(
        status_code: Option<u16>,
        code: Option<String>,
        message: impl Into<String>,
        request_id: Option<String>,
    ) -> Self {
        Error::Api {
            status_code,
            code,
            message: message.into(),
            request_id,
        }
    }

    /// Creates a new authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Error::Authentication {
            message: message.into(),
        }
    }

    /// Creates a new timeout error.
    pub fn timeout(message: impl Into<String>, duration: Option<f64>) -> Self {
        Error::Timeout {
            message: message.into(),
            duration,
        }
    }

    /// Creates a new abort error.
    pub fn abort(message: impl Into<String>) -> Self {
        Error::Abort {
            message: message.into(),
        }
    }

    /// Creates a new connection error.
    pub fn connection(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Connection {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new HTTP client error.
    pub fn http_client(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::HttpClient {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new streaming error.
    pub fn streaming(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Streaming {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new framing error.
    pub fn framing(message: impl Into<String>) -> Self {
        Error::Framing {
            message: message.into(),
        }
    }

    /// Creates a new decode error.
    pub fn decode(kind: DecodeErrorKind, message: impl Into<String>) -> Self {
        Error::Decode {
            kind,
            message: message.into(),
        }
    }

    /// Creates a new serialization error.
    pub fn serialization(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Serialization {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new I/O error.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// Creates a new validation error.
    pub fn validation(message: impl Into<String>, param: Option<String>) -> Self {
        Error::Validation {
            message: message.into(),
            param,
        }
    }

    /// Creates a new URL error.
    pub fn url(message: impl Into<String>, source: Option<url::ParseError>) -> Self {
        Error::Url {
            message: message.into(),
            source,
        }
    }

    /// Creates a new encoding error.
    pub fn encoding(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Encoding {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Returns true if the request failed before or while transferring the body.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Api { .. }
                | Error::Authentication { .. }
                | Error::Timeout { .. }
                | Error::Connection { .. }
                | Error::HttpClient { .. }
                | Error::Streaming { .. }
        )
    }

    /// Returns true if this error is an SSE framing violation.
    pub fn is_framing(&self) -> bool {
        matches!(self, Error::Framing { .. })
    }

    /// Returns true if this error is a payload shape mismatch.
    pub fn is_decode(&self) -> bool {
        matches!(self, Error::Decode { .. } | Error::Encoding { .. })
    }

    /// Returns true if the caller cancelled the request.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Abort { .. })
    }

    /// Returns true if this error is related to authentication.
    pub fn is_authentication(&self) -> bool {
        match self {
            Error::Authentication { .. } => true,
            Error::Api { status_code, .. } => *status_code == Some(401),
            _ => false,
        }
    }

    /// Returns true if this error is related to rate limiting.
    pub fn is_rate_limit(&self) -> bool {
        matches!(
            self,
            Error::Api {
                status_code: Some(429),
                ..
            }
        )
    }

    /// Returns true if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Returns true if this error is a connection error.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }

    /// Returns true if a caller could reasonably retry the request.
    ///
    /// Nothing in this crate retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Api {
                status_code: Some(status_code),
                ..
            } => {
                matches!(status_code, 408 | 409 | 429 | 500..=599)
            }
            Error::Timeout { .. } => true,
            Error::Connection { .. } => true,
            _ => false,
        }
    }

    /// Returns the decode error kind, if this is a decode error.
    pub fn decode_kind(&self) -> Option<DecodeErrorKind> {
        match self {
            Error::Decode { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Returns the API error code, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            Error::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Returns the request ID associated with this error, if any.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Error::Api { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }

    /// Returns the status code associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api { status_code, .. } => *status_code,
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Api {
                status_code,
                code,
                message,
                request_id,
            } => {
                match (code, status_code) {
                    (Some(code), _) => write!(f, "API error ({code}): {message}")?,
                    (None, Some(status)) => write!(f, "API error (HTTP {status}): {message}")?,
                    (None, None) => write!(f, "API error: {message}")?,
                }
                if let Some(request_id) = request_id {
                    write!(f, " (Request ID: {request_id})")?;
                }
                Ok(())
            }
            Error::Authentication { message } => {
                write!(f, "Authentication error: {message}")
            }
            Error::Timeout { message, duration } => {
                if let Some(duration) = duration {
                    write!(f, "Timeout error: {message} ({duration} seconds)")
                } else {
                    write!(f, "Timeout error: {message}")
                }
            }
            Error::Abort { message } => {
                write!(f, "Request cancelled: {message}")
            }
            Error::Connection { message, .. } => {
                write!(f, "Connection error: {message}")
            }
            Error::HttpClient { message, .. } => {
                write!(f, "HTTP client error: {message}")
            }
            Error::Streaming { message, .. } => {
                write!(f, "Streaming error: {message}")
            }
            Error::Framing { message } => {
                write!(f, "Framing error: {message}")
            }
            Error::Decode { kind, message } => {
                write!(f, "Decode error ({kind}): {message}")
            }
            Error::Serialization { message, .. } => {
                write!(f, "Serialization error: {message}")
            }
            Error::Io { message, .. } => {
                write!(f, "I/O error: {message}")
            }
            Error::Validation { message, param } => {
                if let Some(param) = param {
                    write!(f, "Validation error: {message} (parameter: {param})")
                } else {
                    write!(f, "Validation error: {message}")
                }
            }
            Error::Url { message, .. } => {
                write!(f, "URL error: {message}")
            }
            Error::Encoding { message, .. } => {
                write!(f, "Encoding error: {message}")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Connection { source, .. }
            | Error::HttpClient { source, .. }
            | Error::Streaming { source, .. }
            | Error::Serialization { source, .. }
            | Error::Encoding { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Io { source, .. } => Some(source),
            Error::Url { source, .. } => {
                source.as_ref().map(|e| e as &(dyn error::Error + 'static))
            }
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::io(err.to_string(), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::serialization(format!("JSON error: {err}"), Some(Box::new(err)))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::url(format!("URL parse error: {err}"), Some(err))
    }
}

impl From<Utf8Error> for Error {
    fn from(err: Utf8Error) -> Self {
        Error::encoding(format!("UTF-8 error: {err}"), Some(Box::new(err)))
    }
}

/// A specialized Result type for llm-chat operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_prefers_code() {
        let err = Error::api(
            Some(429),
            Some("rate_limit_exceeded".to_string()),
            "slow down",
            Some("req_123".to_string()),
        );
        assert_eq!(
            err.to_string(),
            "API error (rate_limit_exceeded): slow down (Request ID: req_123)"
        );
        assert_eq!(err.code(), Some("rate_limit_exceeded"));
        assert_eq!(err.status_code(), Some(429));
        assert!(err.is_rate_limit());
        assert!(err.is_retryable());
        assert!(err.is_transport());
    }

    #[test]
    fn api_error_display_without_code() {
        let err = Error::api(Some(500), None, "boom", None);
        assert_eq!(err.to_string(), "API error (HTTP 500): boom");
        let err = Error::api(None, None, "embedded", None);
        assert_eq!(err.to_string(), "API error: embedded");
        assert!(!err.is_retryable());
    }

    #[test]
    fn taxonomy_predicates_are_disjoint() {
        let framing = Error::framing("invalid event framing");
        let decode = Error::decode(DecodeErrorKind::NoChoices, "no choices");
        let cancelled = Error::abort("stream cancelled");
        let transport = Error::connection("refused", None);

        assert!(framing.is_framing() && !framing.is_decode() && !framing.is_transport());
        assert!(decode.is_decode() && !decode.is_framing() && !decode.is_cancelled());
        assert!(cancelled.is_cancelled() && !cancelled.is_transport());
        assert!(transport.is_transport() && transport.is_retryable());
        assert_eq!(decode.decode_kind(), Some(DecodeErrorKind::NoChoices));
        assert_eq!(framing.decode_kind(), None);
    }

    #[test]
    fn decode_error_display_includes_kind() {
        let err = Error::decode(DecodeErrorKind::WrongChoiceCount(2), "expected 1 choice");
        assert_eq!(
            err.to_string(),
            "Decode error (wrong choice count (expected 1, got 2)): expected 1 choice"
        );
    }

    #[test]
    fn io_errors_keep_their_source() {
        let err: Error = io::Error::other("disk on fire").into();
        assert!(error::Error::source(&err).is_some());
    }
}
