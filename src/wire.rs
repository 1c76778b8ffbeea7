//! Strict serde shapes for what the completion API sends back.
//!
//! Decoding is staged: the envelope is decoded first with each choice kept as raw JSON, the
//! choice count is checked, and only then is the single choice decoded into its typed shape.
//! Each stage fails with its own [`DecodeErrorKind`].

use serde::Deserialize;
use serde_json::value::RawValue;

use crate::error::{DecodeErrorKind, Error, Result};
use crate::types::MessageRole;

/// `{"error": {...}}`, as returned with non-2xx statuses and occasionally inside 2xx bodies.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
}

impl ApiErrorBody {
    pub fn into_error(self, status_code: Option<u16>, request_id: Option<String>) -> Error {
        let code = match self.code {
            Some(serde_json::Value::String(code)) => Some(code),
            Some(serde_json::Value::Null) | None => self.error_type,
            Some(other) => Some(other.to_string()),
        };
        let message = self
            .message
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| "API error".to_string());
        Error::api(status_code, code, message, request_id)
    }
}

/// One streamed SSE payload.
#[derive(Debug, Deserialize)]
pub(crate) struct ChunkBody {
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
    #[serde(default)]
    pub choices: Option<Vec<Box<RawValue>>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChunkChoice {
    pub delta: ChunkDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

/// A complete single-shot response body.
#[derive(Debug, Deserialize)]
pub(crate) struct ResponseBody {
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
    #[serde(default)]
    pub choices: Option<Vec<Box<RawValue>>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseChoice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseMessage {
    pub role: MessageRole,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub function_call: Option<ResponseFunctionCall>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseFunctionCall {
    pub name: String,
    pub arguments: String,
}

/// Check that exactly one choice is present and hand it back undecoded.
pub(crate) fn single_choice(choices: Option<Vec<Box<RawValue>>>) -> Result<Box<RawValue>> {
    let mut choices = match choices {
        Some(choices) if !choices.is_empty() => choices,
        _ => {
            return Err(Error::decode(
                DecodeErrorKind::NoChoices,
                "invalid response, no choices",
            ));
        }
    };
    if choices.len() != 1 {
        return Err(Error::decode(
            DecodeErrorKind::WrongChoiceCount(choices.len()),
            "invalid response, expected 1 choice",
        ));
    }
    choices.pop().ok_or_else(|| {
        Error::decode(DecodeErrorKind::NoChoices, "invalid response, no choices")
    })
}

/// Decode `text` as `T`, telling syntax errors apart from shape mismatches.
pub(crate) fn from_json<'a, T: Deserialize<'a>>(
    text: &'a str,
    shape_kind: DecodeErrorKind,
    what: &str,
) -> Result<T> {
    serde_json::from_str(text).map_err(|err| {
        let kind = if err.is_data() {
            shape_kind
        } else {
            DecodeErrorKind::InvalidJson
        };
        Error::decode(kind, format!("invalid {what}: {err}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(values: &[&str]) -> Option<Vec<Box<RawValue>>> {
        Some(
            values
                .iter()
                .map(|v| RawValue::from_string(v.to_string()).unwrap())
                .collect(),
        )
    }

    #[test]
    fn single_choice_cardinality() {
        assert_eq!(
            single_choice(None).unwrap_err().decode_kind(),
            Some(DecodeErrorKind::NoChoices)
        );
        assert_eq!(
            single_choice(raw(&[])).unwrap_err().decode_kind(),
            Some(DecodeErrorKind::NoChoices)
        );
        assert_eq!(
            single_choice(raw(&["{}", "{}"])).unwrap_err().decode_kind(),
            Some(DecodeErrorKind::WrongChoiceCount(2))
        );
        assert_eq!(single_choice(raw(&["{\"a\":1}"])).unwrap().get(), "{\"a\":1}");
    }

    #[test]
    fn error_body_code_fallbacks() {
        let body: ApiErrorBody =
            serde_json::from_str(r#"{"code": null, "type": "server_error", "message": ""}"#)
                .unwrap();
        let err = body.into_error(Some(500), None);
        assert_eq!(err.code(), Some("server_error"));
        assert!(err.to_string().contains("API error"));

        let body: ApiErrorBody = serde_json::from_str(r#"{"code": 42, "message": "x"}"#).unwrap();
        assert_eq!(body.into_error(None, None).code(), Some("42"));
    }

    #[test]
    fn syntax_and_shape_errors_differ() {
        let err = from_json::<ResponseChoice>("{", DecodeErrorKind::MalformedMessage, "choice")
            .unwrap_err();
        assert_eq!(err.decode_kind(), Some(DecodeErrorKind::InvalidJson));
        let err = from_json::<ResponseChoice>(
            r#"{"message": "nope"}"#,
            DecodeErrorKind::MalformedMessage,
            "choice",
        )
        .unwrap_err();
        assert_eq!(err.decode_kind(), Some(DecodeErrorKind::MalformedMessage));
    }
}
