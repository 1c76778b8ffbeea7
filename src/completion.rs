//! Decoding of single-shot (non-streaming) completion responses.

use crate::error::{DecodeErrorKind, Error, Result};
use crate::types::{FunctionCall, Message};
use crate::wire::{ResponseBody, ResponseChoice, from_json, single_choice};

/// Decode a complete response body into the one message it carries.
///
/// The body must hold exactly one choice whose message has non-empty content or a function
/// call.  An `error` member in the body is reported as an API error.
///
/// A function call comes back as the model's own turn: the message keeps the role it carried
/// on the wire (normally `assistant`), `name` stays unset and the call is in `function_call`.
/// The `function` role and `name` are reserved for the caller's reply with the function's result.
pub fn parse_message_response(body: &[u8]) -> Result<Message> {
    let body = std::str::from_utf8(body)?;
    let response: ResponseBody = from_json(body, DecodeErrorKind::MalformedMessage, "response")?;
    if let Some(error) = response.error {
        return Err(error.into_error(None, None));
    }
    let choice = single_choice(response.choices)?;
    let choice: ResponseChoice =
        from_json(choice.get(), DecodeErrorKind::MalformedMessage, "choice")?;
    let wire = choice.message;

    let content = wire.content.unwrap_or_default();
    let function_call = wire.function_call.map(|call| FunctionCall {
        name: call.name,
        arguments: call.arguments,
    });
    if content.is_empty() && function_call.is_none() {
        return Err(Error::decode(
            DecodeErrorKind::NoContentOrFunctionCall,
            "invalid response, no content or function call",
        ));
    }

    let mut message = Message::new(wire.role, content);
    message.function_call = function_call;
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageRole;

    fn kind(body: &str) -> Option<DecodeErrorKind> {
        parse_message_response(body.as_bytes())
            .unwrap_err()
            .decode_kind()
    }

    #[test]
    fn content_response() {
        let message = parse_message_response(
            br#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"Hello"},"finish_reason":"stop"}]}"#,
        )
        .unwrap();
        assert_eq!(message, Message::assistant("Hello"));
    }

    #[test]
    fn function_call_response() {
        let message = parse_message_response(
            br#"{"choices":[{"message":{"role":"assistant","content":null,"function_call":{"name":"lookup","arguments":"{\"q\":\"rust\"}"}}}]}"#,
        )
        .unwrap();
        assert_eq!(message.role, MessageRole::Assistant);
        assert!(message.name.is_none());
        assert!(message.content.is_empty());
        let call = message.function_call.unwrap();
        assert_eq!(call.name, "lookup");
        assert_eq!(call.arguments, r#"{"q":"rust"}"#);
    }

    #[test]
    fn choice_count_is_enforced() {
        assert_eq!(
            kind(
                r#"{"choices":[{"message":{"role":"assistant","content":"a"}},{"message":{"role":"assistant","content":"b"}}]}"#
            ),
            Some(DecodeErrorKind::WrongChoiceCount(2))
        );
        assert_eq!(kind(r#"{"choices":[]}"#), Some(DecodeErrorKind::NoChoices));
        assert_eq!(kind(r#"{"id":"x"}"#), Some(DecodeErrorKind::NoChoices));
    }

    #[test]
    fn empty_message_is_rejected() {
        assert_eq!(
            kind(r#"{"choices":[{"message":{"role":"assistant","content":""}}]}"#),
            Some(DecodeErrorKind::NoContentOrFunctionCall)
        );
        assert_eq!(
            kind(r#"{"choices":[{"message":{"role":"assistant"}}]}"#),
            Some(DecodeErrorKind::NoContentOrFunctionCall)
        );
    }

    #[test]
    fn malformed_bodies() {
        assert_eq!(kind("not json"), Some(DecodeErrorKind::InvalidJson));
        assert_eq!(
            kind(r#"{"choices":[{"delta":{"content":"x"}}]}"#),
            Some(DecodeErrorKind::MalformedMessage)
        );
        assert_eq!(
            kind(r#"{"choices":[{"message":{"role":"robot","content":"x"}}]}"#),
            Some(DecodeErrorKind::MalformedMessage)
        );
        assert_eq!(kind(r#"{"choices":"x"}"#), Some(DecodeErrorKind::MalformedMessage));
    }

    #[test]
    fn embedded_error() {
        let err = parse_message_response(
            br#"{"error":{"message":"model overloaded","type":"server_error","code":null}}"#,
        )
        .unwrap_err();
        assert_eq!(err.code(), Some("server_error"));
        assert!(err.to_string().contains("model overloaded"));
    }
}
