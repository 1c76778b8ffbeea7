use serde::Serialize;

use crate::types::{
    ChatModelId, FunctionCallDirective, FunctionDef, Message, MessageOptions, MessageRole,
};

/// One message as it is sent to the API: role, content, and an optional author name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestMessage {
    role: MessageRole,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl From<&Message> for RequestMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
            name: message.name.clone().filter(|name| !name.is_empty()),
        }
    }
}

/// The body of a chat-completion request.
///
/// A request is built once from a conversation and a set of options and is not modified
/// afterwards; [`CompletionRequest::into_streaming`] consumes it to produce the streaming form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    model: ChatModelId,
    messages: Vec<RequestMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    functions: Vec<FunctionDef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCallDirective>,
    #[serde(skip_serializing_if = "is_false")]
    stream: bool,
}

impl CompletionRequest {
    /// Build a single-shot request.
    pub fn new(model: ChatModelId, messages: &[Message], options: &MessageOptions) -> Self {
        Self {
            model,
            messages: messages.iter().map(RequestMessage::from).collect(),
            temperature: options.temperature,
            max_tokens: options.max_tokens.filter(|max| *max > 0),
            stop: options.stop_sequences.clone(),
            functions: options.functions.clone(),
            function_call: options.function_call.clone(),
            stream: false,
        }
    }

    /// Turn this request into one that asks for an SSE response.
    pub fn into_streaming(mut self) -> Self {
        self.stream = true;
        self
    }

    /// The model this request targets.
    pub fn model(&self) -> &ChatModelId {
        &self.model
    }

    /// The messages that will be sent.
    pub fn messages(&self) -> &[RequestMessage] {
        &self.messages
    }

    /// Whether the request asks for a streamed response.
    pub fn is_streaming(&self) -> bool {
        self.stream
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}
