//! Chat models and the registry that binds them to a transport.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::completion::parse_message_response;
use crate::error::Result;
use crate::stream::CompletionStream;
use crate::transport::{CHAT_COMPLETIONS_ENDPOINT, Transport};
use crate::types::{
    ChatModelId, CompletionRequest, KNOWN_MODELS, KnownModel, Message, MessageOptions,
};

//////////////////////////////////////////// ChatModel /////////////////////////////////////////////

/// A model that can continue a conversation.
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    /// Start a streaming completion.
    ///
    /// Returns once the response headers have arrived; text then flows through the returned
    /// stream.  Cancelling `cancel` aborts the request or stops the stream.
    async fn message_stream(
        &self,
        messages: &[Message],
        options: &MessageOptions,
        cancel: CancellationToken,
    ) -> Result<CompletionStream>;

    /// Request a complete response in one round trip.
    async fn message(
        &self,
        messages: &[Message],
        options: &MessageOptions,
        cancel: CancellationToken,
    ) -> Result<Message>;

    /// Maximum context length in tokens.
    fn context_length(&self) -> usize;

    /// The identifier sent on the wire.
    fn id(&self) -> &ChatModelId;
}

///////////////////////////////////////// OpenAiChatModel //////////////////////////////////////////

/// A chat model served by an OpenAI-compatible completion API.
#[derive(Debug, Clone)]
pub struct OpenAiChatModel {
    id: ChatModelId,
    transport: Arc<Transport>,
}

impl OpenAiChatModel {
    pub fn new(id: impl Into<ChatModelId>, transport: Arc<Transport>) -> Self {
        Self {
            id: id.into(),
            transport,
        }
    }
}

#[async_trait::async_trait]
impl ChatModel for OpenAiChatModel {
    async fn message_stream(
        &self,
        messages: &[Message],
        options: &MessageOptions,
        cancel: CancellationToken,
    ) -> Result<CompletionStream> {
        let request = CompletionRequest::new(self.id.clone(), messages, options).into_streaming();
        let body = self
            .transport
            .post_stream(CHAT_COMPLETIONS_ENDPOINT, &request, &cancel)
            .await?;
        tracing::debug!(model = %self.id, "completion stream opened");
        Ok(CompletionStream::spawn(body, cancel))
    }

    async fn message(
        &self,
        messages: &[Message],
        options: &MessageOptions,
        cancel: CancellationToken,
    ) -> Result<Message> {
        let request = CompletionRequest::new(self.id.clone(), messages, options);
        let body = self
            .transport
            .post_json(CHAT_COMPLETIONS_ENDPOINT, &request, &cancel)
            .await?;
        parse_message_response(&body)
    }

    fn context_length(&self) -> usize {
        self.id.context_length()
    }

    fn id(&self) -> &ChatModelId {
        &self.id
    }
}

////////////////////////////////////////// ModelRegistry ///////////////////////////////////////////

/// Every known model bound to one transport, plus the defaults for each role.
///
/// The registry is built once and never modified.
#[derive(Clone)]
pub struct ModelRegistry {
    transport: Arc<Transport>,
    models: BTreeMap<String, Arc<dyn ChatModel>>,
    default: Arc<dyn ChatModel>,
    long_context: Arc<dyn ChatModel>,
    light: Arc<dyn ChatModel>,
    cheap: Arc<dyn ChatModel>,
}

impl ModelRegistry {
    pub fn new(transport: Transport) -> Self {
        let transport = Arc::new(transport);
        let models: BTreeMap<String, Arc<dyn ChatModel>> = KNOWN_MODELS
            .iter()
            .map(|(model, id, _)| {
                let chat: Arc<dyn ChatModel> =
                    Arc::new(OpenAiChatModel::new(*model, Arc::clone(&transport)));
                (id.to_string(), chat)
            })
            .collect();
        let pick = |model: KnownModel| -> Arc<dyn ChatModel> {
            match models.get(model.as_str()) {
                Some(chat) => Arc::clone(chat),
                None => Arc::new(OpenAiChatModel::new(model, Arc::clone(&transport))),
            }
        };
        let default = pick(KnownModel::Gpt4Turbo);
        let long_context = pick(KnownModel::Gpt4Turbo);
        let light = pick(KnownModel::Gpt4Turbo);
        let cheap = pick(KnownModel::Gpt35Turbo);
        Self {
            transport,
            models,
            default,
            long_context,
            light,
            cheap,
        }
    }

    /// The general-purpose default model.
    pub fn default_model(&self) -> Arc<dyn ChatModel> {
        Arc::clone(&self.default)
    }

    /// The default model for long conversations.
    pub fn long_context_model(&self) -> Arc<dyn ChatModel> {
        Arc::clone(&self.long_context)
    }

    /// The default model selected by `--turbo`.
    pub fn light_model(&self) -> Arc<dyn ChatModel> {
        Arc::clone(&self.light)
    }

    /// The least expensive default model.
    pub fn cheap_model(&self) -> Arc<dyn ChatModel> {
        Arc::clone(&self.cheap)
    }

    /// Look up a model by wire identifier.
    ///
    /// Unknown identifiers produce an ad hoc model on the same transport with the default
    /// context length.
    pub fn resolve(&self, id: &str) -> Arc<dyn ChatModel> {
        match self.models.get(id) {
            Some(model) => Arc::clone(model),
            None => Arc::new(OpenAiChatModel::new(id, Arc::clone(&self.transport))),
        }
    }

    /// Identifiers of every known model, sorted.
    pub fn known_ids(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("models", &self.models.keys().collect::<Vec<_>>())
            .field("default", self.default.id())
            .field("light", self.light.id())
            .field("cheap", self.cheap.id())
            .finish()
    }
}
