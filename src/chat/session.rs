//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which owns the conversation history and sends
//! each turn to the configured model.  History is append-only within a conversation: a turn
//! adds the user message and the model's reply together, and only after the reply is complete.

use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::chat::config::{ChatConfig, DEFAULT_SYSTEM_PROMPT, DEFAULT_TEMPERATURE};
use crate::chat::render::Renderer;
use crate::error::{Error, Result};
use crate::models::{ChatModel, ModelRegistry};
use crate::stream::StreamFragment;
use crate::types::{Message, MessageOptions, MessageRole};

/// A chat session that manages conversation state and API interactions.
pub struct ChatSession {
    registry: ModelRegistry,
    config: ChatConfig,
    history: Vec<Message>,
}

impl ChatSession {
    /// Creates a new chat session; the history starts with the system prompt.
    pub fn new(registry: ModelRegistry, config: ChatConfig) -> Self {
        let history = vec![Message::system(config.system_prompt.clone())];
        Self {
            registry,
            config,
            history,
        }
    }

    /// The model the next turn will use.
    pub fn model(&self) -> Arc<dyn ChatModel> {
        match self.config.model.as_deref() {
            Some(id) => self.registry.resolve(id),
            None if self.config.use_turbo => self.registry.light_model(),
            None => self.registry.default_model(),
        }
    }

    /// Options sent with every request.
    pub fn options(&self) -> MessageOptions {
        MessageOptions::new(self.config.temperature)
            .with_max_tokens(self.config.max_tokens)
            .with_stop_sequences(self.config.stop_sequences.clone())
    }

    /// Send one user turn, streaming or not according to the configuration.
    pub async fn send(
        &mut self,
        user_input: &str,
        renderer: &mut dyn Renderer,
        cancel: CancellationToken,
    ) -> Result<()> {
        if self.config.streaming {
            self.send_streaming(user_input, renderer, cancel).await
        } else {
            self.send_single(user_input, renderer, cancel).await
        }
    }

    /// Sends a user message and streams the response.
    ///
    /// Fragments are rendered as they arrive.  On a clean end the user message and the
    /// assistant reply are appended to the history; on an error or cancellation the history
    /// is left untouched and the error is returned.
    pub async fn send_streaming(
        &mut self,
        user_input: &str,
        renderer: &mut dyn Renderer,
        cancel: CancellationToken,
    ) -> Result<()> {
        let user = Message::user(user_input.trim());
        let conversation = self.pending(&user);
        let model = self.model();
        let mut stream = model
            .message_stream(&conversation, &self.options(), cancel)
            .await?;

        renderer.start_response();
        let mut reply = String::new();
        while let Some(fragment) = stream.next().await {
            match fragment {
                StreamFragment::Text(text) => {
                    renderer.print_text(&text);
                    reply.push_str(&text);
                }
                StreamFragment::Error(err) => {
                    renderer.finish_response();
                    return Err(err);
                }
            }
        }
        renderer.finish_response();

        self.history.push(user);
        self.history.push(Message::assistant(reply.trim()));
        Ok(())
    }

    /// Sends a user message and waits for the complete response.
    ///
    /// Function calls and empty replies are reported as errors and leave the history
    /// untouched.
    pub async fn send_single(
        &mut self,
        user_input: &str,
        renderer: &mut dyn Renderer,
        cancel: CancellationToken,
    ) -> Result<()> {
        let user = Message::user(user_input.trim());
        let conversation = self.pending(&user);
        let model = self.model();
        let mut response = model
            .message(&conversation, &self.options(), cancel)
            .await?;

        if let Some(call) = &response.function_call {
            return Err(Error::validation(
                format!("function call not supported but received: {}", call.name),
                None,
            ));
        }
        let content = response.content.trim();
        if content.is_empty() {
            return Err(Error::validation("empty response", None));
        }
        response.content = content.to_string();

        renderer.start_response();
        renderer.print_text(&response.content);
        renderer.finish_response();

        self.history.push(user);
        self.history.push(response);
        Ok(())
    }

    fn pending(&self, user: &Message) -> Vec<Message> {
        let mut conversation = Vec::with_capacity(self.history.len() + 1);
        conversation.extend_from_slice(&self.history);
        conversation.push(user.clone());
        conversation
    }

    /// Starts a new conversation seeded with the system prompt.
    pub fn clear(&mut self) {
        self.history = vec![Message::system(self.config.system_prompt.clone())];
    }

    /// The conversation so far, system prompt first.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Returns the number of messages in the conversation, excluding the system prompt.
    pub fn message_count(&self) -> usize {
        self.history
            .iter()
            .filter(|message| message.role != MessageRole::System)
            .count()
    }

    /// The active configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Changes the model used for responses.
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.config.model = Some(model.into());
    }

    /// Sets the system prompt and starts a new conversation with it.
    ///
    /// `None` restores the built-in prompt.
    pub fn set_system_prompt(&mut self, prompt: Option<String>) {
        self.config.system_prompt = prompt.unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
        self.clear();
    }

    /// Returns the current system prompt.
    pub fn system_prompt(&self) -> &str {
        &self.config.system_prompt
    }

    /// Sets the sampling temperature; `None` restores the default.
    pub fn set_temperature(&mut self, temperature: Option<f32>) {
        self.config.temperature = temperature.unwrap_or(DEFAULT_TEMPERATURE);
    }

    /// Sets or removes the cap on response tokens.
    pub fn set_max_tokens(&mut self, max_tokens: Option<u32>) {
        self.config.max_tokens = max_tokens;
    }

    /// Adds a stop sequence to the persistent list.
    pub fn add_stop_sequence(&mut self, sequence: String) {
        if !self.config.stop_sequences.contains(&sequence) {
            self.config.stop_sequences.push(sequence);
        }
    }

    /// Clears all stop sequences.
    pub fn clear_stop_sequences(&mut self) {
        self.config.stop_sequences.clear();
    }

    /// Returns the configured stop sequences.
    pub fn stop_sequences(&self) -> &[String] {
        &self.config.stop_sequences
    }

    /// Turns streaming on or off.
    pub fn set_streaming(&mut self, streaming: bool) {
        self.config.streaming = streaming;
    }

    /// Prefers the light model when no model is named.
    pub fn set_turbo(&mut self, use_turbo: bool) {
        self.config.use_turbo = use_turbo;
    }
}
