//! Chat application module for interactive conversations with a completion model.
//!
//! This module provides a REPL chat interface built on top of the
//! llm-chat client library. It supports:
//!
//! - Streaming responses with real-time display and Ctrl-C cancellation
//! - Single-shot responses when streaming is disabled
//! - Slash commands for session control
//! - Configuration from flags and an optional YAML file
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: Conversation history and API interaction
//! - [`commands`]: Slash command parsing
//! - [`render`]: Terminal output

mod commands;
mod config;
mod render;
mod session;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{
    ChatArgs, ChatConfig, ConfigFile, DEFAULT_SYSTEM_PROMPT, DEFAULT_TEMPERATURE, MAX_TEMPERATURE,
    parse_temperature,
};
pub use render::{PlainTextRenderer, Renderer};
pub use session::ChatSession;
