//! Configuration types for the chat application.
//!
//! Settings come from three layers: built-in defaults, an optional YAML file named by
//! `--config`, and command-line flags parsed with `arrrg`.  Later layers override earlier ones.

use std::path::Path;

use arrrg_derive::CommandLine;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.0;

/// Largest temperature the completion API accepts.
pub const MAX_TEMPERATURE: f32 = 2.0;

/// System prompt used when none is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant running inside a terminal. \
Answer concisely and format code in fenced Markdown blocks.";

/// Command-line arguments for the llm-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: gpt-4-1106-preview)", "MODEL")]
    pub model: Option<String>,

    /// System prompt to set context for the conversation.
    #[arrrg(optional, "System prompt for the conversation", "PROMPT")]
    pub system: Option<String>,

    /// Sampling temperature, kept as text until validated.
    #[arrrg(optional, "Sampling temperature 0.0-2.0 (default: 0.0)", "TEMP")]
    pub temperature: Option<String>,

    /// Maximum tokens per response.
    #[arrrg(optional, "Max tokens per response (default: model limit)", "TOKENS")]
    pub max_tokens: Option<u32>,

    /// API key; `-` reads OPENAI_API_KEY.
    #[arrrg(optional, "API key (default: $OPENAI_API_KEY; '-' also reads it)", "KEY")]
    pub api_key: Option<String>,

    /// Base URL of the completion API.
    #[arrrg(optional, "API base URL (default: https://api.openai.com/v1/)", "URL")]
    pub base_url: Option<String>,

    /// YAML file with default settings.
    #[arrrg(optional, "YAML config file", "FILE")]
    pub config: Option<String>,

    /// Use the light model.
    #[arrrg(flag, "Use the light (turbo) model")]
    pub turbo: bool,

    /// Request complete responses instead of streams.
    #[arrrg(flag, "Disable streaming responses")]
    pub disable_streaming: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Settings read from a YAML config file.  Every key is optional.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub model: Option<String>,
    pub system: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub stop: Vec<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub turbo: Option<bool>,
    pub streaming: Option<bool>,
    pub color: Option<bool>,
}

impl ConfigFile {
    /// Parse a config file from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|err| {
            Error::validation(format!("invalid config file: {err}"), Some("config".to_string()))
        })
    }

    /// Load a config file from disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|err| {
            Error::io(format!("failed to read config file {}", path.display()), err)
        })?;
        Self::from_yaml(&content)
    }
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after merging defaults, the config
/// file, and command-line arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Explicit model identifier.  `None` selects the registry default (or the light model
    /// when `use_turbo` is set).
    pub model: Option<String>,

    /// System prompt that seeds every conversation.
    pub system_prompt: String,

    /// Sampling temperature.
    pub temperature: f32,

    /// Optional cap on response tokens.
    pub max_tokens: Option<u32>,

    /// Custom stop sequences supplied on every request.
    pub stop_sequences: Vec<String>,

    /// Whether responses are streamed.
    pub streaming: bool,

    /// Whether to prefer the light model when no model is named.
    pub use_turbo: bool,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// API key, if given explicitly.
    pub api_key: Option<String>,

    /// Base URL override.
    pub base_url: Option<String>,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: registry default
    /// - Temperature: 0.0
    /// - Streaming: enabled
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            model: None,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            stop_sequences: Vec::new(),
            streaming: true,
            use_turbo: false,
            use_color: true,
            api_key: None,
            base_url: None,
        }
    }

    /// Resolve the configuration for a command line, reading `--config` if given.
    pub fn from_args(args: ChatArgs) -> Result<Self> {
        let file = match args.config.as_deref() {
            Some(path) => ConfigFile::from_file(path)?,
            None => ConfigFile::default(),
        };
        Self::new().merge_file(file)?.merge_args(args)
    }

    /// Apply the values present in a config file.
    pub fn merge_file(mut self, file: ConfigFile) -> Result<Self> {
        if let Some(model) = file.model {
            self.model = Some(model);
        }
        if let Some(system) = file.system {
            self.system_prompt = system;
        }
        if let Some(temperature) = file.temperature {
            self.temperature = validate_temperature(temperature)?;
        }
        if file.max_tokens.is_some() {
            self.max_tokens = file.max_tokens;
        }
        if !file.stop.is_empty() {
            self.stop_sequences = file.stop;
        }
        if file.api_key.is_some() {
            self.api_key = file.api_key;
        }
        if file.base_url.is_some() {
            self.base_url = file.base_url;
        }
        if let Some(turbo) = file.turbo {
            self.use_turbo = turbo;
        }
        if let Some(streaming) = file.streaming {
            self.streaming = streaming;
        }
        if let Some(color) = file.color {
            self.use_color = color;
        }
        Ok(self)
    }

    /// Apply the values given on the command line.
    ///
    /// Flags can only switch their setting on (`--turbo`) or off (`--disable-streaming`,
    /// `--no-color`); an absent flag leaves the earlier layer alone.
    pub fn merge_args(mut self, args: ChatArgs) -> Result<Self> {
        if args.model.is_some() {
            self.model = args.model;
        }
        if let Some(system) = args.system {
            self.system_prompt = system;
        }
        if let Some(temperature) = args.temperature.as_deref() {
            self.temperature = parse_temperature(temperature)?;
        }
        if args.max_tokens.is_some() {
            self.max_tokens = args.max_tokens;
        }
        if args.api_key.is_some() {
            self.api_key = args.api_key;
        }
        if args.base_url.is_some() {
            self.base_url = args.base_url;
        }
        if args.turbo {
            self.use_turbo = true;
        }
        if args.disable_streaming {
            self.streaming = false;
        }
        if args.no_color {
            self.use_color = false;
        }
        Ok(self)
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the maximum tokens per response.
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the stop sequences.
    pub fn with_stop_sequences(mut self, stop_sequences: Vec<String>) -> Self {
        self.stop_sequences = stop_sequences;
        self
    }

    /// Enables or disables streaming.
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Prefers the light model.
    pub fn with_turbo(mut self, use_turbo: bool) -> Self {
        self.use_turbo = use_turbo;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse and range-check a temperature given as text.
pub fn parse_temperature(value: &str) -> Result<f32> {
    let parsed: f32 = value.trim().parse().map_err(|_| {
        Error::validation(
            format!("temperature expects a value between 0 and {MAX_TEMPERATURE}"),
            Some("temperature".to_string()),
        )
    })?;
    validate_temperature(parsed)
}

fn validate_temperature(value: f32) -> Result<f32> {
    if value.is_finite() && (0.0..=MAX_TEMPERATURE).contains(&value) {
        Ok(value)
    } else {
        Err(Error::validation(
            format!("temperature expects a value between 0 and {MAX_TEMPERATURE}"),
            Some("temperature".to_string()),
        ))
    }
}
