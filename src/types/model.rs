use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Context length assumed for models this crate does not know about.
pub const DEFAULT_CONTEXT_LENGTH: usize = 4096;

/// Represents a chat model identifier.
///
/// This can be a predefined model version or a custom string value
/// for models that may be added in the future.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChatModelId {
    /// Known model versions
    Known(KnownModel),

    /// Custom model identifier (for newer models or compatible servers)
    Custom(String),
}

/// Known chat model versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownModel {
    /// GPT-3.5 Turbo (2023-06-13 snapshot)
    Gpt35Turbo,

    /// GPT-3.5 Turbo with a 16k context (2023-06-13 snapshot)
    Gpt35Turbo16k,

    /// GPT-4 (2023-06-13 snapshot)
    Gpt4,

    /// GPT-4 Turbo preview (2023-11-06)
    Gpt4Turbo,

    /// GPT-4 with a 32k context (2023-06-13 snapshot)
    Gpt4_32k,
}

/// Every known model, its wire identifier, and its context length in tokens.
pub const KNOWN_MODELS: [(KnownModel, &str, usize); 5] = [
    (KnownModel::Gpt35Turbo, "gpt-3.5-turbo-0613", 4096),
    (KnownModel::Gpt35Turbo16k, "gpt-3.5-turbo-16k-0613", 16000),
    (KnownModel::Gpt4, "gpt-4-0613", 8000),
    (KnownModel::Gpt4Turbo, "gpt-4-1106-preview", 128000),
    (KnownModel::Gpt4_32k, "gpt-4-32k-0613", 32000),
];

impl KnownModel {
    fn entry(&self) -> &'static (KnownModel, &'static str, usize) {
        KNOWN_MODELS
            .iter()
            .find(|(model, _, _)| model == self)
            .unwrap_or(&KNOWN_MODELS[0])
    }

    /// The identifier sent on the wire.
    pub fn as_str(&self) -> &'static str {
        self.entry().1
    }

    /// Maximum context length in tokens.
    pub fn context_length(&self) -> usize {
        self.entry().2
    }
}

impl ChatModelId {
    /// Maximum context length in tokens; custom models get [`DEFAULT_CONTEXT_LENGTH`].
    pub fn context_length(&self) -> usize {
        match self {
            ChatModelId::Known(known) => known.context_length(),
            ChatModelId::Custom(_) => DEFAULT_CONTEXT_LENGTH,
        }
    }
}

impl fmt::Display for ChatModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatModelId::Known(known_model) => write!(f, "{}", known_model),
            ChatModelId::Custom(custom) => write!(f, "{}", custom),
        }
    }
}

impl fmt::Display for KnownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ChatModelId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let known = KNOWN_MODELS
            .iter()
            .find(|(_, id, _)| *id == s)
            .map(|(model, _, _)| *model);
        Ok(match known {
            Some(model) => ChatModelId::Known(model),
            None => ChatModelId::Custom(s.to_string()),
        })
    }
}

impl From<KnownModel> for ChatModelId {
    fn from(model: KnownModel) -> Self {
        ChatModelId::Known(model)
    }
}

impl From<&str> for ChatModelId {
    fn from(model: &str) -> Self {
        match model.parse() {
            Ok(id) => id,
            Err(never) => match never {},
        }
    }
}

impl From<String> for ChatModelId {
    fn from(model: String) -> Self {
        ChatModelId::from(model.as_str())
    }
}

impl Serialize for ChatModelId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChatModelId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(ChatModelId::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_model_serialization() {
        let model = ChatModelId::Known(KnownModel::Gpt4Turbo);
        let json = serde_json::to_string(&model).unwrap();
        assert_eq!(json, r#""gpt-4-1106-preview""#);

        let model = ChatModelId::Known(KnownModel::Gpt35Turbo16k);
        let json = serde_json::to_string(&model).unwrap();
        assert_eq!(json, r#""gpt-3.5-turbo-16k-0613""#);
    }

    #[test]
    fn custom_model_serialization() {
        let model = ChatModelId::Custom("gpt-4o-mini".to_string());
        let json = serde_json::to_string(&model).unwrap();
        assert_eq!(json, r#""gpt-4o-mini""#);
    }

    #[test]
    fn model_deserialization() {
        let model: ChatModelId = serde_json::from_str(r#""gpt-4-0613""#).unwrap();
        assert_eq!(model, ChatModelId::Known(KnownModel::Gpt4));

        let model: ChatModelId = serde_json::from_str(r#""local-llama""#).unwrap();
        assert_eq!(model, ChatModelId::Custom("local-llama".to_string()));
    }

    #[test]
    fn context_lengths() {
        assert_eq!(ChatModelId::from(KnownModel::Gpt35Turbo).context_length(), 4096);
        assert_eq!(ChatModelId::from(KnownModel::Gpt35Turbo16k).context_length(), 16000);
        assert_eq!(ChatModelId::from(KnownModel::Gpt4).context_length(), 8000);
        assert_eq!(ChatModelId::from(KnownModel::Gpt4Turbo).context_length(), 128000);
        assert_eq!(ChatModelId::from(KnownModel::Gpt4_32k).context_length(), 32000);
        assert_eq!(
            ChatModelId::from("something-new").context_length(),
            DEFAULT_CONTEXT_LENGTH
        );
    }

    #[test]
    fn display_round_trips_through_parse() {
        for (model, id, _) in KNOWN_MODELS {
            assert_eq!(model.to_string(), id);
            assert_eq!(id.parse::<ChatModelId>().unwrap(), ChatModelId::Known(model));
        }
    }
}
