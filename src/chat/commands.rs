//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without sending messages
//! to the API.  The bare words `exit` and `help` are accepted as well.

use super::config::{MAX_TEMPERATURE, parse_temperature};

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the API.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Start a new conversation seeded with the system prompt.
    Clear,

    /// Change the model.
    Model(String),

    /// Set the system prompt.
    /// `None` restores the built-in prompt.
    System(Option<String>),

    /// Set the maximum tokens per response.
    MaxTokens(u32),

    /// Remove the response token cap.
    ClearMaxTokens,

    /// Set the sampling temperature.
    Temperature(f32),

    /// Reset the sampling temperature to the default.
    ClearTemperature,

    /// Add a stop sequence.
    AddStopSequence(String),

    /// Clear all stop sequences.
    ClearStopSequences,

    /// List stop sequences.
    ListStopSequences,

    /// Turn streaming on or off.
    Stream(bool),

    /// Prefer the light model, or stop preferring it.
    Turbo(bool),

    /// Print the conversation so far.
    History,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Show the current configuration.
    ShowConfig,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for commands.
///
/// Returns `Some(ChatCommand)` if the input is a command,
/// or `None` if it should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use llm_chat::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("exit").is_some());
/// assert!(parse_command("/model gpt-4-0613").is_some());
/// assert!(parse_command("Hello there!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    match input {
        "exit" => return Some(ChatCommand::Quit),
        "help" => return Some(ChatCommand::Help),
        _ => {}
    }

    let rest = input.strip_prefix('/')?;
    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "clear" | "new" => ChatCommand::Clear,
        "model" => match argument {
            Some(model) => ChatCommand::Model(model.to_string()),
            None => ChatCommand::Invalid("/model requires a model name".to_string()),
        },
        "system" => ChatCommand::System(argument.map(|s| s.to_string())),
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "config" => ChatCommand::ShowConfig,
        "history" => ChatCommand::History,
        "max_tokens" => match argument {
            Some(arg) if arg.eq_ignore_ascii_case("clear") => ChatCommand::ClearMaxTokens,
            Some(arg) => match arg.parse::<u32>() {
                Ok(value) if value > 0 => ChatCommand::MaxTokens(value),
                _ => ChatCommand::Invalid("/max_tokens expects a positive integer".to_string()),
            },
            None => ChatCommand::Invalid("/max_tokens requires a value".to_string()),
        },
        "temperature" => match argument {
            Some(arg) if arg.eq_ignore_ascii_case("clear") => ChatCommand::ClearTemperature,
            Some(arg) => match parse_temperature(arg) {
                Ok(value) => ChatCommand::Temperature(value),
                Err(_) => ChatCommand::Invalid(format!(
                    "/temperature expects a value between 0 and {MAX_TEMPERATURE}"
                )),
            },
            None => ChatCommand::Invalid("/temperature requires a value".to_string()),
        },
        "stop" => parse_stop_command(argument),
        "stream" => match argument.and_then(parse_on_off) {
            Some(value) => ChatCommand::Stream(value),
            None => ChatCommand::Invalid("/stream expects 'on' or 'off'".to_string()),
        },
        "turbo" => match argument.and_then(parse_on_off) {
            Some(value) => ChatCommand::Turbo(value),
            None => ChatCommand::Invalid("/turbo expects 'on' or 'off'".to_string()),
        },
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

fn parse_stop_command(argument: Option<&str>) -> ChatCommand {
    let Some(arg) = argument else {
        return ChatCommand::Invalid(
            "/stop requires 'add <sequence>', 'clear', or 'list'".to_string(),
        );
    };

    let (action, rest) = match arg.split_once(' ') {
        Some((action, rest)) => (action, Some(rest.trim()).filter(|s| !s.is_empty())),
        None => (arg, None),
    };
    match action.to_lowercase().as_str() {
        "add" => match rest {
            Some(sequence) => ChatCommand::AddStopSequence(sequence.to_string()),
            None => ChatCommand::Invalid("/stop add requires a sequence".to_string()),
        },
        "clear" => ChatCommand::ClearStopSequences,
        "list" => ChatCommand::ListStopSequences,
        _ => {
            ChatCommand::Invalid("Unrecognized /stop action (use add, clear, or list)".to_string())
        }
    }
}

fn parse_on_off(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /clear                 Start a new conversation
  /model <name>          Change the model (e.g., /model gpt-4-0613)
  /system [prompt]       Set system prompt and restart (no argument restores the default)
  /max_tokens <n>        Set maximum response tokens (use 'clear' to remove the cap)
  /temperature <v>       Set temperature 0.0-2.0 (use 'clear' to reset)
  /stop add <seq>        Add a stop sequence
  /stop clear            Clear all stop sequences
  /stop list             List current stop sequences
  /stream on|off         Stream responses as they are generated
  /turbo on|off          Use the light model when no model is named
  /history               Show the conversation so far
  /config                Show current configuration
  /help                  Show this help message
  /quit                  Exit the chat (also: exit)

Press Ctrl-C while a response is arriving to stop it."#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("  /quit  "), Some(ChatCommand::Quit));
        assert_eq!(parse_command("exit"), Some(ChatCommand::Quit));
    }

    #[test]
    fn bare_words_only_match_alone() {
        assert_eq!(parse_command("help"), Some(ChatCommand::Help));
        assert_eq!(parse_command("help me write a poem"), None);
        assert_eq!(parse_command("exit strategy?"), None);
    }

    #[test]
    fn parse_clear() {
        assert_eq!(parse_command("/clear"), Some(ChatCommand::Clear));
        assert_eq!(parse_command("/CLEAR"), Some(ChatCommand::Clear));
    }

    #[test]
    fn parse_model() {
        assert_eq!(
            parse_command("/model gpt-4-0613"),
            Some(ChatCommand::Model("gpt-4-0613".to_string()))
        );
        assert_eq!(
            parse_command("/model   gpt-3.5-turbo-0613  "),
            Some(ChatCommand::Model("gpt-3.5-turbo-0613".to_string()))
        );
        assert_eq!(
            parse_command("/model"),
            Some(ChatCommand::Invalid(
                "/model requires a model name".to_string()
            ))
        );
    }

    #[test]
    fn parse_system() {
        assert_eq!(
            parse_command("/system You are a helpful assistant"),
            Some(ChatCommand::System(Some(
                "You are a helpful assistant".to_string()
            )))
        );
        assert_eq!(parse_command("/system"), Some(ChatCommand::System(None)));
    }

    #[test]
    fn parse_temperature_command() {
        assert_eq!(
            parse_command("/temperature 0.5"),
            Some(ChatCommand::Temperature(0.5))
        );
        assert_eq!(
            parse_command("/temperature 1.8"),
            Some(ChatCommand::Temperature(1.8))
        );
        assert_eq!(
            parse_command("/temperature clear"),
            Some(ChatCommand::ClearTemperature)
        );
        assert!(matches!(
            parse_command("/temperature"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("requires")
        ));
        assert!(matches!(
            parse_command("/temperature 3"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("between")
        ));
    }

    #[test]
    fn parse_max_tokens() {
        assert_eq!(
            parse_command("/max_tokens 256"),
            Some(ChatCommand::MaxTokens(256))
        );
        assert_eq!(
            parse_command("/max_tokens clear"),
            Some(ChatCommand::ClearMaxTokens)
        );
        assert!(matches!(
            parse_command("/max_tokens 0"),
            Some(ChatCommand::Invalid(_))
        ));
        assert!(matches!(
            parse_command("/max_tokens lots"),
            Some(ChatCommand::Invalid(_))
        ));
    }

    #[test]
    fn parse_stop_commands() {
        assert_eq!(
            parse_command("/stop add END"),
            Some(ChatCommand::AddStopSequence("END".to_string()))
        );
        assert_eq!(
            parse_command("/stop add two words"),
            Some(ChatCommand::AddStopSequence("two words".to_string()))
        );
        assert_eq!(
            parse_command("/stop clear"),
            Some(ChatCommand::ClearStopSequences)
        );
        assert_eq!(
            parse_command("/stop list"),
            Some(ChatCommand::ListStopSequences)
        );
        assert!(matches!(
            parse_command("/stop add"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("sequence")
        ));
    }

    #[test]
    fn parse_toggles() {
        assert_eq!(parse_command("/stream off"), Some(ChatCommand::Stream(false)));
        assert_eq!(parse_command("/stream ON"), Some(ChatCommand::Stream(true)));
        assert_eq!(parse_command("/turbo on"), Some(ChatCommand::Turbo(true)));
        assert!(matches!(
            parse_command("/turbo maybe"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("expects")
        ));
    }

    #[test]
    fn parse_history_and_config() {
        assert_eq!(parse_command("/history"), Some(ChatCommand::History));
        assert_eq!(parse_command("/config"), Some(ChatCommand::ShowConfig));
        assert!(matches!(
            parse_command("/bogus"),
            Some(ChatCommand::Invalid(msg)) if msg == "Unknown command: /bogus"
        ));
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("Hello there!"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("  "), None);
    }

    #[test]
    fn help_text_not_empty() {
        let help = help_text();
        assert!(help.contains("/quit"));
        assert!(help.contains("/clear"));
        assert!(help.contains("/model"));
        assert!(help.contains("/stream"));
    }
}
