//! Interactive chat against an OpenAI-compatible completion API.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage; the key comes from OPENAI_API_KEY
//! llm-chat
//!
//! # Use the light model and complete responses instead of streams
//! llm-chat --turbo --disable-streaming
//!
//! # Read defaults from a file, override the temperature
//! llm-chat --config ~/.config/llm-chat.yaml --temperature 0.7
//! ```
//!
//! Set `LLM_CHAT_LOG=debug` to see request and stream diagnostics on stderr.

use std::sync::{Arc, Mutex};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use llm_chat::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, help_text,
    parse_command,
};
use llm_chat::{ModelRegistry, Transport};

const LOG_ENV: &str = "LLM_CHAT_LOG";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("llm-chat [OPTIONS]");
    let config = ChatConfig::from_args(args)?;
    let use_color = config.use_color;

    let transport = Transport::with_options(config.api_key.clone(), config.base_url.clone(), None)?;
    let mut session = ChatSession::new(ModelRegistry::new(transport), config);
    let mut renderer = PlainTextRenderer::with_color(use_color);
    let mut rl = DefaultEditor::new()?;

    // Ctrl-C while a response is arriving cancels that turn only.
    let turn = Arc::new(Mutex::new(CancellationToken::new()));
    let turn_for_handler = Arc::clone(&turn);
    ctrlc::set_handler(move || {
        if let Ok(token) = turn_for_handler.lock() {
            token.cancel();
        }
    })?;

    let bar = "-".repeat(80);
    println!("\n{bar}\nConversation (model: {})\n{bar}", session.model().id());
    renderer.print_info("Type /help for commands, exit to quit.");

    loop {
        match rl.readline(&renderer.prompt()) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    if !run_command(cmd, &mut session, &mut renderer) {
                        break;
                    }
                    continue;
                }

                let cancel = CancellationToken::new();
                if let Ok(mut current) = turn.lock() {
                    *current = cancel.clone();
                }
                match session.send(line, &mut renderer, cancel).await {
                    Ok(()) => {}
                    Err(err) if err.is_cancelled() => renderer.print_interrupted(),
                    Err(err) => renderer.print_error(&err.to_string()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                renderer.print_info("\nexiting...");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

/// Apply one command.  Returns false when the loop should end.
fn run_command(
    cmd: ChatCommand,
    session: &mut ChatSession,
    renderer: &mut PlainTextRenderer,
) -> bool {
    match cmd {
        ChatCommand::Quit => {
            renderer.print_info("exiting...");
            return false;
        }
        ChatCommand::Clear => {
            session.clear();
            renderer.print_info("Started a new conversation.");
        }
        ChatCommand::Help => {
            for line in help_text().lines() {
                renderer.print_info(&format!("    {line}"));
            }
        }
        ChatCommand::Model(model) => {
            session.set_model(model);
            let model = session.model();
            renderer.print_info(&format!(
                "Model changed to: {} (context length {})",
                model.id(),
                model.context_length()
            ));
        }
        ChatCommand::System(prompt) => {
            let cleared = prompt.is_none();
            session.set_system_prompt(prompt);
            if cleared {
                renderer.print_info("System prompt restored to the default; new conversation.");
            } else {
                renderer.print_info("System prompt set; new conversation.");
            }
        }
        ChatCommand::MaxTokens(value) => {
            session.set_max_tokens(Some(value));
            renderer.print_info(&format!("max_tokens set to {value}"));
        }
        ChatCommand::ClearMaxTokens => {
            session.set_max_tokens(None);
            renderer.print_info("max_tokens cleared");
        }
        ChatCommand::Temperature(value) => {
            session.set_temperature(Some(value));
            renderer.print_info(&format!("temperature set to {:.2}", value));
        }
        ChatCommand::ClearTemperature => {
            session.set_temperature(None);
            renderer.print_info("temperature reset to default");
        }
        ChatCommand::AddStopSequence(sequence) => {
            renderer.print_info(&format!("Added stop sequence: {sequence}"));
            session.add_stop_sequence(sequence);
        }
        ChatCommand::ClearStopSequences => {
            session.clear_stop_sequences();
            renderer.print_info("Stop sequences cleared.");
        }
        ChatCommand::ListStopSequences => {
            print_stop_sequences(session.stop_sequences(), renderer);
        }
        ChatCommand::Stream(on) => {
            session.set_streaming(on);
            renderer.print_info(if on { "Streaming enabled." } else { "Streaming disabled." });
        }
        ChatCommand::Turbo(on) => {
            session.set_turbo(on);
            renderer.print_info(&format!("Using model {}", session.model().id()));
        }
        ChatCommand::History => {
            for message in session.history() {
                renderer.print_info(&format!("{}: {}", message.role, message.content));
            }
        }
        ChatCommand::ShowConfig => {
            print_config(session, renderer);
        }
        ChatCommand::Invalid(message) => {
            renderer.print_error(&message);
        }
    }
    true
}

fn print_config(session: &ChatSession, renderer: &mut PlainTextRenderer) {
    let config = session.config();
    let model = session.model();
    renderer.print_info("    Current Configuration:");
    renderer.print_info(&format!(
        "      Model: {} ({} tokens)",
        model.id(),
        model.context_length()
    ));
    renderer.print_info(&format!("      Temperature: {:.2}", config.temperature));
    renderer.print_info(&format!(
        "      Max tokens: {}",
        config
            .max_tokens
            .map(|v| v.to_string())
            .unwrap_or_else(|| "default".to_string())
    ));
    renderer.print_info(&format!("      Streaming: {}", config.streaming));
    renderer.print_info(&format!("      Turbo: {}", config.use_turbo));
    renderer.print_info(&format!("      Messages: {}", session.message_count()));
    renderer.print_info(&format!("      System prompt: {}", config.system_prompt));
    print_stop_sequences(&config.stop_sequences, renderer);
}

fn print_stop_sequences(stop_sequences: &[String], renderer: &mut PlainTextRenderer) {
    if stop_sequences.is_empty() {
        renderer.print_info("      Stop sequences: (none)");
    } else {
        renderer.print_info("      Stop sequences:");
        for seq in stop_sequences {
            renderer.print_info(&format!("        - {}", seq));
        }
    }
}
