//! Output rendering for the chat application.
//!
//! Response text goes to stdout as it arrives.  Informational lines are gray and errors are
//! red; both are plain when color is disabled.

use std::io::{self, Stdout, Write};

/// ANSI escape code for gray text (used for informational lines).
const ANSI_GRAY: &str = "\x1b[90m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// ANSI escape code for bold text (used for speaker labels).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// Trait for rendering chat output.
pub trait Renderer: Send {
    /// Called before the first piece of a response.
    fn start_response(&mut self);

    /// Print a chunk of response text.
    ///
    /// This is called incrementally as fragments are streamed from the API.
    fn print_text(&mut self, text: &str);

    /// Called when a response is complete.
    fn finish_response(&mut self);

    /// Called when the stream is interrupted by the user.
    fn print_interrupted(&mut self);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    in_response: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            in_response: false,
        }
    }

    /// The prompt shown before user input.
    pub fn prompt(&self) -> String {
        label("user: ", self.use_color)
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn end_response_line(&mut self) {
        if self.in_response {
            println!();
            self.in_response = false;
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn start_response(&mut self) {
        print!("{}", label("bot: ", self.use_color));
        self.in_response = true;
        self.flush();
    }

    fn print_text(&mut self, text: &str) {
        print!("{text}");
        self.flush();
    }

    fn finish_response(&mut self) {
        self.end_response_line();
        self.flush();
    }

    fn print_interrupted(&mut self) {
        self.end_response_line();
        println!("{}", colorize("[interrupted]", ANSI_GRAY, self.use_color));
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        self.end_response_line();
        self.flush();
        eprintln!(
            "{}",
            colorize(&format!("error: {error}"), ANSI_RED, self.use_color)
        );
    }

    fn print_info(&mut self, info: &str) {
        self.end_response_line();
        println!("{}", colorize(info, ANSI_GRAY, self.use_color));
        self.flush();
    }
}

fn colorize(text: &str, color: &str, use_color: bool) -> String {
    if use_color {
        format!("{color}{text}{ANSI_RESET}")
    } else {
        text.to_string()
    }
}

fn label(text: &str, use_color: bool) -> String {
    colorize(text, ANSI_BOLD, use_color)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color);
        assert_eq!(renderer.prompt(), "\x1b[1muser: \x1b[0m");
    }

    #[test]
    fn renderer_without_color() {
        let renderer = PlainTextRenderer::with_color(false);
        assert!(!renderer.use_color);
        assert_eq!(renderer.prompt(), "user: ");
    }

    #[test]
    fn colorize_wraps_only_when_enabled() {
        assert_eq!(colorize("x", ANSI_RED, true), "\x1b[31mx\x1b[0m");
        assert_eq!(colorize("x", ANSI_RED, false), "x");
    }
}
