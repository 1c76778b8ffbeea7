use crate::types::{FunctionCallDirective, FunctionDef};

/// Generation options applied to a single completion request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageOptions {
    /// Sampling temperature.
    pub temperature: f32,

    /// Upper bound on generated tokens; `None` leaves it to the API.
    pub max_tokens: Option<u32>,

    /// Sequences that end generation.
    pub stop_sequences: Vec<String>,

    /// Functions the model may call.
    pub functions: Vec<FunctionDef>,

    /// How the model should choose among `functions`.
    pub function_call: Option<FunctionCallDirective>,
}

impl MessageOptions {
    /// Options with the given temperature and nothing else set.
    pub fn new(temperature: f32) -> Self {
        Self {
            temperature,
            ..Self::default()
        }
    }

    /// Sets the maximum tokens.
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the stop sequences.
    pub fn with_stop_sequences(mut self, stop_sequences: Vec<String>) -> Self {
        self.stop_sequences = stop_sequences;
        self
    }

    /// Sets the callable functions.
    pub fn with_functions(mut self, functions: Vec<FunctionDef>) -> Self {
        self.functions = functions;
        self
    }

    /// Sets the function-call directive.
    pub fn with_function_call(mut self, function_call: FunctionCallDirective) -> Self {
        self.function_call = Some(function_call);
        self
    }
}
