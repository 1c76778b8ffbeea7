// Public modules
pub mod function;
pub mod message;
pub mod model;
pub mod options;
pub mod request;

// Re-exports
pub use function::{ArrayItems, FunctionCallDirective, FunctionDef, Parameters, Property};
pub use message::{FunctionCall, Message, MessageRole};
pub use model::{ChatModelId, DEFAULT_CONTEXT_LENGTH, KNOWN_MODELS, KnownModel};
pub use options::MessageOptions;
pub use request::{CompletionRequest, RequestMessage};
