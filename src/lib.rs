// Public modules
pub mod chat;
pub mod completion;
pub mod error;
pub mod models;
pub mod observability;
pub mod sse;
pub mod stream;
pub mod transport;
pub mod types;

mod wire;

// Re-exports
pub use completion::parse_message_response;
pub use error::{DecodeErrorKind, Error, Result};
pub use models::{ChatModel, ModelRegistry, OpenAiChatModel};
pub use observability::register_biometrics;
pub use sse::{DecodedDelta, FrameCodec, decode_frame};
pub use stream::{CompletionStream, StreamFragment, StreamOutcome};
pub use transport::Transport;
pub use types::*;
