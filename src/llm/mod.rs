// LLM module
// Completion providers, the retrying service wrapper, and the structured
// output contract shared by all graph nodes

pub mod groq;
pub mod provider;
pub mod schema;
pub mod service;
pub mod types;

pub use groq::GroqProvider;
pub use provider::{CompletionError, CompletionProvider};
pub use schema::{OutputSchema, SchemaParseError, StructuredOutput};
pub use service::{CompletionService, ModelRole};
pub use types::{ChatMessage, ChatRequest};
