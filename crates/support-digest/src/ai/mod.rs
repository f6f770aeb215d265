//! Text-generation backends used by the summarization engine.

pub mod openai;
pub mod provider;

pub use openai::OpenAIProvider;
pub use provider::{AIMessage, AIProvider, AIResponse, AIRole, GenerateOptions, TokenUsage};
