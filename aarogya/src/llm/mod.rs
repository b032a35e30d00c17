mod api;
mod message;
pub mod prompts;
mod provider;

pub use api::LlmApiClient;
pub use message::{ChatMessage, ContentBlock, Role};
pub use provider::{LlmBackend, LlmProvider, VisionModel};
