pub mod gemini;
pub mod model;

pub use gemini::{Assistant, AssistantReply, GeminiClient};
pub use model::GeminiModel;

#[cfg(test)]
pub use gemini::MockAssistant;
