pub mod ai_service;
pub mod gemini_client;

pub use ai_service::{AiService, GenerationRequest};
pub use gemini_client::GeminiClient;
