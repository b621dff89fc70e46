pub mod anthropic;
pub mod ollama;
pub mod openai;
