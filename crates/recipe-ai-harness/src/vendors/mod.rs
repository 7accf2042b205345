/// OpenAI-compatible streaming chat completions.
pub mod openai_compat;
