pub mod gemini;
pub mod prompt;

pub use gemini::GeminiClient;
