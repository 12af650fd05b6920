pub mod gemini;
pub mod media;
pub mod prompts;

pub use gemini::{analyze_face, generate_style, StyleGenerationOutput};
pub use media::ImagePayload;
