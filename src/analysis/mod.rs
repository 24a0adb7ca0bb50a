pub mod intake;
pub mod prompt;

pub use intake::{image_parts, UploadedImage};
pub use prompt::{meal_suggestion_prompt, AnalysisKind, DEFAULT_CUSTOM_PROMPT};
