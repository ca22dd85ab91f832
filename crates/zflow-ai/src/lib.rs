//! Language-model access for Z Flow: the `ChatModel` seam, the hosted Gemini
//! driver, prompt construction and post-processing of generated code.

pub mod error;
pub mod gemini;
pub mod model;
pub mod prompts;
pub mod sanitize;
pub mod scaffold;

pub use error::AiError;
pub use model::{ChatModel, Completion};
