//! Core traits for tdcompare collaborators.

mod llm;
mod messenger;
mod tokenizer;

pub use llm::*;
pub use messenger::*;
pub use tokenizer::*;
