//! Core types for tdcompare.

mod message;
mod upload;

pub use message::*;
pub use upload::*;
