//! Gemini backend for modelcall.
//!
//! Supplies the model catalog (`models.list`) and the execution handlers for
//! `Gemini.<model>.<method>(...)` commands over the Google Generative
//! Language REST API.

#![deny(clippy::print_stdout, clippy::print_stderr)]

mod client;
mod handlers;

pub use client::GeminiClient;
pub use client::GeminiConfig;
pub use client::GeminiError;
pub use client::GeminiResult;
pub use handlers::CountTokens;
pub use handlers::GenerateContent;
pub use handlers::register;

/// Provider identifier used in commands.
pub const PROVIDER: &str = "Gemini";
