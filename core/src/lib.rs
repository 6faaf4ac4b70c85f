//! Root of the `modelcall-core` library.
//!
//! Parses `Provider.Model.Method("query")` commands and computes
//! cursor-sensitive completions for partially typed ones.

// Prevent accidental direct writes to stdout/stderr in library code. All
// user-visible output goes through the binary or the tracing stack.
#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod catalog;
pub mod completion;
pub mod config_loader;
pub mod execute;
pub mod grammar;
pub mod parser;
pub mod session;
pub mod truncate;

pub use catalog::Catalog;
pub use catalog::CatalogError;
pub use catalog::CatalogHandle;
pub use catalog::CatalogSource;
pub use catalog::ModelEntry;
pub use completion::Candidate;
pub use completion::Completer;
pub use completion::Completion;
pub use completion::CompletionContext;
pub use completion::ReplaceRange;
pub use completion::Stage;
pub use completion::apply_candidate;
pub use execute::ExecutionError;
pub use execute::Executor;
pub use execute::HandlerRegistry;
pub use execute::MethodHandler;
pub use parser::Command;
pub use parser::ParseError;
pub use parser::parse_command;
pub use session::RunOutcome;
pub use session::Session;

/// Provider served by the bundled backend; also the seed text of a new session.
pub const DEFAULT_PROVIDER: &str = "Gemini";
