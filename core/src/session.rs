//! One editing session: the command buffer, its cursor, the catalog it
//! completes against, and the run action.

use std::fmt;

use crate::catalog::CatalogHandle;
use crate::completion::Candidate;
use crate::completion::Completer;
use crate::completion::Completion;
use crate::completion::apply_candidate;
use crate::execute::ExecutionError;
use crate::execute::Executor;
use crate::parser::ParseError;
use crate::parser::parse_command;

/// Result of pressing "run".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing but whitespace in the buffer; no parse was attempted.
    Empty,
    /// The text is not a valid command.
    Rejected(ParseError),
    /// The command was valid but the backend refused or failed it.
    Failed(ExecutionError),
    Output(String),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Output(_))
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Empty => write!(f, "Editor is empty."),
            RunOutcome::Rejected(err) => write!(f, "Invalid command: {err}"),
            RunOutcome::Failed(err) => write!(f, "Error: {err}"),
            RunOutcome::Output(text) if text.is_empty() => write!(f, "No output received."),
            RunOutcome::Output(text) => write!(f, "{text}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    completer: Completer,
    catalog: CatalogHandle,
    text: String,
    /// Character offset into `text`.
    cursor: usize,
}

impl Session {
    /// Start a session whose buffer is seeded with the provider name.
    pub fn new(provider: &str, completer: Completer, catalog: CatalogHandle) -> Self {
        Self {
            completer,
            catalog,
            text: provider.to_string(),
            cursor: provider.chars().count(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Replace the buffer, clamping `cursor` to its length.
    pub fn set_text(&mut self, text: impl Into<String>, cursor: usize) {
        self.text = text.into();
        self.cursor = cursor.min(self.text.chars().count());
    }

    /// Completions at the cursor against the current catalog snapshot.
    pub fn completions(&self) -> Completion {
        let catalog = self.catalog.snapshot();
        self.completer.complete(&self.text, self.cursor, &catalog)
    }

    /// Insert `candidate` and immediately resolve again at the new cursor.
    pub fn accept(&mut self, candidate: &Candidate) -> Completion {
        let (text, cursor) = apply_candidate(&self.text, candidate);
        self.text = text;
        self.cursor = cursor;
        self.completions()
    }

    /// Parse the buffer and hand the command to `executor`.
    pub async fn run(&self, executor: &dyn Executor) -> RunOutcome {
        if self.text.trim().is_empty() {
            return RunOutcome::Empty;
        }
        let command = match parse_command(&self.text) {
            Ok(command) => command,
            Err(err) => {
                tracing::debug!("run rejected: {err}");
                return RunOutcome::Rejected(err);
            }
        };
        match executor.execute(&command).await {
            Ok(output) => RunOutcome::Output(output),
            Err(err) => RunOutcome::Failed(err),
        }
    }
}
