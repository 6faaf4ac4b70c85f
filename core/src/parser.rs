//! Command parsing.
//!
//! Turns a finished `Provider.Model.Method("query")` line into a [`Command`].
//! The parser is purely syntactic: whether the provider, model or method
//! actually exist is for the executing backend to decide.

use std::fmt;
use std::sync::OnceLock;

use regex_lite::Regex;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::grammar;

/// A fully parsed command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub provider: String,
    pub model: String,
    pub method: String,
    /// Text between the matching quote pair, quotes stripped. May be empty.
    pub query: String,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}(\"{}\")",
            self.provider, self.model, self.method, self.query
        )
    }
}

/// Parse error with context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed-syntax: expected Provider.Model.Method(\"query\")")]
    MalformedSyntax { raw: String },
}

impl ParseError {
    /// Stable machine-readable reason.
    pub fn reason(&self) -> &'static str {
        match self {
            ParseError::MalformedSyntax { .. } => "malformed-syntax",
        }
    }

    /// The text that failed to parse.
    pub fn raw(&self) -> &str {
        match self {
            ParseError::MalformedSyntax { raw } => raw,
        }
    }
}

/// `( ws* quote query quote ws* )` anchored at both ends. The query is
/// non-greedy; escaped quotes are not recognised.
fn argument_list_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?s)^\(\s*(?:"(.*?)"|'(.*?)')\s*\)$"#).ok())
        .as_ref()
}

fn quoted_argument(args: &str) -> Option<String> {
    let caps = argument_list_re()?.captures(args)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Parse a command string into its four parts.
///
/// Surrounding whitespace is ignored, as is whitespace between the method
/// name and the opening parenthesis and around the quoted argument.
pub fn parse_command(input: &str) -> Result<Command, ParseError> {
    let malformed = || ParseError::MalformedSyntax {
        raw: input.to_string(),
    };

    let trimmed = input.trim();
    let open = trimmed.find('(').ok_or_else(malformed)?;
    let (head, args) = trimmed.split_at(open);

    let path = grammar::split_path(head.trim_end()).ok_or_else(malformed)?;
    if !grammar::is_identifier(path.provider)
        || !grammar::is_model_identifier(path.model)
        || !grammar::is_identifier(path.method)
    {
        return Err(malformed());
    }

    let query = quoted_argument(args).ok_or_else(malformed)?;

    Ok(Command {
        provider: path.provider.to_string(),
        model: path.model.to_string(),
        method: path.method.to_string(),
        query,
    })
}
