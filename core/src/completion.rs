//! Cursor-sensitive completion for partially typed commands.
//!
//! [`Completer::resolve`] looks at the text before the cursor and decides
//! which segment of `Provider.Model.Method("query")` is being edited;
//! [`Completer::candidates`] then proposes values for that segment from the
//! known providers and the current [`Catalog`] snapshot.
//!
//! Offsets are character offsets, the unit an editor cursor moves in.
//! Resolution never fails: anything it cannot complete yields no candidates.

use serde::Serialize;

use crate::catalog::Catalog;
use crate::grammar::DotPositions;

/// Which part of the command the cursor is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Provider,
    Model,
    Method,
    Arguments,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Provider => "provider",
            Stage::Model => "model",
            Stage::Method => "method",
            Stage::Arguments => "arguments",
        }
    }

    /// The stage reached after accepting a candidate in this one.
    pub fn next(self) -> Stage {
        match self {
            Stage::Provider => Stage::Model,
            Stage::Model => Stage::Method,
            Stage::Method | Stage::Arguments => Stage::Arguments,
        }
    }
}

/// Half-open `[start, end)` span of characters to overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReplaceRange {
    pub start: usize,
    pub end: usize,
}

impl ReplaceRange {
    fn at(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionContext {
    pub stage: Stage,
    /// Partial segment already typed.
    pub prefix: String,
    pub replace_range: ReplaceRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub label: String,
    /// Text to write over `replace_range`; ends in the next trigger
    /// character (`.` or `(`) so completion continues.
    pub insert_text: String,
    pub replace_range: ReplaceRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A resolved context together with its candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub context: CompletionContext,
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default)]
pub struct Completer {
    providers: Vec<String>,
}

impl Completer {
    /// `providers` is the ordered list of recognised provider identifiers.
    pub fn new<I, S>(providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            providers: providers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn providers(&self) -> &[String] {
        &self.providers
    }

    fn knows_provider(&self, provider: &str) -> bool {
        self.providers.iter().any(|known| known == provider)
    }

    /// Work out which segment is being typed at `cursor`.
    ///
    /// A cursor past the end of `text` is treated as being at the end.
    pub fn resolve(&self, text: &str, cursor: usize) -> CompletionContext {
        let cursor = cursor.min(text.chars().count());
        let before = &text[..byte_offset(text, cursor)];
        let current = before.trim_start();
        let lead = char_len(before) - char_len(current);
        let current = current.trim_end();

        let dots = DotPositions::scan(current);
        if dots.open_paren.is_some() {
            return CompletionContext {
                stage: Stage::Arguments,
                prefix: String::new(),
                replace_range: ReplaceRange::at(cursor),
                provider: None,
                model: None,
            };
        }

        let range_from = |byte: usize| ReplaceRange {
            start: lead + char_len(&current[..byte]),
            end: cursor,
        };

        match (dots.first_dot, dots.last_dot) {
            (Some(first), Some(last)) if first == last => CompletionContext {
                stage: Stage::Model,
                prefix: current[first + 1..].to_string(),
                replace_range: range_from(first + 1),
                provider: Some(current[..first].to_string()),
                model: None,
            },
            (Some(first), Some(last)) => CompletionContext {
                stage: Stage::Method,
                prefix: current[last + 1..].to_string(),
                replace_range: range_from(last + 1),
                provider: Some(current[..first].to_string()),
                model: Some(current[first + 1..last].to_string()),
            },
            _ => CompletionContext {
                stage: Stage::Provider,
                prefix: current.to_string(),
                replace_range: range_from(0),
                provider: None,
                model: None,
            },
        }
    }

    /// Candidates for `context`, filtered by case-insensitive prefix and kept
    /// in source order.
    pub fn candidates(&self, context: &CompletionContext, catalog: &Catalog) -> Vec<Candidate> {
        let range = context.replace_range;
        let prefix = context.prefix.to_lowercase();
        let matches = |value: &str| value.to_lowercase().starts_with(&prefix);

        match context.stage {
            Stage::Provider => self
                .providers
                .iter()
                .filter(|provider| matches(provider))
                .map(|provider| Candidate {
                    label: provider.clone(),
                    insert_text: format!("{provider}."),
                    replace_range: range,
                    detail: None,
                })
                .collect(),
            Stage::Model => {
                if !self.catalog_serves(context.provider.as_deref(), catalog) {
                    return Vec::new();
                }
                catalog
                    .entries()
                    .iter()
                    .filter(|entry| matches(&entry.name))
                    .map(|entry| Candidate {
                        label: entry.name.clone(),
                        insert_text: format!("{}.", entry.name),
                        replace_range: range,
                        detail: entry.display_name.clone(),
                    })
                    .collect()
            }
            Stage::Method => {
                if !self.catalog_serves(context.provider.as_deref(), catalog) {
                    return Vec::new();
                }
                let Some(entry) = context.model.as_deref().and_then(|model| catalog.get(model))
                else {
                    tracing::debug!(model = ?context.model, "no catalog entry for model");
                    return Vec::new();
                };
                entry
                    .supported_actions
                    .iter()
                    .filter(|action| matches(action))
                    .map(|action| Candidate {
                        label: action.clone(),
                        insert_text: format!("{action}("),
                        replace_range: range,
                        detail: None,
                    })
                    .collect()
            }
            Stage::Arguments => Vec::new(),
        }
    }

    /// Resolve and generate candidates in one step.
    pub fn complete(&self, text: &str, cursor: usize, catalog: &Catalog) -> Completion {
        let context = self.resolve(text, cursor);
        let candidates = self.candidates(&context, catalog);
        tracing::debug!(
            stage = ?context.stage,
            prefix = %context.prefix,
            candidates = candidates.len(),
            "resolved completion"
        );
        Completion {
            context,
            candidates,
        }
    }

    fn catalog_serves(&self, provider: Option<&str>, catalog: &Catalog) -> bool {
        match provider {
            Some(provider) => self.knows_provider(provider) && catalog.provider() == provider,
            None => false,
        }
    }
}

/// Write `candidate` into `text`, returning the new text and the cursor
/// placed just after the inserted text.
pub fn apply_candidate(text: &str, candidate: &Candidate) -> (String, usize) {
    let len = char_len(text);
    let start = candidate.replace_range.start.min(len);
    let end = candidate.replace_range.end.min(len).max(start);

    let mut out = String::with_capacity(text.len() + candidate.insert_text.len());
    out.push_str(&text[..byte_offset(text, start)]);
    out.push_str(&candidate.insert_text);
    out.push_str(&text[byte_offset(text, end)..]);

    (out, start + char_len(&candidate.insert_text))
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte index of the `chars`-th character, or `s.len()` past the end.
fn byte_offset(s: &str, chars: usize) -> usize {
    s.char_indices()
        .nth(chars)
        .map_or(s.len(), |(index, _)| index)
}
