//! The `Provider.Model.Method` head grammar shared by the parser and the
//! completion resolver.
//!
//! A command head is everything before the first `(`. Within a head the
//! first `.` separates provider from model and the last `.` separates model
//! from method; every dot in between belongs to the model name, so
//! `gemini-1.5-pro` survives intact. Both consumers go through
//! [`DotPositions::scan`] so they can never disagree about where a segment
//! starts.

/// Byte positions of the structural characters in a command fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DotPositions {
    /// First `.` of the head.
    pub first_dot: Option<usize>,
    /// Last `.` of the head.
    pub last_dot: Option<usize>,
    /// First `(`; everything from here on is the argument list.
    pub open_paren: Option<usize>,
}

impl DotPositions {
    /// Scan `text`, counting only dots that appear before the first `(`.
    pub fn scan(text: &str) -> Self {
        let open_paren = text.find('(');
        let head = &text[..open_paren.unwrap_or(text.len())];
        Self {
            first_dot: head.find('.'),
            last_dot: head.rfind('.'),
            open_paren,
        }
    }

    /// Number of distinct boundary dots seen (0, 1 or 2).
    pub fn boundaries(&self) -> usize {
        match (self.first_dot, self.last_dot) {
            (None, _) | (_, None) => 0,
            (Some(first), Some(last)) if first == last => 1,
            _ => 2,
        }
    }
}

/// A head split into its three segments. Segments may be empty; callers
/// validate them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathSplit<'a> {
    pub provider: &'a str,
    pub model: &'a str,
    pub method: &'a str,
}

/// Split a complete head at its first and last dot.
///
/// Returns `None` when the head has fewer than two dots or contains `(`.
pub fn split_path(head: &str) -> Option<PathSplit<'_>> {
    let dots = DotPositions::scan(head);
    if dots.open_paren.is_some() || dots.boundaries() < 2 {
        return None;
    }
    let (first, last) = (dots.first_dot?, dots.last_dot?);
    Some(PathSplit {
        provider: &head[..first],
        model: &head[first + 1..last],
        method: &head[last + 1..],
    })
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// `\w+` with ASCII semantics: provider and method names.
pub fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_word_char)
}

/// `[\w.-]+`: model names, which may carry version dots and hyphens.
pub fn is_model_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| is_word_char(c) || c == '.' || c == '-')
}
