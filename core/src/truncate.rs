//! Output shaping for large backend responses.

/// Longest prefix of `s` within `max_bytes` that ends on a char boundary.
#[inline]
pub fn take_bytes_at_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Cap `output` at `max_bytes`, appending a note with the number of bytes
/// dropped. Output within the budget is returned unchanged.
pub fn truncate_output(output: String, max_bytes: usize) -> String {
    if output.len() <= max_bytes {
        return output;
    }
    let kept = take_bytes_at_char_boundary(&output, max_bytes);
    let omitted = output.len() - kept.len();
    tracing::debug!(kept = kept.len(), omitted, "truncating backend output");
    format!("{kept}\n[... output truncated, {omitted} bytes omitted]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn never_splits_a_character() {
        assert_eq!(take_bytes_at_char_boundary("hello world", 5), "hello");
        assert_eq!(take_bytes_at_char_boundary("héllo", 2), "h");
        assert_eq!(take_bytes_at_char_boundary("héllo", 3), "hé");
        assert_eq!(take_bytes_at_char_boundary("😀abc", 3), "");
        assert_eq!(take_bytes_at_char_boundary("😀abc", 4), "😀");
        assert_eq!(take_bytes_at_char_boundary("", 4), "");
    }

    #[test]
    fn short_output_is_untouched() {
        assert_eq!(truncate_output("abc".to_string(), 3), "abc");
    }

    #[test]
    fn long_output_reports_omitted_bytes() {
        let shaped = truncate_output("abcdef".to_string(), 4);
        assert_eq!(shaped, "abcd\n[... output truncated, 2 bytes omitted]");
    }
}
