//! Tab-delimited tokenizer with double-quote grouping.
//!
//! A GWA line is a sequence of tab-separated tokens. A token may be wrapped
//! in double quotes to carry literal tabs or padding; the quotes are removed
//! on decode and re-added on encode only when needed.

use std::ops::Range;

pub const DELIMITER: char = '\t';

/// Byte ranges of every token in `line`, quotes included.
///
/// An empty line yields a single empty span.
pub fn token_spans(line: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = 0usize;
    let mut in_quotes = false;

    for (pos, ch) in line.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            DELIMITER if !in_quotes => {
                spans.push(start..pos);
                start = pos + ch.len_utf8();
            }
            _ => {}
        }
    }
    spans.push(start..line.len());
    spans
}

pub fn split_tokens(line: &str) -> Vec<String> {
    token_spans(line)
        .into_iter()
        .map(|span| unquote(&line[span]).to_string())
        .collect()
}

pub fn unquote(token: &str) -> &str {
    if token.len() >= 2 && token.starts_with('"') && token.ends_with('"') {
        &token[1..token.len() - 1]
    } else {
        token
    }
}

pub fn join_tokens<S: AsRef<str>>(tokens: &[S]) -> String {
    let mut out = String::new();
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 {
            out.push(DELIMITER);
        }
        let token = token.as_ref();
        if needs_quotes(token) {
            out.push('"');
            out.push_str(token);
            out.push('"');
        } else {
            out.push_str(token);
        }
    }
    out
}

// Embedded double quotes cannot be carried by the wire format at all.
fn needs_quotes(token: &str) -> bool {
    token.contains(DELIMITER) || token.trim() != token
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_tabs() {
        assert_eq!(
            split_tokens("SET\tNODE.3\t1\tname"),
            vec!["SET", "NODE.3", "1", "name"]
        );
    }

    #[test]
    fn quoted_spans_are_atomic() {
        let tokens = split_tokens("SET\tNODE.3\t1\t\"left\tright\"\t0");
        assert_eq!(tokens, vec!["SET", "NODE.3", "1", "left\tright", "0"]);
    }

    #[test]
    fn keeps_empty_tokens() {
        assert_eq!(split_tokens("a\t\tb"), vec!["a", "", "b"]);
        assert_eq!(split_tokens(""), vec![""]);
    }

    #[test]
    fn spans_point_into_raw_line() {
        let line = "SET\t\"a\tb\"\tc";
        let spans = token_spans(line);
        assert_eq!(&line[spans[1].clone()], "\"a\tb\"");
        assert_eq!(&line[spans[2].clone()], "c");
    }

    #[test]
    fn join_quotes_only_when_required() {
        let joined = join_tokens(&["SET", "has\ttab", " padded", "plain name"]);
        assert_eq!(joined, "SET\t\"has\ttab\"\t\" padded\"\tplain name");
        assert_eq!(
            split_tokens(&joined),
            vec!["SET", "has\ttab", " padded", "plain name"]
        );
    }
}
