//! Splitting a parent line into its own prefix and embedded sub-records.

use crate::header::bare_keyword;
use crate::token::{DELIMITER, token_spans, unquote};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedPiece<'a> {
    pub keyword: &'static str,
    /// Byte offset of the piece inside the parent line.
    pub offset: usize,
    pub text: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition<'a> {
    pub prefix: &'a str,
    pub pieces: Vec<EmbeddedPiece<'a>>,
}

/// Cuts `line` at every token that starts a known embedded keyword
/// (optionally versioned, e.g. `SECTION_COMP.4`) at or after byte `after`.
///
/// Keywords are matched on whole tokens only, so `SECTION` never matches
/// inside `SECTION_COMP`. Sub-records whose keyword is not in `keywords`
/// remain part of the preceding piece.
pub fn partition_embedded<'a>(
    line: &'a str,
    after: usize,
    keywords: &[&'static str],
) -> Partition<'a> {
    let mut starts: Vec<(usize, &'static str)> = token_spans(line)
        .into_iter()
        .filter(|span| span.start >= after)
        .filter_map(|span| {
            let token = unquote(&line[span.clone()]);
            let bare = bare_keyword(token);
            keywords
                .iter()
                .find(|kw| kw.eq_ignore_ascii_case(&bare))
                .map(|kw| (span.start, *kw))
        })
        .collect();
    starts.sort_by_key(|(offset, _)| *offset);

    let Some(&(first, _)) = starts.first() else {
        return Partition {
            prefix: line,
            pieces: Vec::new(),
        };
    };

    // A piece ends just before the delimiter that opens the next one, so
    // empty tokens on either side of a cut are kept.
    let before = |start: usize| start.saturating_sub(DELIMITER.len_utf8());

    let mut pieces = Vec::with_capacity(starts.len());
    for (i, &(offset, keyword)) in starts.iter().enumerate() {
        let end = starts
            .get(i + 1)
            .map(|&(next, _)| before(next))
            .unwrap_or(line.len());
        pieces.push(EmbeddedPiece {
            keyword,
            offset,
            text: &line[offset..end],
        });
    }

    Partition {
        prefix: &line[..before(first)],
        pieces,
    }
}

/// Byte offset just past the first `count` tokens, used to skip a parent's
/// own header before searching for embedded keywords.
pub fn offset_after_tokens(line: &str, count: usize) -> usize {
    token_spans(line)
        .get(count)
        .map(|span| span.start)
        .unwrap_or(line.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPONENTS: &[&str] = &["SECTION_COMP", "SECTION_STEEL"];

    #[test]
    fn splits_parent_and_embedded_records() {
        let line = "SET\tSECTION.7\t1\tNO_RGB\tbox\tSECTION_COMP.4\t\t0\tSECTION_STEEL.2\t0\t1\tNO_ENVIRON";
        let after = offset_after_tokens(line, 3);
        let partition = partition_embedded(line, after, COMPONENTS);
        assert_eq!(partition.prefix, "SET\tSECTION.7\t1\tNO_RGB\tbox");
        assert_eq!(partition.pieces.len(), 2);
        assert_eq!(partition.pieces[0].keyword, "SECTION_COMP");
        assert_eq!(partition.pieces[0].text, "SECTION_COMP.4\t\t0");
        assert_eq!(partition.pieces[1].keyword, "SECTION_STEEL");
        assert_eq!(partition.pieces[1].text, "SECTION_STEEL.2\t0\t1\tNO_ENVIRON");
    }

    #[test]
    fn only_whole_tokens_match() {
        let line = "SET\tSECTION.7\t1\tSECTION_COMPOSITE_NAME\t2";
        let partition = partition_embedded(line, 0, COMPONENTS);
        assert!(partition.pieces.is_empty());
        assert_eq!(partition.prefix, line);
    }

    #[test]
    fn unknown_sub_records_stay_in_preceding_piece() {
        let line = "SET\tSECTION.7\t1\tSECTION_COMP.4\ta\tSECTION_COVER.3\tUNIFORM\t0.03";
        let partition = partition_embedded(line, offset_after_tokens(line, 3), COMPONENTS);
        assert_eq!(partition.pieces.len(), 1);
        assert_eq!(
            partition.pieces[0].text,
            "SECTION_COMP.4\ta\tSECTION_COVER.3\tUNIFORM\t0.03"
        );
    }

    #[test]
    fn trailing_empty_tokens_survive_the_cut() {
        let line = "SET\tSECTION.7\t1\tbox\t\tSECTION_COMP.4\ta\t\t\tSECTION_STEEL.2\t0\t\t";
        let partition = partition_embedded(line, offset_after_tokens(line, 3), COMPONENTS);
        assert_eq!(partition.prefix, "SET\tSECTION.7\t1\tbox\t");
        let texts: Vec<&str> = partition.pieces.iter().map(|p| p.text).collect();
        assert_eq!(texts, vec!["SECTION_COMP.4\ta\t\t", "SECTION_STEEL.2\t0\t\t"]);
    }

    #[test]
    fn piece_at_line_start_leaves_an_empty_prefix() {
        let line = "SECTION_COMP.4\ta";
        let partition = partition_embedded(line, 0, COMPONENTS);
        assert_eq!(partition.prefix, "");
        assert_eq!(partition.pieces[0].text, line);
    }

    #[test]
    fn repeated_components_each_get_a_piece() {
        let line = "SET\tSECTION.7\t1\tSECTION_COMP.4\ta\tSECTION_COMP.4\tb";
        let partition = partition_embedded(line, offset_after_tokens(line, 3), COMPONENTS);
        let texts: Vec<&str> = partition.pieces.iter().map(|p| p.text).collect();
        assert_eq!(texts, vec!["SECTION_COMP.4\ta", "SECTION_COMP.4\tb"]);
    }
}
