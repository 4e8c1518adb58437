//! Static record schemas: keyword, version and ordered field descriptors.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Exactly one token that must parse.
    Required,
    /// One token; an unset value is written as `default`.
    Optional { default: &'static str },
    /// `count` consecutive tokens.
    FixedList { count: usize },
    /// A count token followed by that many tokens.
    CountedList,
    /// One token holding a space-separated list followed by `TAG(...)`
    /// groups, e.g. `1 2 3 V(4 5) P(6)`.
    Tagged { tags: &'static [char] },
    /// Sibling sub-records sharing the line, located by keyword.
    Embedded { keywords: &'static [&'static str] },
    /// Wire slots the schema does not interpret. Kept verbatim on decode,
    /// `defaults` are written when nothing was read.
    Unmodelled { defaults: &'static [&'static str] },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Required,
        }
    }

    pub const fn optional(name: &'static str, default: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Optional { default },
        }
    }

    pub const fn fixed_list(name: &'static str, count: usize) -> Self {
        Self {
            name,
            kind: FieldKind::FixedList { count },
        }
    }

    pub const fn counted_list(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::CountedList,
        }
    }

    pub const fn tagged(name: &'static str, tags: &'static [char]) -> Self {
        Self {
            name,
            kind: FieldKind::Tagged { tags },
        }
    }

    pub const fn embedded(name: &'static str, keywords: &'static [&'static str]) -> Self {
        Self {
            name,
            kind: FieldKind::Embedded { keywords },
        }
    }

    pub const fn unmodelled(name: &'static str, defaults: &'static [&'static str]) -> Self {
        Self {
            name,
            kind: FieldKind::Unmodelled { defaults },
        }
    }

    /// Tokens this field occupies at minimum on a well-formed line.
    pub fn min_tokens(&self) -> usize {
        match self.kind {
            FieldKind::Required | FieldKind::CountedList | FieldKind::Tagged { .. } => 1,
            FieldKind::FixedList { count } => count,
            FieldKind::Optional { .. }
            | FieldKind::Embedded { .. }
            | FieldKind::Unmodelled { .. } => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSchema {
    pub keyword: &'static str,
    pub version: u32,
    pub fields: &'static [FieldSpec],
}

impl RecordSchema {
    /// `KEYWORD.version`, as written in the keyword token.
    pub fn versioned_keyword(&self) -> String {
        format!("{}.{}", self.keyword, self.version)
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn min_tokens(&self) -> usize {
        self.fields.iter().map(FieldSpec::min_tokens).sum()
    }

    pub fn embedded_keywords(&self) -> &'static [&'static str] {
        self.fields
            .iter()
            .find_map(|f| match f.kind {
                FieldKind::Embedded { keywords } => Some(keywords),
                _ => None,
            })
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: RecordSchema = RecordSchema {
        keyword: "SAMPLE",
        version: 2,
        fields: &[
            FieldSpec::required("name"),
            FieldSpec::optional("colour", "NO_RGB"),
            FieldSpec::fixed_list("origin", 3),
            FieldSpec::counted_list("nodes"),
            FieldSpec::embedded("parts", &["SAMPLE_PART"]),
        ],
    };

    #[test]
    fn counts_minimum_tokens() {
        assert_eq!(SAMPLE.min_tokens(), 1 + 3 + 1);
    }

    #[test]
    fn exposes_embedded_keywords_and_fields() {
        assert_eq!(SAMPLE.embedded_keywords(), &["SAMPLE_PART"]);
        assert_eq!(SAMPLE.versioned_keyword(), "SAMPLE.2");
        assert_eq!(
            SAMPLE.field("colour").map(|f| f.kind),
            Some(FieldKind::Optional { default: "NO_RGB" })
        );
        assert!(SAMPLE.field("missing").is_none());
    }
}
