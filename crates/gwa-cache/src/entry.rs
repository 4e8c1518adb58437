use gwa_codec::{CommandVerb, join_tokens, split_tokens, strip_sid};
use serde::Serialize;

/// A stored record plus its per-pass bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntry {
    pub keyword: String,
    pub index: u32,
    pub application_id: Option<String>,
    pub stream_id: Option<String>,
    pub verb: CommandVerb,
    pub version: Option<u32>,
    /// `None` while the index is only reserved.
    pub gwa: Option<String>,
    /// Present when the last snapshot was taken.
    pub previously_existed: bool,
    /// Upserted since the last snapshot.
    pub touched: bool,
}

impl CacheEntry {
    pub(crate) fn reserved(keyword: &str, index: u32, application_id: Option<&str>) -> Self {
        Self {
            keyword: keyword.to_string(),
            index,
            application_id: application_id.map(str::to_string),
            stream_id: None,
            verb: CommandVerb::Set,
            version: None,
            gwa: None,
            previously_existed: false,
            touched: true,
        }
    }

    pub fn is_reserved(&self) -> bool {
        self.gwa.is_none()
    }

    /// The identifier used in outgoing objects: the stored application id,
    /// or `gsa/<KEYWORD>_<index>` when there is none.
    pub fn application_id_or_default(&self) -> String {
        self.application_id
            .clone()
            .unwrap_or_else(|| default_application_id(&self.keyword, self.index))
    }

    pub(crate) fn same_payload(&self, gwa: &str) -> bool {
        self.gwa
            .as_deref()
            .is_some_and(|existing| comparable(existing) == comparable(gwa))
    }
}

pub fn default_application_id(keyword: &str, index: u32) -> String {
    format!("gsa/{keyword}_{index}")
}

// Payloads are equal when their tokens match with verb and identifier tag
// removed. Quoting is normalised on both sides.
fn comparable(gwa: &str) -> String {
    let tokens = split_tokens(&strip_sid(gwa));
    let body = match tokens.first() {
        Some(first) if CommandVerb::from_token(first).is_some() => &tokens[1..],
        _ => &tokens[..],
    };
    join_tokens(body)
}
