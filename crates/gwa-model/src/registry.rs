//! Static registration table of the supported record types.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use gwa_codec::{FormatError, RecordCodec, RecordHeader, SidTag, bare_keyword, split_tokens};

use crate::object::GwaObject;
use crate::records::{
    Axis, Combination, Element, GridPlane, GridSurface, LoadTitle, Member, Node, Section,
};

/// One decoded line, keyed the way the cache keys it.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedObject {
    pub keyword: String,
    pub index: u32,
    pub sid: SidTag,
    pub object: GwaObject,
    pub trailing: Vec<String>,
}

impl DecodedObject {
    pub fn application_id(&self) -> Option<&str> {
        self.sid.application_id.as_deref()
    }
}

pub type DecodeFn = fn(&str) -> Result<DecodedObject, FormatError>;

#[derive(Debug, Clone, Copy)]
pub struct RecordType {
    pub keyword: &'static str,
    pub version: u32,
    /// Keywords fetched from the host together with this one.
    pub sub_keywords: &'static [&'static str],
    /// Keywords that must be fully decoded before this one.
    pub prerequisites: &'static [&'static str],
    pub decode: DecodeFn,
}

impl RecordType {
    const fn of<T>(
        sub_keywords: &'static [&'static str],
        prerequisites: &'static [&'static str],
    ) -> Self
    where
        T: RecordCodec + Into<GwaObject>,
    {
        Self {
            keyword: T::SCHEMA.keyword,
            version: T::SCHEMA.version,
            sub_keywords,
            prerequisites,
            decode: decode_as::<T>,
        }
    }

    pub fn versioned_keyword(&self) -> String {
        format!("{}.{}", self.keyword, self.version)
    }
}

fn decode_as<T>(line: &str) -> Result<DecodedObject, FormatError>
where
    T: RecordCodec + Into<GwaObject>,
{
    let decoded = T::decode(line)?;
    Ok(DecodedObject {
        keyword: T::SCHEMA.keyword.to_string(),
        index: decoded.header.index,
        sid: decoded.header.sid,
        object: decoded.record.into(),
        trailing: decoded.trailing,
    })
}

pub static RECORD_TYPES: &[RecordType] = &[
    RecordType::of::<Axis>(&[], &[]),
    RecordType::of::<Node>(&["AXIS"], &["AXIS"]),
    RecordType::of::<Section>(&[], &[]),
    RecordType::of::<Element>(&["NODE"], &["NODE", "SECTION"]),
    RecordType::of::<Member>(&["NODE"], &["NODE", "SECTION"]),
    RecordType::of::<GridPlane>(&["AXIS"], &["AXIS"]),
    RecordType::of::<GridSurface>(&["GRID_PLANE", "AXIS"], &["GRID_PLANE"]),
    RecordType::of::<LoadTitle>(&[], &[]),
    RecordType::of::<Combination>(&["LOAD_TITLE"], &["LOAD_TITLE"]),
];

#[derive(Debug, Clone, Default)]
pub struct Registry {
    types: BTreeMap<&'static str, &'static RecordType>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The table of every supported type, built once.
    pub fn standard() -> &'static Registry {
        static STANDARD: OnceLock<Registry> = OnceLock::new();
        STANDARD.get_or_init(|| {
            let mut registry = Registry::new();
            for record_type in RECORD_TYPES {
                registry.register(record_type);
            }
            registry
        })
    }

    pub fn register(&mut self, record_type: &'static RecordType) {
        self.types.insert(record_type.keyword, record_type);
    }

    /// Accepts `NODE`, `node` or `NODE.3:{...}`.
    pub fn get(&self, keyword: &str) -> Option<&'static RecordType> {
        if let Some(found) = self.types.get(keyword) {
            return Some(*found);
        }
        self.types.get(bare_keyword(keyword).as_str()).copied()
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.get(keyword).is_some()
    }

    pub fn keywords(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.types.keys().copied()
    }

    pub fn types(&self) -> impl Iterator<Item = &'static RecordType> + '_ {
        self.types.values().copied()
    }

    pub fn prerequisites(&self, keyword: &str) -> &'static [&'static str] {
        self.get(keyword).map(|t| t.prerequisites).unwrap_or(&[])
    }

    /// `keywords` plus their declared sub-keywords, first occurrence order.
    pub fn fetch_keywords<S: AsRef<str>>(&self, keywords: &[S]) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut add = |kw: String| {
            if !out.contains(&kw) {
                out.push(kw);
            }
        };
        for keyword in keywords {
            let keyword = bare_keyword(keyword.as_ref());
            let subs = self.get(&keyword).map(|t| t.sub_keywords).unwrap_or(&[]);
            add(keyword);
            for sub in subs {
                add(sub.to_string());
            }
        }
        out
    }

    /// Decodes a line with the codec registered for its keyword. Lines with
    /// an unregistered keyword come back as [`GwaObject::Unsupported`].
    pub fn decode(&self, line: &str) -> Result<DecodedObject, FormatError> {
        let tokens = split_tokens(line);
        let (header, _) = RecordHeader::parse(&tokens)?;
        match self.get(&header.keyword) {
            Some(record_type) => (record_type.decode)(line),
            None => Ok(DecodedObject {
                keyword: header.keyword.clone(),
                index: header.index,
                sid: header.sid,
                object: GwaObject::Unsupported {
                    keyword: header.keyword,
                    gwa: line.to_string(),
                },
                trailing: Vec::new(),
            }),
        }
    }
}
