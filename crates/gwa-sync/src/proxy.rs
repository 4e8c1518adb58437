//! The host side of a pass.
//!
//! [`NativeProxy`] is the only way a session talks to the host application.
//! [`MemoryProxy`] keeps host state in memory and backs the tests and the
//! command-line tools, which load it from a `.gwa` file.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use gwa_codec::{
    CommandVerb, FormatError, GwaDocument, RawRecord, RecordCodec, RecordHeader, SidTag,
    bare_keyword, join_tokens, split_tokens,
};
use gwa_model::records::Node;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;

/// One record as the host reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProxyRecord {
    pub keyword: String,
    pub index: u32,
    pub application_id: Option<String>,
    pub stream_id: Option<String>,
    pub verb: CommandVerb,
    pub gwa: String,
}

impl ProxyRecord {
    pub fn from_line(gwa: &str) -> std::result::Result<Self, FormatError> {
        let (header, _) = RecordHeader::parse_line(gwa)?;
        Ok(Self::from_header(header, gwa.to_string()))
    }

    fn from_header(header: RecordHeader, gwa: String) -> Self {
        Self {
            keyword: header.keyword,
            index: header.index,
            application_id: header.sid.application_id,
            stream_id: header.sid.stream_id,
            verb: header.verb,
            gwa,
        }
    }
}

impl From<RawRecord> for ProxyRecord {
    fn from(raw: RawRecord) -> Self {
        Self::from_header(raw.header, raw.gwa)
    }
}

/// A host record removed since its keyword was last queried.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DeletedRecord {
    pub keyword: String,
    pub index: u32,
}

impl DeletedRecord {
    pub fn new(keyword: impl Into<String>, index: u32) -> Self {
        Self {
            keyword: keyword.into(),
            index,
        }
    }
}

/// Bulk access to the host application.
///
/// Calls are synchronous and made only by the session, never from inside
/// the cache or while decoding.
pub trait NativeProxy {
    /// Current records of the given keywords.
    fn get_gwa_data(&mut self, keywords: &[String]) -> Result<Vec<ProxyRecord>>;

    /// Records of the given keywords removed since they were last queried.
    fn get_deleted_gwa_data(&mut self, keywords: &[String]) -> Result<Vec<DeletedRecord>>;

    /// Applies one encoded record. Returns the index the host chose when it
    /// allocates indices itself.
    fn run_command(&mut self, gwa: &str) -> Result<Option<u32>>;

    /// Index of the node at `(x, y, z)`, creating one unless an existing
    /// node lies within `tolerance`.
    fn node_at(&mut self, x: f64, y: f64, z: f64, tolerance: f64) -> Result<u32>;
}

/// Host state held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryProxy {
    records: BTreeMap<String, BTreeMap<u32, ProxyRecord>>,
    pending_deletions: BTreeMap<String, BTreeSet<u32>>,
    host_allocation: bool,
    commands: Vec<String>,
}

impl MemoryProxy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_document(document: GwaDocument) -> Self {
        let mut proxy = Self::new();
        for raw in document.records {
            proxy.store(raw.into());
        }
        proxy
    }

    pub fn from_gwa_str(raw: &str) -> Result<Self> {
        Ok(Self::from_document(GwaDocument::parse_str(raw)?))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_document(GwaDocument::parse_file(path)?))
    }

    /// Makes the host pick indices for `SET` commands: the index already
    /// holding the same application id, otherwise the smallest free one.
    pub fn with_host_allocation(mut self) -> Self {
        self.host_allocation = true;
        self
    }

    /// Stores a line at the index in its header.
    pub fn insert(&mut self, gwa: &str) -> std::result::Result<u32, FormatError> {
        let record = ProxyRecord::from_line(gwa)?;
        let index = record.index;
        self.store(record);
        Ok(index)
    }

    /// Removes a record the way a user deleting it in the host would.
    pub fn delete(&mut self, keyword: &str, index: u32) -> bool {
        let keyword = bare_keyword(keyword);
        let removed = self
            .records
            .get_mut(&keyword)
            .and_then(|records| records.remove(&index))
            .is_some();
        if removed {
            self.pending_deletions.entry(keyword).or_default().insert(index);
        }
        removed
    }

    pub fn gwa(&self, keyword: &str, index: u32) -> Option<&str> {
        self.records
            .get(&bare_keyword(keyword))
            .and_then(|records| records.get(&index))
            .map(|r| r.gwa.as_str())
    }

    pub fn records(&self, keyword: &str) -> Vec<&ProxyRecord> {
        self.records
            .get(&bare_keyword(keyword))
            .map(|records| records.values().collect())
            .unwrap_or_default()
    }

    pub fn keywords(&self) -> Vec<String> {
        self.records.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every line submitted through [`NativeProxy::run_command`], in order.
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    fn store(&mut self, record: ProxyRecord) {
        if let Some(pending) = self.pending_deletions.get_mut(&record.keyword) {
            pending.remove(&record.index);
        }
        self.records
            .entry(record.keyword.clone())
            .or_default()
            .insert(record.index, record);
    }

    fn next_free(&self, keyword: &str) -> u32 {
        let taken = self.records.get(keyword);
        let mut candidate = 1;
        while taken.is_some_and(|records| records.contains_key(&candidate)) {
            candidate += 1;
        }
        candidate
    }

    fn host_index(&self, record: &ProxyRecord) -> u32 {
        record
            .application_id
            .as_deref()
            .and_then(|app_id| {
                self.records.get(&record.keyword).and_then(|records| {
                    records
                        .values()
                        .find(|r| r.application_id.as_deref() == Some(app_id))
                        .map(|r| r.index)
                })
            })
            .unwrap_or_else(|| self.next_free(&record.keyword))
    }
}

impl NativeProxy for MemoryProxy {
    fn get_gwa_data(&mut self, keywords: &[String]) -> Result<Vec<ProxyRecord>> {
        let mut out = Vec::new();
        for keyword in keywords {
            if let Some(records) = self.records.get(&bare_keyword(keyword)) {
                out.extend(records.values().cloned());
            }
        }
        debug!(keywords = keywords.len(), records = out.len(), "host read");
        Ok(out)
    }

    fn get_deleted_gwa_data(&mut self, keywords: &[String]) -> Result<Vec<DeletedRecord>> {
        let mut out = Vec::new();
        for keyword in keywords {
            let keyword = bare_keyword(keyword);
            if let Some(indices) = self.pending_deletions.remove(&keyword) {
                out.extend(indices.into_iter().map(|i| DeletedRecord::new(keyword.clone(), i)));
            }
        }
        Ok(out)
    }

    fn run_command(&mut self, gwa: &str) -> Result<Option<u32>> {
        let mut record = ProxyRecord::from_line(gwa)?;
        self.commands.push(gwa.to_string());

        if !(self.host_allocation && record.verb == CommandVerb::Set) {
            self.store(record);
            return Ok(None);
        }

        let index = self.host_index(&record);
        if index != record.index {
            let mut tokens = split_tokens(gwa);
            let (_, body_start) = RecordHeader::parse(&tokens)?;
            tokens[body_start - 1] = index.to_string();
            record.gwa = join_tokens(&tokens);
            record.index = index;
        }
        debug!(keyword = %record.keyword, index, "host allocated index");
        self.store(record);
        Ok(Some(index))
    }

    fn node_at(&mut self, x: f64, y: f64, z: f64, tolerance: f64) -> Result<u32> {
        let existing = self.records.get("NODE").and_then(|records| {
            records.values().find_map(|r| {
                let node = Node::decode(&r.gwa).ok()?.record;
                let distance =
                    ((node.x - x).powi(2) + (node.y - y).powi(2) + (node.z - z).powi(2)).sqrt();
                (distance <= tolerance).then_some(r.index)
            })
        });
        if let Some(index) = existing {
            return Ok(index);
        }

        let index = self.next_free("NODE");
        let gwa = Node::at(x, y, z).encode(CommandVerb::Set, index, &SidTag::default());
        self.store(ProxyRecord::from_line(&gwa)?);
        debug!(index, "host created node");
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = "\
SET\tNODE.3:{speckle_app_id:n1}\t1\tn1\tNO_RGB\t0\t0\t0
SET\tNODE.3\t2\tn2\tNO_RGB\t1\t0\t0
SET\tEL.4\t1\tbeam\tNO_RGB\tBEAM\t1\t1\t2\t1\t2
";

    #[test]
    fn reads_requested_keywords_only() {
        let mut proxy = MemoryProxy::from_gwa_str(MODEL).expect("valid model");
        let nodes = proxy.get_gwa_data(&["NODE".to_string()]).expect("read");
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].application_id.as_deref(), Some("n1"));
        let all = proxy
            .get_gwa_data(&["node.3".to_string(), "EL".to_string()])
            .expect("read");
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn deletion_feed_is_drained_per_keyword() {
        let mut proxy = MemoryProxy::from_gwa_str(MODEL).expect("valid model");
        assert!(proxy.delete("NODE", 2));
        assert!(!proxy.delete("NODE", 2));
        let keywords = ["NODE".to_string()];
        assert_eq!(
            proxy.get_deleted_gwa_data(&keywords).expect("feed"),
            vec![DeletedRecord::new("NODE", 2)]
        );
        assert!(proxy.get_deleted_gwa_data(&keywords).expect("feed").is_empty());
    }

    #[test]
    fn commands_store_at_header_index() {
        let mut proxy = MemoryProxy::new();
        let line = "SET\tNODE.3\t4\tn\tNO_RGB\t0\t0\t0";
        assert_eq!(proxy.run_command(line).expect("accepted"), None);
        assert_eq!(proxy.gwa("NODE", 4), Some(line));
        assert_eq!(proxy.commands(), [line.to_string()]);
    }

    #[test]
    fn host_allocation_reuses_application_id_slot() {
        let mut proxy = MemoryProxy::from_gwa_str(MODEL)
            .expect("valid model")
            .with_host_allocation();
        let fresh = "SET\tNODE.3:{speckle_app_id:x}\t9\tn\tNO_RGB\t5\t5\t5";
        assert_eq!(proxy.run_command(fresh).expect("accepted"), Some(3));
        assert!(proxy.gwa("NODE", 3).is_some_and(|g| g.contains("\t3\t")));
        let replace = "SET\tNODE.3:{speckle_app_id:n1}\t7\tn1\tNO_RGB\t0\t0\t1";
        assert_eq!(proxy.run_command(replace).expect("accepted"), Some(1));
        assert_eq!(proxy.len(), 4);
    }

    #[test]
    fn node_at_is_idempotent_within_tolerance() {
        let mut proxy = MemoryProxy::from_gwa_str(MODEL).expect("valid model");
        assert_eq!(proxy.node_at(1.0, 0.0005, 0.0, 0.001).expect("lookup"), 2);
        let created = proxy.node_at(3.0, 0.0, 0.0, 0.001).expect("create");
        assert_eq!(created, 3);
        assert_eq!(proxy.node_at(3.0, 0.0, 0.0, 0.001).expect("lookup"), 3);
        assert_eq!(proxy.records("NODE").len(), 3);
    }

    #[test]
    fn malformed_command_is_rejected() {
        let mut proxy = MemoryProxy::new();
        assert!(proxy.run_command("SET\tNODE.3\tzero").is_err());
        assert!(proxy.is_empty());
        assert!(proxy.commands().is_empty());
    }
}
