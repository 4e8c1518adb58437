//! The identity/index cache.
//!
//! Entries are grouped per keyword. Each keyword has its own lock, so
//! allocation within a keyword is serialised while different keywords never
//! contend; the outer map lock is only taken for writing when a keyword is
//! seen for the first time.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use gwa_codec::{
    CaseExprError, CaseFactor, CommandVerb, RecordHeader, bare_keyword, expand_case_expression,
    parse_keyword_token, split_tokens,
};
use tracing::debug;

use crate::entry::{CacheEntry, default_application_id};
use crate::error::{ConflictError, LineError, Result};

#[derive(Debug, Default)]
struct KeywordState {
    entries: BTreeMap<u32, CacheEntry>,
    by_application_id: HashMap<String, u32>,
    deleted: BTreeMap<u32, CacheEntry>,
}

impl KeywordState {
    fn is_taken(&self, index: u32) -> bool {
        self.entries.contains_key(&index) || self.deleted.contains_key(&index)
    }

    /// Smallest positive index not active, reserved or deleted.
    fn next_free(&self) -> u32 {
        let mut candidate = 1;
        while self.is_taken(candidate) {
            candidate += 1;
        }
        candidate
    }

    /// Checks an upsert at `index` against the stored state. `Ok(true)`
    /// means the payload is written, `Ok(false)` that an identical one is
    /// already there.
    fn admit(&self, keyword: &str, index: u32, record: &Upsert<'_>) -> Result<bool> {
        if self.deleted.contains_key(&index) {
            return Err(ConflictError::DeletedIndex {
                keyword: keyword.to_string(),
                index,
            });
        }
        if let Some(app_id) = record.application_id
            && let Some(&bound) = self.by_application_id.get(app_id)
            && bound != index
        {
            return Err(ConflictError::ApplicationIdRebound {
                keyword: keyword.to_string(),
                application_id: app_id.to_string(),
                bound,
                index,
            });
        }

        let Some(existing) = self.entries.get(&index) else {
            return Ok(true);
        };
        if let (Some(bound), Some(app_id)) =
            (existing.application_id.as_deref(), record.application_id)
            && bound != app_id
        {
            return Err(ConflictError::IndexRebound {
                keyword: keyword.to_string(),
                index,
                bound: bound.to_string(),
                application_id: app_id.to_string(),
            });
        }
        // The first write of a pass may replace what the last snapshot
        // recorded; after that the payload is fixed.
        let supersedes = existing.previously_existed && !existing.touched;
        if existing.is_reserved() || supersedes {
            return Ok(true);
        }
        if !existing.same_payload(record.gwa) {
            return Err(ConflictError::DivergentPayload {
                keyword: keyword.to_string(),
                index,
                existing: existing.gwa.clone().unwrap_or_default(),
                incoming: record.gwa.to_string(),
            });
        }
        Ok(false)
    }

    fn record_count(&self) -> usize {
        self.entries.values().filter(|e| !e.is_reserved()).count()
    }

    /// Index an upsert lands on: the one it names, else the one its
    /// application id is bound to, else the implicit index.
    fn target_index(&self, record: &Upsert<'_>) -> u32 {
        record
            .index
            .or_else(|| {
                record
                    .application_id
                    .and_then(|id| self.by_application_id.get(id).copied())
            })
            .unwrap_or_else(|| self.implicit_index())
    }

    /// Index used by an upsert that names none: record count plus one, or
    /// the next free index when that one is taken.
    fn implicit_index(&self) -> u32 {
        let candidate = u32::try_from(self.record_count() + 1).unwrap_or(u32::MAX);
        if self.is_taken(candidate) {
            self.next_free()
        } else {
            candidate
        }
    }
}

/// A record as handed to [`Cache::upsert`].
#[derive(Debug, Clone, Copy)]
pub struct Upsert<'a> {
    pub keyword: &'a str,
    pub index: Option<u32>,
    pub gwa: &'a str,
    pub application_id: Option<&'a str>,
    pub verb: CommandVerb,
    pub stream_id: Option<&'a str>,
}

impl<'a> Upsert<'a> {
    pub fn new(keyword: &'a str, gwa: &'a str) -> Self {
        Self {
            keyword,
            index: None,
            gwa,
            application_id: None,
            verb: CommandVerb::Set,
            stream_id: None,
        }
    }

    pub fn index(mut self, index: u32) -> Self {
        self.index = Some(index);
        self
    }

    pub fn application_id(mut self, application_id: Option<&'a str>) -> Self {
        self.application_id = application_id;
        self
    }

    pub fn verb(mut self, verb: CommandVerb) -> Self {
        self.verb = verb;
        self
    }

    pub fn stream_id(mut self, stream_id: Option<&'a str>) -> Self {
        self.stream_id = stream_id;
        self
    }
}

#[derive(Debug, Default)]
pub struct Cache {
    keywords: RwLock<BTreeMap<String, Arc<Mutex<KeywordState>>>>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record, or confirms an identical one already stored at the
    /// same index. Returns the index used.
    pub fn upsert(&self, record: Upsert<'_>) -> Result<u32> {
        let keyword = bare_keyword(record.keyword);
        let state = self.state(&keyword);
        let mut state = lock(&state);

        let index = state.target_index(&record);
        let replace = state.admit(&keyword, index, &record)?;

        let version = split_tokens(record.gwa)
            .iter()
            .take(2)
            .find_map(|t| parse_keyword_token(t).ok().and_then(|k| k.version));

        match state.entries.get_mut(&index) {
            Some(existing) => {
                if replace {
                    existing.gwa = Some(record.gwa.to_string());
                    existing.verb = record.verb;
                    existing.version = version;
                    existing.stream_id = record.stream_id.map(str::to_string);
                }
                if existing.application_id.is_none() {
                    existing.application_id = record.application_id.map(str::to_string);
                }
                existing.touched = true;
            }
            None => {
                let entry = CacheEntry {
                    keyword: keyword.clone(),
                    index,
                    application_id: record.application_id.map(str::to_string),
                    stream_id: record.stream_id.map(str::to_string),
                    verb: record.verb,
                    version,
                    gwa: Some(record.gwa.to_string()),
                    previously_existed: false,
                    touched: true,
                };
                state.entries.insert(index, entry);
            }
        }

        if let Some(app_id) = record.application_id {
            state.by_application_id.insert(app_id.to_string(), index);
        }
        debug!(keyword = %keyword, index, application_id = ?record.application_id, "upsert");
        Ok(index)
    }

    /// Runs the checks of [`Cache::upsert`] without storing anything.
    pub fn check_upsert(&self, record: Upsert<'_>) -> Result<u32> {
        let keyword = bare_keyword(record.keyword);
        self.with_state(&keyword, |state| {
            let index = state.target_index(&record);
            state.admit(&keyword, index, &record).map(|_| index)
        })
        .unwrap_or(Ok(record.index.unwrap_or(1)))
    }

    /// Upserts a full `SET`/`SET_AT` line, taking keyword, index, verb and
    /// identifier tag from its header.
    pub fn upsert_line(&self, gwa: &str) -> std::result::Result<u32, LineError> {
        let (header, _) = RecordHeader::parse_line(gwa)?;
        let index = self.upsert(Upsert {
            keyword: &header.keyword,
            index: Some(header.index),
            gwa,
            application_id: header.sid.application_id.as_deref(),
            verb: header.verb,
            stream_id: header.sid.stream_id.as_deref(),
        })?;
        Ok(index)
    }

    /// Returns the index bound to `application_id`, or reserves the next
    /// free one. Without an id a fresh anonymous index is always reserved.
    pub fn resolve_index(&self, keyword: &str, application_id: Option<&str>) -> u32 {
        let keyword = bare_keyword(keyword);
        let state = self.state(&keyword);
        let mut state = lock(&state);

        if let Some(app_id) = application_id
            && let Some(&index) = state.by_application_id.get(app_id)
        {
            return index;
        }

        let index = state.next_free();
        state
            .entries
            .insert(index, CacheEntry::reserved(&keyword, index, application_id));
        if let Some(app_id) = application_id {
            state.by_application_id.insert(app_id.to_string(), index);
        }
        debug!(keyword = %keyword, index, application_id, "allocated index");
        index
    }

    /// Reserves `index` as a placeholder for a record referred to but not
    /// held. Returns `false` when the index is already taken.
    pub fn reserve_index(&self, keyword: &str, index: u32) -> bool {
        let keyword = bare_keyword(keyword);
        let state = self.state(&keyword);
        let mut state = lock(&state);
        if index == 0 || state.is_taken(index) {
            return false;
        }
        state
            .entries
            .insert(index, CacheEntry::reserved(&keyword, index, None));
        debug!(keyword = %keyword, index, "reserved placeholder");
        true
    }

    /// Drops a reservation made by [`Cache::resolve_index`], unbinding its
    /// application id. Stored records are left alone.
    pub fn release_reservation(&self, keyword: &str, index: u32) -> bool {
        let keyword = bare_keyword(keyword);
        let state = self.state(&keyword);
        let mut state = lock(&state);
        let Some(entry) = state.entries.get(&index).filter(|e| e.is_reserved()) else {
            return false;
        };
        if let Some(app_id) = entry.application_id.clone() {
            state.by_application_id.remove(&app_id);
        }
        state.entries.remove(&index);
        true
    }

    pub fn lookup_index(&self, keyword: &str, application_id: &str) -> Option<u32> {
        self.with_state(keyword, |state| {
            state.by_application_id.get(application_id).copied()
        })
        .flatten()
    }

    pub fn lookup_indices<S: AsRef<str>>(
        &self,
        keyword: &str,
        application_ids: &[S],
    ) -> Vec<Option<u32>> {
        self.with_state(keyword, |state| {
            application_ids
                .iter()
                .map(|id| state.by_application_id.get(id.as_ref()).copied())
                .collect()
        })
        .unwrap_or_else(|| vec![None; application_ids.len()])
    }

    pub fn get_gwa(&self, keyword: &str, index: u32) -> Option<String> {
        self.with_state(keyword, |state| {
            state.entries.get(&index).and_then(|e| e.gwa.clone())
        })
        .flatten()
    }

    pub fn get_application_id(&self, keyword: &str, index: u32) -> Option<String> {
        self.with_state(keyword, |state| {
            state
                .entries
                .get(&index)
                .or_else(|| state.deleted.get(&index))
                .and_then(|e| e.application_id.clone())
        })
        .flatten()
    }

    pub fn application_id_or_default(&self, keyword: &str, index: u32) -> String {
        self.get_application_id(keyword, index)
            .unwrap_or_else(|| default_application_id(&bare_keyword(keyword), index))
    }

    pub fn entry(&self, keyword: &str, index: u32) -> Option<CacheEntry> {
        self.with_state(keyword, |state| state.entries.get(&index).cloned())
            .flatten()
    }

    pub fn expand_load_cases_and_combinations(
        &self,
        expression: &str,
    ) -> std::result::Result<Vec<CaseFactor>, CaseExprError> {
        expand_case_expression(expression)
    }

    /// Moves the given entries to the deleted set. Their indices stay taken
    /// until [`Cache::clear`]. Returns the indices that were active.
    pub fn mark_deleted(&self, keyword: &str, indices: &[u32]) -> Vec<u32> {
        let keyword = bare_keyword(keyword);
        let state = self.state(&keyword);
        let mut state = lock(&state);
        let mut moved = Vec::new();

        for &index in indices {
            let entry = state
                .entries
                .remove(&index)
                .unwrap_or_else(|| CacheEntry::reserved(&keyword, index, None));
            let was_active = !entry.is_reserved();
            if let Some(app_id) = &entry.application_id {
                state.by_application_id.remove(app_id);
            }
            state.deleted.insert(index, entry);
            if was_active {
                moved.push(index);
            }
        }
        debug!(keyword = %keyword, deleted = moved.len(), "marked deleted");
        moved
    }

    pub fn is_deleted(&self, keyword: &str, index: u32) -> bool {
        self.with_state(keyword, |state| state.deleted.contains_key(&index))
            .unwrap_or(false)
    }

    pub fn deleted(&self, keyword: &str) -> Vec<CacheEntry> {
        self.with_state(keyword, |state| state.deleted.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Marks every stored record as previously existing and untouched.
    pub fn snapshot(&self) {
        for state in self.states() {
            let mut state = lock(&state);
            for entry in state.entries.values_mut() {
                entry.previously_existed = !entry.is_reserved();
                entry.touched = false;
            }
        }
    }

    /// Records present at the last snapshot that were not upserted since.
    pub fn stale_entries(&self) -> Vec<CacheEntry> {
        self.states()
            .into_iter()
            .flat_map(|state| {
                lock(&state)
                    .entries
                    .values()
                    .filter(|e| e.previously_existed && !e.touched)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Stored records of one keyword in index order; reservations excluded.
    pub fn records(&self, keyword: &str) -> Vec<CacheEntry> {
        self.with_state(keyword, |state| {
            state
                .entries
                .values()
                .filter(|e| !e.is_reserved())
                .cloned()
                .collect()
        })
        .unwrap_or_default()
    }

    pub fn keywords(&self) -> Vec<String> {
        read(&self.keywords).keys().cloned().collect()
    }

    /// Number of stored records across all keywords.
    pub fn len(&self) -> usize {
        self.states().iter().map(|s| lock(s).record_count()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.keywords
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        debug!("cache cleared");
    }

    fn state(&self, keyword: &str) -> Arc<Mutex<KeywordState>> {
        if let Some(state) = read(&self.keywords).get(keyword) {
            return Arc::clone(state);
        }
        let mut map = self
            .keywords
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(map.entry(keyword.to_string()).or_default())
    }

    fn with_state<T>(&self, keyword: &str, f: impl FnOnce(&KeywordState) -> T) -> Option<T> {
        let state = read(&self.keywords).get(&bare_keyword(keyword)).cloned()?;
        let guard = lock(&state);
        Some(f(&guard))
    }

    fn states(&self) -> Vec<Arc<Mutex<KeywordState>>> {
        read(&self.keywords).values().cloned().collect()
    }
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn lock(state: &Mutex<KeywordState>) -> MutexGuard<'_, KeywordState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NODE_1: &str = "SET\tNODE.3\t1\tn1\tNO_RGB\t0\t0\t0";

    #[test]
    fn upsert_line_reads_the_header() {
        let cache = Cache::new();
        let index = cache
            .upsert_line("SET_AT\tNODE.3:{speckle_app_id:a}{speckle_stream_id:s}\t7\tn\tNO_RGB\t0\t0\t0")
            .expect("valid header, no conflict");
        assert_eq!(index, 7);
        let entry = cache.entry("NODE", 7).expect("stored");
        assert_eq!(entry.verb, CommandVerb::SetAt);
        assert_eq!(entry.version, Some(3));
        assert_eq!(entry.application_id.as_deref(), Some("a"));
        assert_eq!(entry.stream_id.as_deref(), Some("s"));
        assert_eq!(cache.lookup_index("NODE", "a"), Some(7));
    }

    #[test]
    fn implicit_index_is_count_plus_one() {
        let cache = Cache::new();
        cache.upsert(Upsert::new("NODE", NODE_1).index(1)).expect("first");
        let index = cache
            .upsert(Upsert::new("NODE", "SET\tNODE.3\t2\tn2\tNO_RGB\t1\t0\t0"))
            .expect("implicit");
        assert_eq!(index, 2);
    }

    #[test]
    fn implicit_index_skips_taken_slots() {
        let cache = Cache::new();
        cache.upsert(Upsert::new("NODE", NODE_1).index(2)).expect("at 2");
        let index = cache
            .upsert(Upsert::new("NODE", "SET\tNODE.3\t1\tn\tNO_RGB\t5\t0\t0"))
            .expect("implicit");
        assert_eq!(index, 1);
        let index = cache
            .upsert(Upsert::new("NODE", "SET\tNODE.3\t3\tn\tNO_RGB\t6\t0\t0"))
            .expect("implicit");
        assert_eq!(index, 3);
    }

    #[test]
    fn implicit_index_follows_a_bound_application_id() {
        let cache = Cache::new();
        cache.upsert(Upsert::new("NODE", NODE_1).index(1)).expect("1");
        cache
            .upsert(Upsert::new("NODE", NODE_1).index(3).application_id(Some("a")))
            .expect("3");
        let index = cache
            .upsert(Upsert::new("NODE", NODE_1).application_id(Some("a")))
            .expect("reuses bound index");
        assert_eq!(index, 3);
        assert_eq!(cache.check_upsert(Upsert::new("NODE", NODE_1).application_id(Some("a"))), Ok(3));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn placeholder_reservation_only_takes_free_indices() {
        let cache = Cache::new();
        cache.upsert(Upsert::new("NODE", NODE_1).index(1)).expect("stored");
        assert!(!cache.reserve_index("NODE", 1));
        assert!(!cache.reserve_index("NODE", 0));
        assert!(cache.reserve_index("NODE", 99));
        assert!(!cache.reserve_index("NODE", 99));
        assert!(cache.entry("NODE", 99).is_some_and(|e| e.is_reserved()));
        assert_eq!(cache.len(), 1);
        cache
            .upsert(Upsert::new("NODE", NODE_1).index(99))
            .expect("fills placeholder");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn reserved_index_is_filled_by_upsert() {
        let cache = Cache::new();
        let index = cache.resolve_index("NODE", Some("a"));
        assert_eq!(cache.get_gwa("NODE", index), None);
        assert!(cache.records("NODE").is_empty());
        cache
            .upsert(Upsert::new("NODE", NODE_1).index(index).application_id(Some("a")))
            .expect("fills reservation");
        assert_eq!(cache.get_gwa("NODE", index).as_deref(), Some(NODE_1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn rebinding_an_application_id_is_a_conflict() {
        let cache = Cache::new();
        cache
            .upsert(Upsert::new("NODE", NODE_1).index(1).application_id(Some("a")))
            .expect("first");
        let err = cache
            .upsert(Upsert::new("NODE", NODE_1).index(2).application_id(Some("a")))
            .expect_err("same id, other index");
        assert!(matches!(err, ConflictError::ApplicationIdRebound { bound: 1, index: 2, .. }));

        let err = cache
            .upsert(Upsert::new("NODE", NODE_1).index(1).application_id(Some("b")))
            .expect_err("same index, other id");
        assert!(matches!(err, ConflictError::IndexRebound { .. }));
        assert_eq!(cache.lookup_index("NODE", "b"), None);
    }

    #[test]
    fn versioned_keywords_share_state() {
        let cache = Cache::new();
        assert_eq!(cache.resolve_index("NODE.3", Some("a")), 1);
        assert_eq!(cache.lookup_index("node", "a"), Some(1));
        assert_eq!(cache.keywords(), vec!["NODE".to_string()]);
    }

    #[test]
    fn deleted_indices_stay_taken() {
        let cache = Cache::new();
        cache
            .upsert(Upsert::new("EL", NODE_1).index(1).application_id(Some("e1")))
            .expect("stored");
        assert_eq!(cache.mark_deleted("EL", &[1, 4]), vec![1]);
        assert!(cache.is_deleted("EL", 1));
        assert_eq!(cache.get_gwa("EL", 1), None);
        assert_eq!(cache.lookup_index("EL", "e1"), None);
        assert_eq!(cache.get_application_id("EL", 1).as_deref(), Some("e1"));
        assert_eq!(cache.resolve_index("EL", None), 2);
        assert!(matches!(
            cache.upsert(Upsert::new("EL", NODE_1).index(4)),
            Err(ConflictError::DeletedIndex { index: 4, .. })
        ));
        assert_eq!(cache.deleted("EL").len(), 2);
    }

    #[test]
    fn snapshot_tracks_untouched_records() {
        let cache = Cache::new();
        let node_2 = "SET\tNODE.3\t2\tn2\tNO_RGB\t1\t0\t0";
        cache.upsert(Upsert::new("NODE", NODE_1).index(1)).expect("1");
        cache.upsert(Upsert::new("NODE", node_2).index(2)).expect("2");
        cache.snapshot();
        cache.upsert(Upsert::new("NODE", node_2).index(2)).expect("same payload again");
        let stale: Vec<u32> = cache.stale_entries().iter().map(|e| e.index).collect();
        assert_eq!(stale, vec![1]);
    }

    #[test]
    fn first_write_after_snapshot_replaces() {
        let cache = Cache::new();
        let updated = "SET\tNODE.3\t1\tn1\tNO_RGB\t0\t0\t9";
        cache.upsert(Upsert::new("NODE", NODE_1).index(1)).expect("loaded");
        cache.snapshot();
        cache.upsert(Upsert::new("NODE", updated).index(1)).expect("replaces snapshot");
        assert_eq!(cache.get_gwa("NODE", 1).as_deref(), Some(updated));
        assert!(matches!(
            cache.upsert(Upsert::new("NODE", NODE_1).index(1)),
            Err(ConflictError::DivergentPayload { .. })
        ));
        assert!(cache.stale_entries().is_empty());
    }

    #[test]
    fn check_upsert_leaves_state_alone() {
        let cache = Cache::new();
        assert_eq!(cache.check_upsert(Upsert::new("NODE", NODE_1).index(4)), Ok(4));
        assert!(cache.keywords().is_empty());
        cache.upsert(Upsert::new("NODE", NODE_1).index(1)).expect("stored");
        assert!(matches!(
            cache.check_upsert(Upsert::new("NODE", "SET\tNODE.3\t1\tn\tNO_RGB\t2\t0\t0").index(1)),
            Err(ConflictError::DivergentPayload { .. })
        ));
        assert_eq!(cache.check_upsert(Upsert::new("NODE", NODE_1)), Ok(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn released_reservation_frees_id_and_index() {
        let cache = Cache::new();
        let index = cache.resolve_index("NODE", Some("a"));
        assert!(cache.release_reservation("NODE", index));
        assert_eq!(cache.lookup_index("NODE", "a"), None);
        assert_eq!(cache.upsert(Upsert::new("NODE", NODE_1).index(9).application_id(Some("a"))), Ok(9));
        assert!(!cache.release_reservation("NODE", 9));
    }

    #[test]
    fn default_application_id_for_anonymous_records() {
        let cache = Cache::new();
        let index = cache.resolve_index("AXIS", None);
        assert_eq!(cache.application_id_or_default("AXIS", index), "gsa/AXIS_1");
        assert_eq!(cache.application_id_or_default("axis.1", 9), "gsa/AXIS_9");
    }
}
