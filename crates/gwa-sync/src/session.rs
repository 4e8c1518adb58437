//! One synchronization pass.

use std::collections::BTreeMap;

use gwa_cache::{Cache, ReferenceError, Upsert};
use gwa_codec::{CommandVerb, FormatError, RecordCodec, SidTag, bare_keyword};
use gwa_model::records::Node;
use gwa_model::{DecodedObject, GwaObject, Registry};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::SyncSettings;
use crate::error::Result;
use crate::order::processing_order;
use crate::proxy::{DeletedRecord, NativeProxy, ProxyRecord};
use crate::reconcile::{Reconciliation, reconcile};
use crate::report::{Advisory, PassReport};

/// Everything decoded for one keyword.
struct KeywordBatch {
    keyword: String,
    objects: Vec<DecodedObject>,
    failures: Vec<(u32, FormatError)>,
}

/// Owns the cache, settings and host handle for the duration of a pass.
pub struct SyncSession<P> {
    settings: SyncSettings,
    proxy: P,
    cache: Cache,
    registry: &'static Registry,
    pool: Option<rayon::ThreadPool>,
    decoded: BTreeMap<String, Vec<DecodedObject>>,
    report: PassReport,
}

impl<P: NativeProxy> SyncSession<P> {
    /// Starts a pass over the standard record types.
    pub fn new(settings: SyncSettings, proxy: P) -> Result<Self> {
        let pool = if settings.parallel && settings.worker_threads > 0 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(settings.worker_threads)
                    .build()?,
            )
        } else {
            None
        };

        Ok(Self {
            settings,
            proxy,
            cache: Cache::new(),
            registry: Registry::standard(),
            pool,
            decoded: BTreeMap::new(),
            report: PassReport::new(),
        })
    }

    /// Replaces the record type table, e.g. with one carrying extra types.
    pub fn with_registry(mut self, registry: &'static Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn proxy(&self) -> &P {
        &self.proxy
    }

    pub fn proxy_mut(&mut self) -> &mut P {
        &mut self.proxy
    }

    /// The report so far; [`SyncSession::finish`] completes it.
    pub fn report(&self) -> &PassReport {
        &self.report
    }

    /// Objects decoded for one keyword, in index order.
    pub fn objects(&self, keyword: &str) -> &[DecodedObject] {
        self.decoded
            .get(&bare_keyword(keyword))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// All decoded objects, keyword by keyword.
    pub fn decoded(&self) -> impl Iterator<Item = &DecodedObject> {
        self.decoded.values().flatten()
    }

    /// Bulk-reads the keywords (plus their sub-keywords) from the host into
    /// the cache and snapshots it. An empty list means the configured
    /// keywords, or every registered type when none are configured.
    pub fn load<S: AsRef<str>>(&mut self, keywords: &[S]) -> Result<usize> {
        let fetch = self.fetch_keywords(keywords);
        let records = self.proxy.get_gwa_data(&fetch)?;

        let mut loaded = 0;
        for record in &records {
            match self.cache.upsert(proxy_upsert(record)) {
                Ok(_) => loaded += 1,
                Err(conflict) => self.report.record(Advisory::Conflict(conflict)),
            }
        }
        self.cache.snapshot();
        self.report.loaded += loaded;
        info!(keywords = fetch.len(), records = loaded, "loaded host records");
        Ok(loaded)
    }

    /// Moves records the host reports as deleted into the cache's deleted
    /// set. Returns the feed as received.
    pub fn apply_deletions<S: AsRef<str>>(&mut self, keywords: &[S]) -> Result<Vec<DeletedRecord>> {
        let fetch = self.fetch_keywords(keywords);
        let feed = self.proxy.get_deleted_gwa_data(&fetch)?;

        let mut by_keyword: BTreeMap<&str, Vec<u32>> = BTreeMap::new();
        for deleted in &feed {
            by_keyword
                .entry(deleted.keyword.as_str())
                .or_default()
                .push(deleted.index);
        }
        for (keyword, indices) in by_keyword {
            let moved = self.cache.mark_deleted(keyword, &indices);
            debug!(keyword, reported = indices.len(), active = moved.len(), "applied deletions");
        }
        self.report.deleted += feed.len();
        Ok(feed)
    }

    /// Decodes every cached record, one prerequisite level at a time. The
    /// keywords of a level are decoded on the worker pool when
    /// `settings.parallel` is set. Records that fail to decode are reported
    /// and skipped.
    pub fn decode_pass(&mut self) -> Result<usize> {
        let keywords = self.cache.keywords();
        let levels = processing_order(self.registry, &keywords)?;

        let mut total = 0;
        for level in &levels {
            let batches = self.decode_level(level);
            for batch in batches {
                total += batch.objects.len();
                self.absorb(batch);
            }
            self.check_references(level);
        }

        self.report.decoded += total;
        self.report.order = levels;
        info!(records = total, levels = self.report.order.len(), "decoded cached records");
        Ok(total)
    }

    /// Reports index references from the level's objects to registered
    /// record types that the cache does not hold, reserving each missing
    /// index as a placeholder. Deleted targets are left to reconciliation.
    fn check_references(&mut self, level: &[String]) {
        let mut missing = Vec::new();
        for keyword in level {
            for object in self.objects(keyword) {
                for target in object.object.references() {
                    if !self.registry.contains(target.keyword)
                        || self.cache.entry(target.keyword, target.index).is_some()
                        || self.cache.is_deleted(target.keyword, target.index)
                    {
                        continue;
                    }
                    let referrer = self
                        .cache
                        .application_id_or_default(&object.keyword, object.index);
                    missing.push((target, referrer));
                }
            }
        }

        for (target, referrer) in missing {
            // Only the first referrer to a missing record reports it.
            if !self.cache.reserve_index(target.keyword, target.index) {
                continue;
            }
            self.report.record(Advisory::Reference(ReferenceError {
                keyword: target.keyword.to_string(),
                application_id: None,
                index: Some(target.index),
                placeholder: target.index,
                referrer: Some(referrer),
            }));
        }
    }

    /// Writes one object to the host: allocates (or reuses) the index for
    /// its application id, encodes, submits, and stores the result. When the
    /// host picks its own index that index wins.
    ///
    /// An object that conflicts with what the cache already holds is
    /// reported and not submitted; its index is still returned.
    pub fn emit(&mut self, object: &GwaObject, application_id: Option<&str>) -> Result<u32> {
        let keyword = bare_keyword(object.keyword());
        let stream_id = self.settings.stream_id.clone();
        let sid = SidTag::new(application_id, stream_id.as_deref());

        let reserved = self.cache.resolve_index(&keyword, application_id);
        let gwa = object.encode(CommandVerb::Set, reserved, &sid);
        let upsert = Upsert::new(&keyword, &gwa)
            .index(reserved)
            .application_id(application_id)
            .stream_id(stream_id.as_deref());
        if let Err(conflict) = self.cache.check_upsert(upsert) {
            self.report.record(Advisory::Conflict(conflict));
            return Ok(reserved);
        }

        let (index, gwa) = match self.proxy.run_command(&gwa)? {
            Some(host) if host != reserved => {
                self.cache.release_reservation(&keyword, reserved);
                (host, object.encode(CommandVerb::Set, host, &sid))
            }
            _ => (reserved, gwa),
        };

        let upsert = Upsert::new(&keyword, &gwa)
            .index(index)
            .application_id(application_id)
            .stream_id(stream_id.as_deref());
        if let Err(conflict) = self.cache.upsert(upsert) {
            self.report.record(Advisory::Conflict(conflict));
        }
        self.report.emitted += 1;
        debug!(keyword = %keyword, index, application_id, "emitted record");
        Ok(index)
    }

    /// Index of the record with `application_id`. An unknown id gets a
    /// placeholder index, reported once as an unresolved reference; a later
    /// emit of the same id fills the placeholder.
    pub fn resolve_reference(
        &mut self,
        keyword: &str,
        application_id: &str,
        referrer: Option<&str>,
    ) -> u32 {
        if let Some(index) = self.cache.lookup_index(keyword, application_id) {
            return index;
        }
        let placeholder = self.cache.resolve_index(keyword, Some(application_id));
        self.report.record(Advisory::Reference(ReferenceError {
            keyword: bare_keyword(keyword),
            application_id: Some(application_id.to_string()),
            index: None,
            placeholder,
            referrer: referrer.map(str::to_string),
        }));
        placeholder
    }

    /// Index of the node at a point, created by the host when none lies
    /// within `settings.coincident_node_allowance`. With an application id
    /// the node is also cached under it.
    pub fn node_at(&mut self, x: f64, y: f64, z: f64, application_id: Option<&str>) -> Result<u32> {
        let index = self
            .proxy
            .node_at(x, y, z, self.settings.coincident_node_allowance)?;

        if let Some(app_id) = application_id {
            let sid = SidTag::new(Some(app_id), self.settings.stream_id.as_deref());
            let gwa = Node::at(x, y, z).encode(CommandVerb::Set, index, &sid);
            let upsert = Upsert::new("NODE", &gwa)
                .index(index)
                .application_id(Some(app_id))
                .stream_id(self.settings.stream_id.as_deref());
            if let Err(conflict) = self.cache.upsert(upsert) {
                self.report.record(Advisory::Conflict(conflict));
            }
        }
        Ok(index)
    }

    /// Splits `previous` into objects that survive this pass's deletions and
    /// those that were deleted or depend on something deleted.
    pub fn reconcile(&self, previous: &[DecodedObject]) -> Reconciliation {
        let deleted: Vec<DeletedRecord> = self
            .cache
            .keywords()
            .into_iter()
            .flat_map(|keyword| {
                self.cache
                    .deleted(&keyword)
                    .into_iter()
                    .map(|entry| DeletedRecord::new(entry.keyword, entry.index))
            })
            .collect();
        reconcile(previous, &deleted)
    }

    /// Ends the pass.
    pub fn finish(mut self) -> PassReport {
        self.report.stale = self
            .cache
            .stale_entries()
            .iter()
            .map(|entry| entry.application_id_or_default())
            .collect();
        info!(
            loaded = self.report.loaded,
            decoded = self.report.decoded,
            emitted = self.report.emitted,
            deleted = self.report.deleted,
            conflicts = self.report.conflicts.len(),
            reference_errors = self.report.reference_errors.len(),
            format_errors = self.report.format_errors.len(),
            unsupported = self.report.unsupported_count(),
            "pass finished"
        );
        self.report
    }

    /// Hands the host back, e.g. to start the next pass with it.
    pub fn into_proxy(self) -> P {
        self.proxy
    }

    fn fetch_keywords<S: AsRef<str>>(&self, keywords: &[S]) -> Vec<String> {
        if !keywords.is_empty() {
            return self.registry.fetch_keywords(keywords);
        }
        if !self.settings.keywords.is_empty() {
            return self.registry.fetch_keywords(&self.settings.keywords);
        }
        self.registry.keywords().map(str::to_string).collect()
    }

    fn decode_level(&self, level: &[String]) -> Vec<KeywordBatch> {
        let cache = &self.cache;
        let registry = self.registry;
        if !self.settings.parallel {
            return level
                .iter()
                .map(|keyword| decode_keyword(cache, registry, keyword))
                .collect();
        }

        let run = || -> Vec<KeywordBatch> {
            level
                .par_iter()
                .map(|keyword| decode_keyword(cache, registry, keyword))
                .collect()
        };
        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }

    fn absorb(&mut self, batch: KeywordBatch) {
        for (index, error) in batch.failures {
            self.report.record(Advisory::Format {
                index: Some(index),
                error,
            });
        }
        for object in batch.objects.iter().filter(|o| !o.object.is_supported()) {
            self.report.record(Advisory::Unsupported {
                keyword: object.keyword.clone(),
                index: object.index,
            });
        }
        self.decoded.insert(batch.keyword, batch.objects);
    }
}

fn proxy_upsert(record: &ProxyRecord) -> Upsert<'_> {
    Upsert {
        keyword: &record.keyword,
        index: Some(record.index),
        gwa: &record.gwa,
        application_id: record.application_id.as_deref(),
        verb: record.verb,
        stream_id: record.stream_id.as_deref(),
    }
}

fn decode_keyword(cache: &Cache, registry: &Registry, keyword: &str) -> KeywordBatch {
    let mut objects = Vec::new();
    let mut failures = Vec::new();

    for entry in cache.records(keyword) {
        let Some(gwa) = entry.gwa.as_deref() else {
            continue;
        };
        match registry.decode(gwa) {
            Ok(object) => objects.push(object),
            Err(error) => failures.push((entry.index, error)),
        }
    }
    debug!(keyword, decoded = objects.len(), failed = failures.len(), "decoded keyword");

    KeywordBatch {
        keyword: keyword.to_string(),
        objects,
        failures,
    }
}
