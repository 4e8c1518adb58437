//! Deletion propagation between passes.

use std::collections::HashSet;

use gwa_model::DecodedObject;
use serde::Serialize;

use crate::proxy::DeletedRecord;

/// The objects of a previous pass split by whether they survive the
/// current deletion feed.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub kept: Vec<DecodedObject>,
    pub excluded: Vec<Exclusion>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exclusion {
    pub keyword: String,
    pub index: u32,
    /// The deleted (or itself excluded) record this one depended on; the
    /// record's own key when it was deleted directly.
    pub cause: DeletedRecord,
}

impl Reconciliation {
    pub fn is_excluded(&self, keyword: &str, index: u32) -> bool {
        self.excluded
            .iter()
            .any(|e| e.keyword == keyword && e.index == index)
    }
}

/// Drops every object that was deleted or references a dropped record,
/// directly or through other dropped objects. Kept objects stay in input
/// order.
pub fn reconcile(previous: &[DecodedObject], deleted: &[DeletedRecord]) -> Reconciliation {
    let mut gone: HashSet<(String, u32)> = deleted
        .iter()
        .map(|d| (d.keyword.clone(), d.index))
        .collect();
    let mut causes: Vec<Option<DeletedRecord>> = vec![None; previous.len()];

    loop {
        let mut changed = false;
        for (object, cause) in previous.iter().zip(causes.iter_mut()) {
            if cause.is_some() {
                continue;
            }
            let key = (object.keyword.clone(), object.index);
            let found = if gone.contains(&key) {
                Some(DeletedRecord::new(key.0.clone(), key.1))
            } else {
                object
                    .object
                    .references()
                    .into_iter()
                    .find(|r| gone.contains(&(r.keyword.to_string(), r.index)))
                    .map(|r| DeletedRecord::new(r.keyword, r.index))
            };
            if let Some(found) = found {
                *cause = Some(found);
                gone.insert(key);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let mut out = Reconciliation::default();
    for (object, cause) in previous.iter().zip(causes) {
        match cause {
            Some(cause) => out.excluded.push(Exclusion {
                keyword: object.keyword.clone(),
                index: object.index,
                cause,
            }),
            None => out.kept.push(object.clone()),
        }
    }
    out
}
