//! Prerequisite ordering of record types.

use std::collections::{BTreeMap, BTreeSet};

use gwa_codec::bare_keyword;
use gwa_model::Registry;

use crate::error::{Result, SyncError};

/// Groups `keywords` into levels: every keyword's prerequisites sit in an
/// earlier level, so the keywords of one level can be decoded together.
///
/// Registered prerequisites are pulled in even when not asked for.
/// Keywords without a registered type have no prerequisites and land in
/// the first level. Within a level keywords are sorted.
pub fn processing_order<S: AsRef<str>>(
    registry: &Registry,
    keywords: &[S],
) -> Result<Vec<Vec<String>>> {
    let mut wanted: BTreeSet<String> = BTreeSet::new();
    let mut stack: Vec<String> = keywords.iter().map(|k| bare_keyword(k.as_ref())).collect();
    while let Some(keyword) = stack.pop() {
        if wanted.insert(keyword.clone()) {
            stack.extend(
                registry
                    .prerequisites(&keyword)
                    .iter()
                    .map(|p| p.to_string()),
            );
        }
    }

    let mut pending: BTreeMap<String, BTreeSet<String>> = wanted
        .iter()
        .map(|keyword| {
            let prerequisites = registry
                .prerequisites(keyword)
                .iter()
                .map(|p| p.to_string())
                .filter(|p| p != keyword)
                .collect();
            (keyword.clone(), prerequisites)
        })
        .collect();

    let mut levels = Vec::new();
    while !pending.is_empty() {
        let ready: Vec<String> = pending
            .iter()
            .filter(|(_, prerequisites)| prerequisites.is_empty())
            .map(|(keyword, _)| keyword.clone())
            .collect();

        if ready.is_empty() {
            let remaining: Vec<String> = pending.keys().cloned().collect();
            return Err(SyncError::PrerequisiteCycle {
                keyword: remaining[0].clone(),
                remaining,
            });
        }

        for keyword in &ready {
            pending.remove(keyword);
        }
        for prerequisites in pending.values_mut() {
            for keyword in &ready {
                prerequisites.remove(keyword);
            }
        }
        levels.push(ready);
    }
    Ok(levels)
}
