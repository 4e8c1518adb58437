//! Per-keyword summary of a decoded model.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::object::GwaObject;
use crate::registry::DecodedObject;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ModelSummary {
    pub total_records: usize,
    pub keyword_counts: BTreeMap<String, usize>,
    pub unsupported_keywords: Vec<String>,
    pub with_application_id: usize,
    pub node_rows: usize,
    pub element_rows: usize,
    pub member_rows: usize,
    pub section_components: usize,
    pub load_cases: usize,
    pub combinations: usize,
    pub failed_records: usize,
}

impl ModelSummary {
    pub fn from_objects<'a>(objects: impl IntoIterator<Item = &'a DecodedObject>) -> Self {
        let mut summary = Self::default();

        for decoded in objects {
            summary.total_records += 1;
            *summary
                .keyword_counts
                .entry(decoded.keyword.clone())
                .or_insert(0) += 1;
            if decoded.application_id().is_some() {
                summary.with_application_id += 1;
            }

            match &decoded.object {
                GwaObject::Node(_) => summary.node_rows += 1,
                GwaObject::Element(_) => summary.element_rows += 1,
                GwaObject::Member(_) => summary.member_rows += 1,
                GwaObject::Section(section) => {
                    summary.section_components += section.components.len()
                }
                GwaObject::LoadTitle(_) => summary.load_cases += 1,
                GwaObject::Combination(_) => summary.combinations += 1,
                GwaObject::Unsupported { keyword, .. } => {
                    if !summary.unsupported_keywords.contains(keyword) {
                        summary.unsupported_keywords.push(keyword.clone());
                    }
                }
                GwaObject::Axis(_) | GwaObject::GridPlane(_) | GwaObject::GridSurface(_) => {}
            }
        }

        summary.unsupported_keywords.sort();
        summary
    }

    /// Counts a record that could not be decoded.
    pub fn record_failure(&mut self, keyword: &str) {
        self.total_records += 1;
        self.failed_records += 1;
        *self.keyword_counts.entry(keyword.to_string()).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::ModelSummary;
    use crate::Registry;

    #[test]
    fn summarizes_decoded_records() {
        let src = [
            "SET\tNODE.3:{speckle_app_id:a}\t1\tn1\tNO_RGB\t0\t0\t0",
            "SET\tNODE.3\t2\tn2\tNO_RGB\t1\t0\t0",
            "SET\tEL.4\t1\t\tNO_RGB\tBEAM\t1\t0\t2\t1\t2",
            "SET\tLOAD_TITLE.2\t1\tDead\tDEAD",
            "SET\tCOMBINATION.1\t1\tULS\t1.35L1",
            "SET\tLOAD_NODE.2\t1\tload\t2\t1\tGLOBAL\tZ\t-10",
        ];
        let registry = Registry::standard();
        let objects: Vec<_> = src
            .iter()
            .map(|line| registry.decode(line).expect("decode should succeed"))
            .collect();

        let s = ModelSummary::from_objects(&objects);
        assert_eq!(s.total_records, 6);
        assert_eq!(s.node_rows, 2);
        assert_eq!(s.element_rows, 1);
        assert_eq!(s.load_cases, 1);
        assert_eq!(s.combinations, 1);
        assert_eq!(s.with_application_id, 1);
        assert_eq!(s.keyword_counts.get("NODE"), Some(&2));
        assert_eq!(s.unsupported_keywords, vec!["LOAD_NODE".to_string()]);
    }

    #[test]
    fn failures_are_counted_per_keyword() {
        let mut s = ModelSummary::default();
        s.record_failure("EL");
        assert_eq!(s.failed_records, 1);
        assert_eq!(s.keyword_counts.get("EL"), Some(&1));
    }

    #[test]
    fn serializes_as_json() {
        let mut s = ModelSummary::default();
        s.record_failure("EL");
        let json = serde_json::to_value(&s).expect("serialize summary");
        assert_eq!(json["failed_records"], 1);
        assert_eq!(json["keyword_counts"]["EL"], 1);
    }
}
