// Error intervals reported by synthetic monitors, and their merged/grouped forms

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use wincode::{SchemaRead, SchemaWrite};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SchemaRead, SchemaWrite)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInterval {
    pub from: i64,
    pub to: i64,
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub do_not_merge_to_the_left: bool,
    #[serde(default)]
    pub do_not_merge_to_the_right: bool,
}

impl ErrorInterval {
    pub fn new(from: i64, to: i64, count: i64, message: impl Into<String>) -> Self {
        Self {
            from,
            to,
            count,
            message: message.into(),
            do_not_merge_to_the_left: false,
            do_not_merge_to_the_right: false,
        }
    }

    pub fn no_merge_left(mut self) -> Self {
        self.do_not_merge_to_the_left = true;
        self
    }

    pub fn no_merge_right(mut self) -> Self {
        self.do_not_merge_to_the_right = true;
        self
    }
}

/// Coalesced run of error intervals from a single source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiErrorInterval {
    pub from: i64,
    pub to: i64,
    pub error_intervals: Vec<ErrorInterval>,
}

/// Overlapping multi-error intervals from several sources, keyed by source id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedMultiErrorInterval {
    pub from: i64,
    pub to: i64,
    pub error_intervals_by_source: BTreeMap<String, Vec<ErrorInterval>>,
}

impl GroupedMultiErrorInterval {
    pub fn overlaps(&self, from: i64, to: i64) -> bool {
        from <= self.to && self.from <= to
    }
}

/// One synthetic monitor execution window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyntheticResult {
    pub capture_time: i64,
    pub total_duration_nanos: f64,
    pub execution_count: i64,
    #[serde(default)]
    pub error_intervals: Vec<ErrorInterval>,
}
