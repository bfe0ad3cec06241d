// Error interval coalescing: per source (collector) and across sources (merger).
// Both are single-owner builders: one instance per request, fed then consumed.

use std::collections::BTreeMap;

use crate::models::{ErrorInterval, GroupedMultiErrorInterval, MultiErrorInterval};

/// Coalesces one source's error intervals, fed in non-decreasing `from` order.
#[derive(Debug, Default)]
pub struct MultiErrorIntervalCollector {
    current: Option<MultiErrorInterval>,
    merged: Vec<MultiErrorInterval>,
    #[cfg(debug_assertions)]
    last_from: Option<i64>,
}

impl MultiErrorIntervalCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error_intervals<I>(&mut self, error_intervals: I)
    where
        I: IntoIterator<Item = ErrorInterval>,
    {
        for error_interval in error_intervals {
            self.add_error_interval(error_interval);
        }
    }

    pub fn add_error_interval(&mut self, error_interval: ErrorInterval) {
        #[cfg(debug_assertions)]
        {
            debug_assert!(
                self.last_from.is_none_or(|last| last <= error_interval.from),
                "error intervals must be added in from-time order"
            );
            self.last_from = Some(error_interval.from);
        }

        let close_after = error_interval.do_not_merge_to_the_right;
        let merge_left = !error_interval.do_not_merge_to_the_left;
        if let Some(current) = self.current.as_mut().filter(|_| merge_left) {
            current.to = error_interval.to;
            current.error_intervals.push(error_interval);
        } else {
            self.close_current();
            self.current = Some(MultiErrorInterval {
                from: error_interval.from,
                to: error_interval.to,
                error_intervals: vec![error_interval],
            });
        }
        if close_after {
            self.close_current();
        }
    }

    /// Closes any open interval and returns all merged intervals in emission order.
    pub fn merged_error_intervals(mut self) -> Vec<MultiErrorInterval> {
        self.close_current();
        self.merged
    }

    fn close_current(&mut self) {
        if let Some(current) = self.current.take() {
            self.merged.push(current);
        }
    }
}

/// Groups multi-error intervals from several sources wherever their ranges overlap.
#[derive(Debug, Default)]
pub struct MultiErrorIntervalMerger {
    groups: Vec<GroupedMultiErrorInterval>,
}

impl MultiErrorIntervalMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_multi_error_intervals<I>(&mut self, source_id: &str, multi_error_intervals: I)
    where
        I: IntoIterator<Item = MultiErrorInterval>,
    {
        for multi_error_interval in multi_error_intervals {
            self.add_multi_error_interval(source_id, multi_error_interval);
        }
    }

    /// Removes every held group overlapping the new interval and inserts their union.
    /// Within one source, the new entries come first, then those of the removed groups
    /// in the order the groups were held.
    pub fn add_multi_error_interval(
        &mut self,
        source_id: &str,
        multi_error_interval: MultiErrorInterval,
    ) {
        let MultiErrorInterval {
            from,
            to,
            error_intervals,
        } = multi_error_interval;
        let (overlapping, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.groups)
            .into_iter()
            .partition(|group| group.overlaps(from, to));
        self.groups = rest;

        let mut merged_from = from;
        let mut merged_to = to;
        let mut by_source: BTreeMap<String, Vec<ErrorInterval>> = BTreeMap::new();
        by_source.insert(source_id.to_string(), error_intervals);
        for group in overlapping {
            merged_from = merged_from.min(group.from);
            merged_to = merged_to.max(group.to);
            for (source, intervals) in group.error_intervals_by_source {
                by_source.entry(source).or_default().extend(intervals);
            }
        }
        self.groups.push(GroupedMultiErrorInterval {
            from: merged_from,
            to: merged_to,
            error_intervals_by_source: by_source,
        });
    }

    /// All groups, ascending by `from`.
    pub fn grouped_multi_error_intervals(mut self) -> Vec<GroupedMultiErrorInterval> {
        self.groups.sort_by_key(|group| group.from);
        self.groups
    }
}
