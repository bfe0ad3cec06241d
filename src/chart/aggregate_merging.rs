// Merges overview aggregates for a time window into one summary: counts and thread
// stats are summed, timer trees are merged by name at each depth.

use crate::models::{MergedAggregate, OverviewAggregate, ThreadStats, Timer};

/// Name of the synthetic root that aux thread timers are merged under.
pub const AUX_THREAD_ROOT_TIMER_NAME: &str = "auxiliary thread";

/// Merges `aggregates` in order.
///
/// Aux timer and aux stats appear in the result only when some input carried an aux
/// timer with a non-zero count.
///
/// # Panics
///
/// If an input has an aux thread root timer but no aux thread stats.
pub fn merge_aggregates(aggregates: &[OverviewAggregate]) -> MergedAggregate {
    let mut transaction_count = 0;
    let mut total_duration_nanos = 0.0;
    let mut main_thread_root_timers: Vec<Timer> = Vec::new();
    let mut main_thread_stats = ThreadStats::default();
    let mut aux_thread_root_timer = Timer::new(AUX_THREAD_ROOT_TIMER_NAME, false);
    let mut aux_thread_stats = ThreadStats::default();
    let mut async_timers: Vec<Timer> = Vec::new();

    for aggregate in aggregates {
        transaction_count += aggregate.transaction_count;
        total_duration_nanos += aggregate.total_duration_nanos;
        merge_root_timers(&aggregate.main_thread_root_timers, &mut main_thread_root_timers);
        main_thread_stats.add(&aggregate.main_thread_stats);
        if let Some(aux_timer) = &aggregate.aux_thread_root_timer {
            let Some(aux_stats) = &aggregate.aux_thread_stats else {
                panic!(
                    "aggregate at {} has an aux thread root timer without aux thread stats",
                    aggregate.capture_time
                );
            };
            aux_thread_root_timer.merge(aux_timer);
            aux_thread_stats.add(aux_stats);
        }
        merge_root_timers(&aggregate.async_timers, &mut async_timers);
    }

    let has_aux = aux_thread_root_timer.count != 0;
    MergedAggregate {
        transaction_count,
        total_duration_nanos,
        main_thread_root_timers,
        main_thread_stats,
        aux_thread_root_timer: has_aux.then_some(aux_thread_root_timer),
        aux_thread_stats: has_aux.then_some(aux_thread_stats),
        async_timers,
    }
}

/// Merges each incoming root timer into the timer of the same name in `into`,
/// appending a new accumulator for names not seen yet.
pub fn merge_root_timers(incoming: &[Timer], into: &mut Vec<Timer>) {
    for timer in incoming {
        merge_by_name(timer, into);
    }
}

fn merge_by_name(timer: &Timer, into: &mut Vec<Timer>) {
    match into.iter_mut().find(|t| t.name == timer.name) {
        Some(existing) => existing.merge(timer),
        None => {
            let mut accumulator = Timer::new(timer.name.clone(), timer.extended);
            accumulator.merge(timer);
            into.push(accumulator);
        }
    }
}

impl Timer {
    /// Adds `other`'s counters into this timer and merges its children by name.
    /// The name of `self` is kept.
    pub fn merge(&mut self, other: &Timer) {
        self.count += other.count;
        self.total_nanos += other.total_nanos;
        self.extended |= other.extended;
        merge_root_timers(&other.children, &mut self.children);
    }
}
