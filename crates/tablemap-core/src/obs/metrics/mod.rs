use crate::obs::sink::OpKind;
use serde::{Deserialize, Serialize};
use std::{cell::RefCell, cmp::Ordering, collections::BTreeMap};

///
/// EventState
/// Ephemeral, in-memory counters and simple timing totals for operations.
/// Counters are per thread; session operations run on the caller's thread.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub perf: EventPerf,
    pub entities: BTreeMap<String, EntityCounters>,
    pub since_ms: u64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            perf: EventPerf::default(),
            entities: BTreeMap::new(),
            since_ms: now_millis(),
        }
    }
}

fn now_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Session entrypoints
    pub load_calls: u64,
    pub exists_calls: u64,
    pub save_calls: u64,
    pub delete_calls: u64,
    pub statement_calls: u64,
    pub ddl_calls: u64,

    // Statements sent to a backend
    pub statements: u64,
    pub write_statements: u64,

    // Rows touched
    pub rows_read: u64,
    pub objects_built: u64,
    pub rows_loaded: u64,
    pub rows_saved: u64,
    pub rows_deleted: u64,

    // Failures
    pub write_failures: u64,
    pub validation_failures: u64,
}

impl EventOps {
    pub(crate) const fn bump_calls(&mut self, kind: OpKind) {
        let slot = match kind {
            OpKind::Load => &mut self.load_calls,
            OpKind::Exists => &mut self.exists_calls,
            OpKind::Save => &mut self.save_calls,
            OpKind::Delete => &mut self.delete_calls,
            OpKind::Statement => &mut self.statement_calls,
            OpKind::Ddl => &mut self.ddl_calls,
        };
        *slot = slot.saturating_add(1);
    }
}

///
/// EntityCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EntityCounters {
    pub load_calls: u64,
    pub exists_calls: u64,
    pub save_calls: u64,
    pub delete_calls: u64,
    pub statements: u64,
    pub rows_read: u64,
    pub rows_loaded: u64,
    pub rows_saved: u64,
    pub rows_deleted: u64,
    pub write_failures: u64,
    pub validation_failures: u64,
}

impl EntityCounters {
    pub(crate) const fn bump_calls(&mut self, kind: OpKind) {
        let slot = match kind {
            OpKind::Load => &mut self.load_calls,
            OpKind::Exists => &mut self.exists_calls,
            OpKind::Save => &mut self.save_calls,
            OpKind::Delete => &mut self.delete_calls,
            OpKind::Statement | OpKind::Ddl => return,
        };
        *slot = slot.saturating_add(1);
    }
}

///
/// EventPerf
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventPerf {
    // Wall-clock totals per operation family
    pub load_micros_total: u128,
    pub save_micros_total: u128,
    pub delete_micros_total: u128,

    // Maximum observed durations
    pub load_micros_max: u64,
    pub save_micros_max: u64,
    pub delete_micros_max: u64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters and timings, restarting the window.
pub fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

/// Accumulate a duration and track a max.
pub(crate) fn add_elapsed(total: &mut u128, max: &mut u64, delta: u64) {
    *total = total.saturating_add(u128::from(delta));
    if delta > *max {
        *max = delta;
    }
}

///
/// EventReport
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    /// Ephemeral runtime counters since `since_ms`.
    pub counters: Option<EventState>,
    /// Per-entity counters and averages.
    pub entity_counters: Vec<EntitySummary>,
}

///
/// EntitySummary
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EntitySummary {
    pub entity: String,
    pub load_calls: u64,
    pub save_calls: u64,
    pub delete_calls: u64,
    pub rows_loaded: u64,
    pub rows_read: u64,
    pub rows_deleted: u64,
    pub avg_rows_per_load: f64,
    pub avg_rows_read_per_load: f64,
    pub write_failures: u64,
}

/// Build a report from in-memory counters.
#[must_use]
#[expect(clippy::cast_precision_loss)]
pub fn report() -> EventReport {
    let snap = with_state(Clone::clone);

    let per_load = |n: u64, calls: u64| if calls > 0 { n as f64 / calls as f64 } else { 0.0 };

    let mut entity_counters: Vec<EntitySummary> = snap
        .entities
        .iter()
        .map(|(entity, ops)| EntitySummary {
            entity: entity.clone(),
            load_calls: ops.load_calls,
            save_calls: ops.save_calls,
            delete_calls: ops.delete_calls,
            rows_loaded: ops.rows_loaded,
            rows_read: ops.rows_read,
            rows_deleted: ops.rows_deleted,
            avg_rows_per_load: per_load(ops.rows_loaded, ops.load_calls),
            avg_rows_read_per_load: per_load(ops.rows_read, ops.load_calls),
            write_failures: ops.write_failures,
        })
        .collect();

    entity_counters.sort_by(|a, b| {
        match b
            .avg_rows_per_load
            .partial_cmp(&a.avg_rows_per_load)
            .unwrap_or(Ordering::Equal)
        {
            Ordering::Equal => match b.rows_loaded.cmp(&a.rows_loaded) {
                Ordering::Equal => a.entity.cmp(&b.entity),
                other => other,
            },
            other => other,
        }
    });

    EventReport {
        counters: Some(snap),
        entity_counters,
    }
}

/// Report only when the current window started at or after `window_start_ms`.
#[must_use]
pub fn report_window_start(window_start_ms: Option<u64>) -> EventReport {
    let since = with_state(|m| m.since_ms);
    match window_start_ms {
        Some(start) if start > since => EventReport::default(),
        _ => report(),
    }
}

///
/// TESTS
///

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn reset_all_clears_state() {
        with_state_mut(|m| {
            m.ops.load_calls = 3;
            m.perf.save_micros_max = 9;
            m.entities.insert(
                "alpha".to_string(),
                EntityCounters {
                    load_calls: 1,
                    ..Default::default()
                },
            );
        });

        reset_all();

        with_state(|m| {
            assert_eq!(m.ops.load_calls, 0);
            assert_eq!(m.perf.save_micros_max, 0);
            assert!(m.entities.is_empty());
        });
    }

    #[test]
    fn report_sorts_entities_by_average_rows() {
        reset_all();
        with_state_mut(|m| {
            for (name, calls, rows) in [("alpha", 2, 6), ("beta", 1, 5), ("gamma", 2, 6)] {
                m.entities.insert(
                    name.to_string(),
                    EntityCounters {
                        load_calls: calls,
                        rows_loaded: rows,
                        ..Default::default()
                    },
                );
            }
        });

        let report = report();
        let names: Vec<_> = report
            .entity_counters
            .iter()
            .map(|e| e.entity.as_str())
            .collect();

        // avg rows per load desc, then rows_loaded desc, then name asc
        assert_eq!(names, ["beta", "alpha", "gamma"]);
        assert_eq!(report.entity_counters[0].avg_rows_per_load, 5.0);
        assert_eq!(report.entity_counters[1].avg_rows_per_load, 3.0);
    }

    #[test]
    fn elapsed_tracks_total_and_max() {
        let (mut total, mut max) = (0u128, 0u64);
        add_elapsed(&mut total, &mut max, 7);
        add_elapsed(&mut total, &mut max, 3);

        assert_eq!(total, 10);
        assert_eq!(max, 7);
    }
}
