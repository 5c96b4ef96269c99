//! Metrics sink boundary.
//!
//! Session logic MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
//!
//! This module is the only allowed bridge between execution logic
//! and the process metrics state.
use crate::{obs::metrics, statement::StatementKind};
use std::{cell::RefCell, time::Instant};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<*const dyn MetricsSink>> = const { RefCell::new(None) };
}

///
/// OpKind
///
/// Public session operation families.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OpKind {
    Load,
    Exists,
    Save,
    Delete,
    Statement,
    Ddl,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MetricsEvent {
    OpStart {
        kind: OpKind,
        entity: &'static str,
    },
    OpFinish {
        kind: OpKind,
        entity: &'static str,
        rows_touched: u64,
        elapsed_micros: u64,
    },
    Statement {
        kind: StatementKind,
        entity: &'static str,
    },
    RowsMaterialized {
        entity: &'static str,
        rows_read: u64,
        objects: u64,
    },
    WriteFailed {
        entity: &'static str,
    },
    ValidationFailed {
        entity: &'static str,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default sink that writes into the metrics state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::OpStart { kind, entity } => {
                metrics::with_state_mut(|m| {
                    m.ops.bump_calls(kind);
                    m.entities.entry(entity.to_string()).or_default().bump_calls(kind);
                });
            }

            MetricsEvent::OpFinish {
                kind,
                entity,
                rows_touched,
                elapsed_micros,
            } => {
                metrics::with_state_mut(|m| {
                    match kind {
                        OpKind::Load => {
                            m.ops.rows_loaded = m.ops.rows_loaded.saturating_add(rows_touched);
                            metrics::add_elapsed(
                                &mut m.perf.load_micros_total,
                                &mut m.perf.load_micros_max,
                                elapsed_micros,
                            );
                        }
                        OpKind::Save => {
                            m.ops.rows_saved = m.ops.rows_saved.saturating_add(rows_touched);
                            metrics::add_elapsed(
                                &mut m.perf.save_micros_total,
                                &mut m.perf.save_micros_max,
                                elapsed_micros,
                            );
                        }
                        OpKind::Delete => {
                            m.ops.rows_deleted = m.ops.rows_deleted.saturating_add(rows_touched);
                            metrics::add_elapsed(
                                &mut m.perf.delete_micros_total,
                                &mut m.perf.delete_micros_max,
                                elapsed_micros,
                            );
                        }
                        OpKind::Exists | OpKind::Statement | OpKind::Ddl => {}
                    }

                    let entry = m.entities.entry(entity.to_string()).or_default();
                    match kind {
                        OpKind::Load => {
                            entry.rows_loaded = entry.rows_loaded.saturating_add(rows_touched);
                        }
                        OpKind::Save => {
                            entry.rows_saved = entry.rows_saved.saturating_add(rows_touched);
                        }
                        OpKind::Delete => {
                            entry.rows_deleted = entry.rows_deleted.saturating_add(rows_touched);
                        }
                        OpKind::Exists | OpKind::Statement | OpKind::Ddl => {}
                    }
                });
            }

            MetricsEvent::Statement { kind, entity } => {
                metrics::with_state_mut(|m| {
                    m.ops.statements = m.ops.statements.saturating_add(1);
                    if kind.is_write() {
                        m.ops.write_statements = m.ops.write_statements.saturating_add(1);
                    }
                    let entry = m.entities.entry(entity.to_string()).or_default();
                    entry.statements = entry.statements.saturating_add(1);
                });
            }

            MetricsEvent::RowsMaterialized {
                entity,
                rows_read,
                objects,
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.rows_read = m.ops.rows_read.saturating_add(rows_read);
                    m.ops.objects_built = m.ops.objects_built.saturating_add(objects);
                    let entry = m.entities.entry(entity.to_string()).or_default();
                    entry.rows_read = entry.rows_read.saturating_add(rows_read);
                });
            }

            MetricsEvent::WriteFailed { entity } => {
                metrics::with_state_mut(|m| {
                    m.ops.write_failures = m.ops.write_failures.saturating_add(1);
                    let entry = m.entities.entry(entity.to_string()).or_default();
                    entry.write_failures = entry.write_failures.saturating_add(1);
                });
            }

            MetricsEvent::ValidationFailed { entity } => {
                metrics::with_state_mut(|m| {
                    m.ops.validation_failures = m.ops.validation_failures.saturating_add(1);
                    let entry = m.entities.entry(entity.to_string()).or_default();
                    entry.validation_failures = entry.validation_failures.saturating_add(1);
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    let override_ptr = SINK_OVERRIDE.with(|cell| *cell.borrow());
    if let Some(ptr) = override_ptr {
        // SAFETY:
        // - `ptr` was produced from a valid `&dyn MetricsSink` in `with_metrics_sink`.
        // - `with_metrics_sink` restores the previous pointer before returning,
        //   including unwind paths via `Guard::drop`.
        // - `record` is synchronous and never stores `ptr` beyond this call.
        unsafe { (&*ptr).record(event) };
    } else {
        GLOBAL_METRICS_SINK.record(event);
    }
}

/// Snapshot the current metrics state.
///
/// `window_start_ms` filters by window start (`EventState::since_ms`),
/// not by per-event timestamps.
#[must_use]
pub fn metrics_report(window_start_ms: Option<u64>) -> metrics::EventReport {
    metrics::report_window_start(window_start_ms)
}

/// Reset all metrics state (counters + perf).
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override.
pub fn with_metrics_sink<T>(sink: &dyn MetricsSink, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<*const dyn MetricsSink>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = self.0;
            });
        }
    }

    // SAFETY:
    // - `sink_ptr` is installed only for this dynamic scope.
    // - `Guard` restores the previous slot on all exits, including panic.
    // - `record` only dereferences synchronously and never persists `sink_ptr`.
    let sink_ptr = unsafe { std::mem::transmute::<&dyn MetricsSink, *const dyn MetricsSink>(sink) };
    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink_ptr));
    let _guard = Guard(prev);

    f()
}

/// Span
/// RAII guard that emits start/finish events for one session operation.
/// Finish accounting happens even on early return.

pub(crate) struct Span {
    kind: OpKind,
    entity: &'static str,
    start: Instant,
    rows: u64,
}

impl Span {
    #[must_use]
    pub(crate) fn new(kind: OpKind, entity: &'static str) -> Self {
        record(MetricsEvent::OpStart { kind, entity });

        Self {
            kind,
            entity,
            start: Instant::now(),
            rows: 0,
        }
    }

    pub(crate) const fn set_rows(&mut self, rows: u64) {
        self.rows = rows;
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        let elapsed_micros = u64::try_from(self.start.elapsed().as_micros()).unwrap_or(u64::MAX);

        record(MetricsEvent::OpFinish {
            kind: self.kind,
            entity: self.entity,
            rows_touched: self.rows,
            elapsed_micros,
        });
    }
}
