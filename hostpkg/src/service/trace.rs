//! Operation tracing for package telemetry.
//!
//! A [`Tracer`] records nested begin/end spans and point events while an
//! operation runs. [`Tracer::flatten`] turns them into the flat, time-ordered
//! [`Trace`] list shipped to the control plane:
//!
//! ```text
//! >install
//! >download artifact
//! <download artifact: connection reset
//! <install
//! =telemetry
//! ```

use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Marker for a span start.
pub const START_MARKER: char = '>';
/// Marker for a span end.
pub const END_MARKER: char = '<';
/// Marker for a point event.
pub const EVENT_MARKER: char = '=';

/// One entry of the flattened trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Trace {
    /// Marker plus operation label.
    pub operation: String,
    /// Exit code of the span, zero for starts and events.
    pub exitcode: i64,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

#[derive(Debug, Clone)]
struct SpanRecord {
    operation: String,
    start: (i64, u64),
    end: Option<(i64, u64)>,
    exitcode: i64,
    error: Option<String>,
}

#[derive(Debug, Clone)]
struct EventRecord {
    operation: String,
    exitcode: i64,
    at: (i64, u64),
}

#[derive(Debug, Default)]
struct TracerState {
    seq: u64,
    spans: Vec<SpanRecord>,
    events: Vec<EventRecord>,
}

impl TracerState {
    fn stamp(&mut self) -> (i64, u64) {
        self.seq += 1;
        (Utc::now().timestamp_millis(), self.seq)
    }
}

/// Collects spans and events for one package operation.
#[derive(Debug, Default)]
pub struct Tracer {
    state: Mutex<TracerState>,
}

impl Tracer {
    /// Create an empty tracer.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, TracerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Begin a span. The span ends when [`TraceSpan::end`] or
    /// [`TraceSpan::fail`] is called, or successfully when dropped.
    pub fn begin(&self, operation: impl Into<String>) -> TraceSpan<'_> {
        let mut state = self.state();
        let start = state.stamp();
        state.spans.push(SpanRecord {
            operation: operation.into(),
            start,
            end: None,
            exitcode: 0,
            error: None,
        });
        TraceSpan {
            tracer: self,
            index: state.spans.len() - 1,
            ended: false,
        }
    }

    /// Record a point event.
    pub fn add_trace(&self, operation: impl Into<String>, exitcode: i64) {
        let mut state = self.state();
        let at = state.stamp();
        state.events.push(EventRecord {
            operation: operation.into(),
            exitcode,
            at,
        });
    }

    fn finish(&self, index: usize, exitcode: i64, error: Option<String>) {
        let mut state = self.state();
        let end = state.stamp();
        if let Some(span) = state.spans.get_mut(index) {
            span.end = Some(end);
            span.exitcode = exitcode;
            span.error = error;
        }
    }

    /// Flatten spans and events into a time-ordered list.
    ///
    /// Entries are ordered by timestamp, then by recording order. Spans still
    /// open contribute only their start.
    pub fn flatten(&self) -> Vec<Trace> {
        let state = self.state();
        let mut entries: Vec<((i64, u64), Trace)> = Vec::new();

        for span in &state.spans {
            entries.push((
                span.start,
                Trace {
                    operation: format!("{}{}", START_MARKER, span.operation),
                    exitcode: 0,
                    timestamp: span.start.0,
                },
            ));
            if let Some(end) = span.end {
                let operation = match &span.error {
                    Some(error) => format!("{}{}: {}", END_MARKER, span.operation, error),
                    None => format!("{}{}", END_MARKER, span.operation),
                };
                entries.push((
                    end,
                    Trace {
                        operation,
                        exitcode: span.exitcode,
                        timestamp: end.0,
                    },
                ));
            }
        }

        for event in &state.events {
            entries.push((
                event.at,
                Trace {
                    operation: format!("{}{}", EVENT_MARKER, event.operation),
                    exitcode: event.exitcode,
                    timestamp: event.at.0,
                },
            ));
        }

        entries.sort_by_key(|(key, _)| *key);
        entries.into_iter().map(|(_, trace)| trace).collect()
    }
}

/// An open span. Ends successfully on drop unless ended explicitly.
#[derive(Debug)]
pub struct TraceSpan<'t> {
    tracer: &'t Tracer,
    index: usize,
    ended: bool,
}

impl TraceSpan<'_> {
    /// End the span with an exit code.
    pub fn end(mut self, exitcode: i64) {
        self.ended = true;
        self.tracer.finish(self.index, exitcode, None);
    }

    /// End the span as failed, recording the error text.
    pub fn fail(mut self, error: impl std::fmt::Display) {
        self.ended = true;
        self.tracer.finish(self.index, 1, Some(error.to_string()));
    }
}

impl Drop for TraceSpan<'_> {
    fn drop(&mut self) {
        if !self.ended {
            self.tracer.finish(self.index, 0, None);
        }
    }
}
