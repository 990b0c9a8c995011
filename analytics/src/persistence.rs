//! Fire-and-forget persistence sink for positions, signals, scan results
//! and performance metrics: append/upsert keyed by id, with no
//! read-consistency guarantee required of the engine.

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Which record stream a persisted value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Position,
    Signal,
    ScanResult,
    PerformanceMetric,
}

/// Destination for persisted records. The engine never awaits a write and
/// never retries a failed one; a sink that drops writes on error is a
/// valid implementation.
pub trait PersistenceSink: Send + Sync + fmt::Debug {
    /// Insert or replace the record stored under `id` within `kind`.
    fn upsert(&self, kind: RecordKind, id: &str, value: Value);

    /// Append `value` to `kind`'s append-only stream (scan results and
    /// performance metrics are typically append-only; positions and
    /// signals are typically upserted by id).
    fn append(&self, kind: RecordKind, value: Value);
}

/// Serializes `value` to JSON and upserts it, logging (but not
/// propagating) a serialization failure.
pub fn upsert_serializable<S: Serialize>(sink: &dyn PersistenceSink, kind: RecordKind, id: &str, value: &S) {
    match serde_json::to_value(value) {
        Ok(json) => sink.upsert(kind, id, json),
        Err(err) => tracing::warn!(error = %err, "failed to serialize record for persistence"),
    }
}

/// Serializes `value` to JSON and appends it, logging (but not
/// propagating) a serialization failure.
pub fn append_serializable<S: Serialize>(sink: &dyn PersistenceSink, kind: RecordKind, value: &S) {
    match serde_json::to_value(value) {
        Ok(json) => sink.append(kind, json),
        Err(err) => tracing::warn!(error = %err, "failed to serialize record for persistence"),
    }
}

/// In-process sink for paper mode and tests: upserts overwrite by id,
/// appends accumulate in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryPersistenceSink {
    upserts: Mutex<IndexMap<(RecordKindKey, String), Value>>,
    appends: Mutex<IndexMap<RecordKindKey, Vec<Value>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RecordKindKey(RecordKind);

impl From<RecordKind> for RecordKindKey {
    fn from(kind: RecordKind) -> Self {
        Self(kind)
    }
}

impl InMemoryPersistenceSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: RecordKind, id: &str) -> Option<Value> {
        self.upserts.lock().get(&(kind.into(), id.to_string())).cloned()
    }

    pub fn appended(&self, kind: RecordKind) -> Vec<Value> {
        self.appends.lock().get(&kind.into()).cloned().unwrap_or_default()
    }
}

impl PersistenceSink for InMemoryPersistenceSink {
    fn upsert(&self, kind: RecordKind, id: &str, value: Value) {
        self.upserts.lock().insert((kind.into(), id.to_string()), value);
    }

    fn append(&self, kind: RecordKind, value: Value) {
        self.appends.lock().entry(kind.into()).or_default().push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn upsert_replaces_prior_value_for_the_same_id() {
        let sink = InMemoryPersistenceSink::new();
        sink.upsert(RecordKind::Position, "AAAUSDT", json!({"qty": 1.0}));
        sink.upsert(RecordKind::Position, "AAAUSDT", json!({"qty": 2.0}));
        assert_eq!(sink.get(RecordKind::Position, "AAAUSDT"), Some(json!({"qty": 2.0})));
    }

    #[test]
    fn append_accumulates_in_order() {
        let sink = InMemoryPersistenceSink::new();
        sink.append(RecordKind::ScanResult, json!({"symbol": "AAAUSDT"}));
        sink.append(RecordKind::ScanResult, json!({"symbol": "BBBUSDT"}));
        assert_eq!(sink.appended(RecordKind::ScanResult).len(), 2);
    }

    #[test]
    fn upsert_serializable_helper_round_trips_a_struct() {
        #[derive(Serialize)]
        struct Sample {
            value: f64,
        }
        let sink = InMemoryPersistenceSink::new();
        upsert_serializable(&sink, RecordKind::PerformanceMetric, "sharpe", &Sample { value: 1.5 });
        assert_eq!(sink.get(RecordKind::PerformanceMetric, "sharpe"), Some(json!({"value": 1.5})));
    }
}
