//! Append-only diagnostics sink: one record per notable event in a
//! cycle (filter rejection, signal built, risk refusal, execution
//! failure...), plus a running count of rejection reasons the engine can
//! surface without replaying the whole log.

use breakout_markets::Symbol;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One diagnostics event. Every field but `timestamp_ms`/`component`/
/// `stage` is optional since different stages populate different subsets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub timestamp_ms: i64,
    pub component: String,
    pub stage: String,
    pub symbol: Option<Symbol>,
    pub correlation_id: Option<String>,
    pub metric: Option<String>,
    pub value: Option<f64>,
    pub threshold: Option<f64>,
    pub passed: Option<bool>,
    pub reason: Option<String>,
    pub metadata: IndexMap<String, String>,
}

impl DiagnosticRecord {
    pub fn new(timestamp_ms: i64, component: impl Into<String>, stage: impl Into<String>) -> Self {
        Self {
            timestamp_ms,
            component: component.into(),
            stage: stage.into(),
            symbol: None,
            correlation_id: None,
            metric: None,
            value: None,
            threshold: None,
            passed: None,
            reason: None,
            metadata: IndexMap::new(),
        }
    }

    pub fn with_symbol(mut self, symbol: Symbol) -> Self {
        self.symbol = Some(symbol);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_metric(mut self, metric: impl Into<String>, value: f64, threshold: Option<f64>) -> Self {
        self.metric = Some(metric.into());
        self.value = Some(value);
        self.threshold = threshold;
        self
    }

    pub fn with_outcome(mut self, passed: bool, reason: Option<String>) -> Self {
        self.passed = Some(passed);
        self.reason = reason;
        self
    }
}

/// Destination for [`DiagnosticRecord`]s. Implementations are append-only
/// and fire-and-forget: the engine never blocks a cycle on sink I/O and
/// never retries a failed write.
pub trait DiagnosticsSink: Send + Sync + fmt::Debug {
    fn record(&self, record: DiagnosticRecord);

    /// Bump the counter for a rejection/failure reason, independent of
    /// whether a full record was also appended for it.
    fn increment_reason(&self, reason: &str);

    /// Snapshot of reason counters accumulated so far.
    fn reason_counts(&self) -> IndexMap<String, u64>;
}

/// In-process sink backed by a `Vec`; used in paper mode and tests where
/// nothing needs to survive the process.
#[derive(Debug, Default)]
pub struct InMemoryDiagnosticsSink {
    records: Mutex<Vec<DiagnosticRecord>>,
    reason_counts: Mutex<IndexMap<String, u64>>,
}

impl InMemoryDiagnosticsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<DiagnosticRecord> {
        self.records.lock().clone()
    }
}

impl DiagnosticsSink for InMemoryDiagnosticsSink {
    fn record(&self, record: DiagnosticRecord) {
        if let Some(reason) = record.reason.clone() {
            *self.reason_counts.lock().entry(reason).or_insert(0) += 1;
        }
        tracing::debug!(
            component = %record.component,
            stage = %record.stage,
            correlation_id = record.correlation_id.as_deref().unwrap_or_default(),
            "diagnostics record"
        );
        self.records.lock().push(record);
    }

    fn increment_reason(&self, reason: &str) {
        *self.reason_counts.lock().entry(reason.to_string()).or_insert(0) += 1;
    }

    fn reason_counts(&self) -> IndexMap<String, u64> {
        self.reason_counts.lock().clone()
    }
}

/// Sink that appends each record as one JSON line to a file, rotating to a
/// new file named with the current UTC date. File layout is an
/// implementation detail the core never inspects.
#[derive(Debug)]
pub struct JsonlDiagnosticsSink {
    base_path: std::path::PathBuf,
    writer: Mutex<RotatingWriter>,
    reason_counts: Mutex<IndexMap<String, u64>>,
}

#[derive(Debug)]
struct RotatingWriter {
    current_date: String,
    file: Option<std::fs::File>,
}

impl JsonlDiagnosticsSink {
    pub fn new(base_path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            writer: Mutex::new(RotatingWriter { current_date: String::new(), file: None }),
            reason_counts: Mutex::new(IndexMap::new()),
        }
    }

    fn path_for(&self, date: &str) -> std::path::PathBuf {
        let mut path = self.base_path.clone();
        let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        path.set_file_name(format!("{stem}.{date}.jsonl"));
        path
    }
}

impl DiagnosticsSink for JsonlDiagnosticsSink {
    fn record(&self, record: DiagnosticRecord) {
        if let Some(reason) = record.reason.clone() {
            *self.reason_counts.lock().entry(reason).or_insert(0) += 1;
        }

        let date = chrono::DateTime::from_timestamp_millis(record.timestamp_ms)
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MIN_UTC)
            .format("%Y-%m-%d")
            .to_string();

        let Ok(line) = serde_json::to_string(&record) else {
            tracing::warn!("failed to serialize diagnostics record");
            return;
        };

        let mut writer = self.writer.lock();
        if writer.current_date != date || writer.file.is_none() {
            match std::fs::OpenOptions::new().create(true).append(true).open(self.path_for(&date)) {
                Ok(file) => {
                    writer.file = Some(file);
                    writer.current_date = date;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "failed to open diagnostics file");
                    return;
                }
            }
        }

        if let Some(file) = writer.file.as_mut() {
            use std::io::Write;
            if let Err(err) = writeln!(file, "{line}") {
                tracing::warn!(error = %err, "failed to append diagnostics record");
            }
        }
    }

    fn increment_reason(&self, reason: &str) {
        *self.reason_counts.lock().entry(reason.to_string()).or_insert(0) += 1;
    }

    fn reason_counts(&self) -> IndexMap<String, u64> {
        self.reason_counts.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_sink_accumulates_records_and_reasons() {
        let sink = InMemoryDiagnosticsSink::new();
        sink.record(
            DiagnosticRecord::new(1_000, "scanner", "filter")
                .with_outcome(false, Some("below_min_volume".to_string())),
        );
        sink.record(
            DiagnosticRecord::new(2_000, "scanner", "filter")
                .with_outcome(false, Some("below_min_volume".to_string())),
        );
        assert_eq!(sink.records().len(), 2);
        assert_eq!(sink.reason_counts().get("below_min_volume"), Some(&2));
    }

    #[test]
    fn increment_reason_without_a_record_still_counts() {
        let sink = InMemoryDiagnosticsSink::new();
        sink.increment_reason("risk_refused");
        sink.increment_reason("risk_refused");
        assert_eq!(sink.reason_counts().get("risk_refused"), Some(&2));
        assert!(sink.records().is_empty());
    }

    #[test]
    fn jsonl_sink_appends_one_line_per_record() {
        let dir = std::env::temp_dir().join(format!("breakout-diag-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("diagnostics.jsonl");
        let sink = JsonlDiagnosticsSink::new(&path);

        sink.record(DiagnosticRecord::new(1_700_000_000_000, "engine", "cycle"));
        sink.record(DiagnosticRecord::new(1_700_000_000_001, "engine", "cycle"));

        let entries: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let contents = std::fs::read_to_string(entries[0].as_ref().unwrap().path()).unwrap();
        assert_eq!(contents.lines().count(), 2);

        std::fs::remove_dir_all(&dir).ok();
    }
}
