//! The sink seam between the decode pipeline and storage backends.
//!
//! One operation: append a batch of rows. The Postgres loader and the
//! in-memory test double both satisfy it; the batch orchestrator only
//! ever sees the trait.

use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use heatmap_core::EmittedRecord;

/// Errors surfaced by a sink. Always fatal for the batch.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("row encoding error: {0}")]
    Encode(#[from] csv::Error),
}

/// An ordered, append-only destination for emitted records.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Append a batch. Records within one file arrive in emission order,
    /// and a successful pipeline run never delivers a record twice.
    async fn append_rows(&self, batch: &[EmittedRecord]) -> Result<(), LoadError>;
}

/// In-memory sink for tests: keeps every appended row in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    rows: Mutex<Vec<EmittedRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        MemorySink::default()
    }

    /// Snapshot of everything appended so far.
    pub fn rows(&self) -> Vec<EmittedRecord> {
        self.rows.lock().expect("sink lock").clone()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn append_rows(&self, batch: &[EmittedRecord]) -> Result<(), LoadError> {
        self.rows.lock().expect("sink lock").extend_from_slice(batch);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn record(hex: &str, t: f64) -> EmittedRecord {
        EmittedRecord {
            t,
            hex: hex.into(),
            flight: None,
            squawk: None,
            lat: 47.0,
            lon: 8.0,
            alt: 100,
            gs: None,
            type_code: 0,
        }
    }

    #[tokio::test]
    async fn test_memory_sink_preserves_order() {
        let sink = MemorySink::new();
        sink.append_rows(&[record("0abcde", 1.0), record("0abcdf", 2.0)])
            .await
            .unwrap();
        sink.append_rows(&[record("0abce0", 3.0)]).await.unwrap();

        let rows = sink.rows();
        let hexes: Vec<&str> = rows.iter().map(|r| r.hex.as_str()).collect();
        assert_eq!(hexes, vec!["0abcde", "0abcdf", "0abce0"]);
    }

    #[tokio::test]
    async fn test_memory_sink_empty_batch() {
        let sink = MemorySink::new();
        sink.append_rows(&[]).await.unwrap();
        assert!(sink.rows().is_empty());
    }
}
