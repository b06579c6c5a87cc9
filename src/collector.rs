//! Capped accumulation of survey records.

use crate::types::AggregatedRecord;
use std::ops::ControlFlow;

/// Accumulates records in discovery order, optionally up to a cap.
///
/// Ranking is left to the consumer of [`into_records`](Self::into_records).
#[derive(Debug, Default)]
pub struct ResultCollector {
    records: Vec<AggregatedRecord>,
    cap: Option<usize>,
}

impl ResultCollector {
    pub fn new(cap: Option<usize>) -> Self {
        Self {
            records: Vec::new(),
            cap,
        }
    }

    /// Appends a record. Returns `Break` once the cap has been reached and
    /// traversal should stop.
    pub fn push(&mut self, record: AggregatedRecord) -> ControlFlow<()> {
        if !self.is_full() {
            self.records.push(record);
        }
        if self.is_full() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    pub fn is_full(&self) -> bool {
        self.cap.is_some_and(|cap| self.records.len() >= cap)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<AggregatedRecord> {
        self.records
    }
}
