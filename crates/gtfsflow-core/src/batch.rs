//! Bounded row buffer handed to one transaction.
//!
//! The producer fills it until `push` reports full, then the consumer commits
//! and clears it before the producer is asked for another row. Memory is
//! therefore bounded by one batch regardless of input size.

use crate::row::Row;

/// Default rows per transaction.
pub const DEFAULT_BATCH_SIZE: usize = 50_000;

pub struct Batch {
    cap: usize,
    rows: Vec<Row>,
}

impl Batch {
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            cap,
            rows: Vec::with_capacity(cap.min(DEFAULT_BATCH_SIZE)),
        }
    }

    /// Append a row. Returns `true` once the batch is full and must be
    /// flushed before the next push.
    pub fn push(&mut self, row: Row) -> bool {
        debug_assert!(self.rows.len() < self.cap, "push into a full batch");
        self.rows.push(row);
        self.is_full()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Empty the batch, keeping its allocation.
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.rows.len() >= self.cap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_reports_full_at_cap() {
        let mut b = Batch::with_capacity(2);
        assert!(!b.push(Row::nulls(1)));
        assert!(b.push(Row::nulls(1)));
        assert!(b.is_full());
        b.clear();
        assert!(b.is_empty());
        assert_eq!(b.capacity(), 2);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut b = Batch::with_capacity(0);
        assert!(b.push(Row::nulls(1)));
    }

}
