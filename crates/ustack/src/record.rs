//! Allocation records
//!
//! Live allocations are tracked on an explicit stack kept outside the
//! arena, so no metadata is ever written into the caller's bytes. The
//! record beneath the top is its predecessor in allocation order.

use smallvec::SmallVec;

/// Depth kept inline before the record stack spills to the heap
pub const INLINE_RECORDS: usize = 16;

/// Metadata for one live allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationRecord {
    /// Distance of the buffer from the arena base
    pub offset: usize,
    /// Requested size before alignment
    pub length: usize,
    /// Size actually carved from the arena
    pub aligned: usize,
}

impl AllocationRecord {
    /// Offset one past the carved region
    pub fn end(&self) -> usize {
        self.offset + self.aligned
    }
}

/// LIFO stack of [`AllocationRecord`]s
#[derive(Debug, Default, Clone)]
pub struct RecordStack {
    records: SmallVec<[AllocationRecord; INLINE_RECORDS]>,
}

impl RecordStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, record: AllocationRecord) {
        debug_assert!(self.top().is_none_or(|top| top.end() <= record.offset));
        self.records.push(record);
    }

    pub(crate) fn pop(&mut self) -> Option<AllocationRecord> {
        self.records.pop()
    }

    /// The most recent record
    pub fn top(&self) -> Option<&AllocationRecord> {
        self.records.last()
    }

    /// Record at `depth` counted from the bottom (the oldest is 0)
    pub fn get(&self, depth: usize) -> Option<&AllocationRecord> {
        self.records.get(depth)
    }

    /// Number of live records
    pub fn depth(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether the stack has spilled out of its inline storage
    pub fn spilled(&self) -> bool {
        self.records.spilled()
    }

    /// Records from the most recent to the oldest
    pub fn iter(&self) -> impl Iterator<Item = &AllocationRecord> + '_ {
        self.records.iter().rev()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(offset: usize, length: usize) -> AllocationRecord {
        AllocationRecord {
            offset,
            length,
            aligned: length.next_multiple_of(4),
        }
    }

    #[test]
    fn test_iter_is_most_recent_first() {
        let mut stack = RecordStack::new();
        stack.push(record(0, 10));
        stack.push(record(12, 500));
        stack.push(record(512, 3));

        let lengths: Vec<_> = stack.iter().map(|r| r.length).collect();
        assert_eq!(lengths, vec![3, 500, 10]);
        assert_eq!(stack.top().map(|r| r.offset), Some(512));
        assert_eq!(stack.get(0).map(|r| r.length), Some(10));
    }

    #[test]
    fn test_pop_order() {
        let mut stack = RecordStack::new();
        stack.push(record(0, 8));
        stack.push(record(8, 4));

        assert_eq!(stack.pop().map(|r| r.length), Some(4));
        assert_eq!(stack.pop().map(|r| r.length), Some(8));
        assert_eq!(stack.pop(), None);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_spills_past_inline_depth() {
        let mut stack = RecordStack::new();
        for i in 0..=INLINE_RECORDS {
            stack.push(record(i * 4, 4));
        }
        assert!(stack.spilled());
        assert_eq!(stack.depth(), INLINE_RECORDS + 1);
    }
}
