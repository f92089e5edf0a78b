//! Bounded outbound buffer: limits undelivered fixes while the sink is down.
//!
//! Holds sequenced fixes in order. When a push would exceed capacity, the
//! oldest undelivered fix is evicted and counted. Staleness is bounded;
//! memory is bounded; sequence numbers are never reused.

use rider_types::LocationFix;
use std::collections::{BTreeSet, VecDeque};

/// Buffer size used when none is configured.
pub const DEFAULT_BUFFER_CAPACITY: usize = 200;

pub struct OutboundBuffer {
    /// Undelivered fixes, oldest first.
    fixes: VecDeque<LocationFix>,
    capacity: usize,
    /// Fixes evicted for capacity since the buffer was created.
    dropped: u64,
    last_dropped_seq: Option<u64>,
}

impl OutboundBuffer {
    /// A zero capacity is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            fixes: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
            last_dropped_seq: None,
        }
    }

    /// Append a fix, evicting the oldest one if full. Returns the evicted fix.
    pub fn push(&mut self, fix: LocationFix) -> Option<LocationFix> {
        let evicted = if self.fixes.len() >= self.capacity {
            self.fixes.pop_front()
        } else {
            None
        };
        if let Some(old) = &evicted {
            self.dropped += 1;
            self.last_dropped_seq = Some(old.sequence_number);
        }
        self.fixes.push_back(fix);
        evicted
    }

    /// Copy of the oldest `max` fixes, for a delivery attempt.
    pub fn peek_batch(&self, max: usize) -> Vec<LocationFix> {
        self.fixes.iter().take(max).cloned().collect()
    }

    /// Remove acknowledged fixes. Returns how many were removed; sequence
    /// numbers no longer buffered (evicted meanwhile) are ignored.
    pub fn acknowledge(&mut self, sequence_numbers: &[u64]) -> usize {
        let acked: BTreeSet<u64> = sequence_numbers.iter().copied().collect();
        let before = self.fixes.len();
        self.fixes.retain(|f| !acked.contains(&f.sequence_number));
        before - self.fixes.len()
    }

    /// Discard everything. Returns how many fixes were discarded. Discarded
    /// fixes do not count as dropped.
    pub fn clear(&mut self) -> usize {
        let n = self.fixes.len();
        self.fixes.clear();
        n
    }

    pub fn sequence_numbers(&self) -> Vec<u64> {
        self.fixes.iter().map(|f| f.sequence_number).collect()
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn last_dropped_seq(&self) -> Option<u64> {
        self.last_dropped_seq
    }
}
