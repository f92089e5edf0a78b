//! The synchronous half of the reporter: filter, coalesce, sequence, buffer.

use rider_types::{LocationFix, LocationSample, RiderId};
use serde::Serialize;

use crate::{FixCoalescer, OutboundBuffer, SequenceAllocator, TelemetryConfig, TelemetryError};

/// What happened to one sample.
#[derive(Clone, Debug, PartialEq)]
pub enum Ingested {
    /// Sequenced and buffered; `evicted` is the sequence number pushed out to
    /// make room, if any.
    Buffered {
        sequence_number: u64,
        evicted: Option<u64>,
    },
    /// Too close to the previous fix.
    Coalesced,
    /// Invalid or too inaccurate.
    Discarded(TelemetryError),
}

/// Per-reporter counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReporterStats {
    pub sampled: u64,
    pub discarded: u64,
    pub coalesced: u64,
    pub delivered: u64,
    /// Evicted by buffer overflow. Exact, never estimated.
    pub dropped: u64,
    pub last_dropped_seq: Option<u64>,
    pub buffered: usize,
    pub next_sequence: u64,
}

pub struct FixPipeline {
    rider: RiderId,
    max_accuracy_meters: f64,
    coalescer: FixCoalescer,
    sequence: SequenceAllocator,
    buffer: OutboundBuffer,
    sampled: u64,
    discarded: u64,
    coalesced: u64,
    delivered: u64,
}

impl FixPipeline {
    pub fn new(rider: RiderId, config: &TelemetryConfig) -> Self {
        Self {
            rider,
            max_accuracy_meters: config.max_accuracy_meters,
            coalescer: FixCoalescer::new(config.min_distance_meters, config.max_silence),
            sequence: SequenceAllocator::new(),
            buffer: OutboundBuffer::new(config.buffer_capacity),
            sampled: 0,
            discarded: 0,
            coalesced: 0,
            delivered: 0,
        }
    }

    /// Number kept fixes from `next_sequence` on, continuing an earlier
    /// pipeline for the same rider.
    pub fn resume_sequence(mut self, next_sequence: u64) -> Self {
        self.sequence = SequenceAllocator::starting_at(next_sequence);
        self
    }

    pub fn ingest(&mut self, sample: LocationSample) -> Ingested {
        self.sampled += 1;
        if let Err(err) = self.screen(&sample) {
            self.discarded += 1;
            return Ingested::Discarded(err);
        }
        if !self.coalescer.admit(&sample) {
            self.coalesced += 1;
            return Ingested::Coalesced;
        }
        let sequence_number = self.sequence.allocate();
        let fix = LocationFix::from_sample(self.rider.clone(), &sample, sequence_number);
        let evicted = self.buffer.push(fix).map(|f| f.sequence_number);
        Ingested::Buffered {
            sequence_number,
            evicted,
        }
    }

    pub fn next_batch(&self, max: usize) -> Vec<LocationFix> {
        self.buffer.peek_batch(max)
    }

    pub fn acknowledge(&mut self, sequence_numbers: &[u64]) -> usize {
        let removed = self.buffer.acknowledge(sequence_numbers);
        self.delivered += removed as u64;
        removed
    }

    /// Throw away everything still buffered.
    pub fn discard(&mut self) -> usize {
        self.buffer.clear()
    }

    pub fn buffer(&self) -> &OutboundBuffer {
        &self.buffer
    }

    pub fn stats(&self) -> ReporterStats {
        ReporterStats {
            sampled: self.sampled,
            discarded: self.discarded,
            coalesced: self.coalesced,
            delivered: self.delivered,
            dropped: self.buffer.dropped(),
            last_dropped_seq: self.buffer.last_dropped_seq(),
            buffered: self.buffer.len(),
            next_sequence: self.sequence.peek(),
        }
    }

    fn screen(&self, sample: &LocationSample) -> Result<(), TelemetryError> {
        sample.validate()?;
        if sample.accuracy_meters > self.max_accuracy_meters {
            return Err(TelemetryError::InaccurateSample {
                accuracy: sample.accuracy_meters,
                limit: self.max_accuracy_meters,
            });
        }
        Ok(())
    }
}
