//! Location reporter: a sampling task and a delivery task per approved rider.
//!
//! The sampler ticks on a fixed interval, reads one sample and feeds it
//! through the [`FixPipeline`]. The deliverer drains the buffer to the sink in
//! batches with jittered exponential backoff. They share only the pipeline.
//!
//! Stopping is cooperative. The stop signal is checked at every sampling
//! tick and before every delivery attempt; a sink call already in flight runs
//! until it answers or times out. The buffer is discarded as soon as stop is
//! requested.

use rand::Rng;
use rider_types::{Clock, LocationFix, RiderId};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::Instrument;

use crate::{
    FixPipeline, Ingested, LocationProvider, ReporterStats, TelemetryConfig, TelemetryError,
    TelemetryMetrics, TelemetrySink,
};

/// Everything a reporter needs. Consumed by [`spawn`](Self::spawn).
pub struct LocationReporter {
    rider: RiderId,
    provider: Arc<dyn LocationProvider>,
    sink: Arc<dyn TelemetrySink>,
    config: TelemetryConfig,
    clock: Arc<dyn Clock>,
    metrics: Arc<TelemetryMetrics>,
    next_sequence: u64,
}

/// Control over a running reporter. Dropping it stops the reporter.
pub struct ReporterHandle {
    rider: RiderId,
    stop_tx: watch::Sender<bool>,
    pipeline: Arc<Mutex<FixPipeline>>,
    sampler: JoinHandle<()>,
    deliverer: JoinHandle<()>,
}

impl LocationReporter {
    pub fn new(
        rider: RiderId,
        provider: Arc<dyn LocationProvider>,
        sink: Arc<dyn TelemetrySink>,
        config: TelemetryConfig,
        clock: Arc<dyn Clock>,
        metrics: Arc<TelemetryMetrics>,
    ) -> Self {
        Self {
            rider,
            provider,
            sink,
            config,
            clock,
            metrics,
            next_sequence: 1,
        }
    }

    /// Continue the rider's numbering from an earlier reporter's
    /// [`ReporterStats::next_sequence`].
    pub fn starting_at(mut self, next_sequence: u64) -> Self {
        self.next_sequence = next_sequence;
        self
    }

    /// Start sampling and delivering. Must be called inside a tokio runtime.
    ///
    /// Both tasks run inside the span that is current when this is called.
    pub fn spawn(self) -> ReporterHandle {
        let span = tracing::Span::current();
        let (stop_tx, stop_rx) = watch::channel(false);
        let pipeline = Arc::new(Mutex::new(
            FixPipeline::new(self.rider.clone(), &self.config).resume_sequence(self.next_sequence),
        ));
        let ready = Arc::new(Notify::new());
        let this = Arc::new(self);

        this.metrics.active_reporters.inc();
        tracing::info!(
            rider = %this.rider,
            interval_ms = this.config.sample_interval.as_millis() as u64,
            next_sequence = this.next_sequence,
            "location reporter started"
        );

        let sampler = tokio::spawn(
            Arc::clone(&this)
                .run_sampler(Arc::clone(&pipeline), Arc::clone(&ready), stop_rx.clone())
                .instrument(span.clone()),
        );
        let deliverer = tokio::spawn(
            Arc::clone(&this)
                .run_deliverer(Arc::clone(&pipeline), ready, stop_rx)
                .instrument(span),
        );

        ReporterHandle {
            rider: this.rider.clone(),
            stop_tx,
            pipeline,
            sampler,
            deliverer,
        }
    }

    async fn run_sampler(
        self: Arc<Self>,
        pipeline: Arc<Mutex<FixPipeline>>,
        ready: Arc<Notify>,
        mut stop_rx: watch::Receiver<bool>,
    ) {
        let mut interval = tokio::time::interval(self.config.sample_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = stop_rx.changed() => break,
                _ = interval.tick() => {}
            }
            if *stop_rx.borrow() {
                break;
            }

            let sample = match tokio::time::timeout(
                self.config.sample_timeout,
                self.provider.current_fix(),
            )
            .await
            {
                Ok(Ok(sample)) => sample,
                Ok(Err(err)) => {
                    tracing::debug!(rider = %self.rider, error = %err, "no location this tick");
                    continue;
                }
                Err(_) => {
                    let err = TelemetryError::SampleTimeout(self.config.sample_timeout);
                    tracing::debug!(rider = %self.rider, error = %err, "no location this tick");
                    continue;
                }
            };

            self.metrics.fixes_sampled.inc();
            let ingested = pipeline.lock().await.ingest(sample);
            match ingested {
                Ingested::Buffered {
                    sequence_number,
                    evicted,
                } => {
                    if let Some(dropped) = evicted {
                        self.metrics.fixes_dropped.inc();
                        tracing::warn!(rider = %self.rider, dropped_seq = dropped, "outbound buffer full, dropped oldest fix");
                    }
                    tracing::trace!(rider = %self.rider, seq = sequence_number, "fix buffered");
                    ready.notify_one();
                }
                Ingested::Coalesced => self.metrics.fixes_coalesced.inc(),
                Ingested::Discarded(err) => {
                    self.metrics.fixes_discarded.inc();
                    tracing::debug!(rider = %self.rider, error = %err, "sample discarded");
                }
            }
        }

        self.metrics.active_reporters.dec();
        tracing::info!(rider = %self.rider, "location reporter stopped");
    }

    async fn run_deliverer(
        self: Arc<Self>,
        pipeline: Arc<Mutex<FixPipeline>>,
        ready: Arc<Notify>,
        mut stop_rx: watch::Receiver<bool>,
    ) {
        loop {
            // New fixes wake us early; otherwise retry whatever is left once per interval.
            tokio::select! {
                biased;
                _ = stop_rx.changed() => break,
                _ = ready.notified() => {}
                _ = tokio::time::sleep(self.config.sample_interval) => {}
            }

            // Drain until empty, or until a batch exhausts its retries.
            loop {
                if *stop_rx.borrow() {
                    return;
                }
                let batch = pipeline.lock().await.next_batch(self.config.batch_size);
                if batch.is_empty() {
                    break;
                }
                let span = tracing::debug_span!("delivery", rider = %self.rider, batch_len = batch.len());
                let delivered = self
                    .deliver_batch(batch, &pipeline, &mut stop_rx)
                    .instrument(span)
                    .await;
                if !delivered {
                    break;
                }
            }
        }
    }

    /// Deliver one batch with retries. Returns true once the whole batch is
    /// acknowledged.
    async fn deliver_batch(
        &self,
        mut batch: Vec<LocationFix>,
        pipeline: &Mutex<FixPipeline>,
        stop_rx: &mut watch::Receiver<bool>,
    ) -> bool {
        let policy = self.config.delivery_retry;

        for attempt in 0..policy.max_attempts() {
            if attempt > 0 {
                let sample: f64 = rand::thread_rng().gen_range(-1.0..=1.0);
                let delay = policy.delay_for(attempt, sample);
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => return false,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            if *stop_rx.borrow() {
                return false;
            }

            match self.attempt(&batch).await {
                Ok(acked) => {
                    let removed = pipeline.lock().await.acknowledge(&acked);
                    self.metrics.fixes_delivered.inc_by(removed as u64);
                    batch.retain(|f| !acked.contains(&f.sequence_number));
                    if batch.is_empty() {
                        tracing::debug!(attempt, delivered = removed, "batch delivered");
                        return true;
                    }
                    let err = TelemetryError::PartialAck {
                        acked: removed,
                        sent: removed + batch.len(),
                    };
                    self.metrics.delivery_failures.inc();
                    tracing::warn!(attempt, error = %err, "delivery incomplete");
                }
                Err(err) => {
                    self.metrics.delivery_failures.inc();
                    tracing::warn!(attempt, error = %err, "delivery attempt failed");
                }
            }
        }

        tracing::warn!(
            attempts = policy.max_attempts(),
            at = %self.clock.now(),
            "sink unreachable, keeping fixes buffered"
        );
        false
    }

    /// One bounded sink call. Returns the acknowledged sequence numbers.
    async fn attempt(&self, batch: &[LocationFix]) -> Result<Vec<u64>, TelemetryError> {
        let receipt = tokio::time::timeout(self.config.delivery_timeout, self.sink.deliver(batch))
            .await
            .map_err(|_| TelemetryError::DeliveryTimeout(self.config.delivery_timeout))??;
        if receipt.acknowledged.is_empty() {
            return Err(TelemetryError::PartialAck {
                acked: 0,
                sent: batch.len(),
            });
        }
        Ok(receipt.acknowledged)
    }
}

impl ReporterHandle {
    pub async fn stats(&self) -> ReporterStats {
        self.pipeline.lock().await.stats()
    }

    pub fn is_running(&self) -> bool {
        !*self.stop_tx.borrow() && !self.sampler.is_finished()
    }

    /// Stop both tasks and discard whatever is still buffered.
    ///
    /// Returns the final counters. Waits for an in-flight sink call to answer
    /// or time out, never longer.
    pub async fn stop(mut self) -> ReporterStats {
        self.stop_tx.send_replace(true);
        let discarded = self.pipeline.lock().await.discard();
        if discarded > 0 {
            tracing::info!(rider = %self.rider, discarded, "discarded undelivered fixes");
        }
        if let Err(err) = (&mut self.sampler).await {
            tracing::error!(rider = %self.rider, error = %err, "sampler task failed");
        }
        if let Err(err) = (&mut self.deliverer).await {
            tracing::error!(rider = %self.rider, error = %err, "delivery task failed");
        }
        self.pipeline.lock().await.stats()
    }
}

impl Drop for ReporterHandle {
    fn drop(&mut self) {
        self.stop_tx.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DeliveryReceipt;
    use async_trait::async_trait;
    use rider_types::{LocationSample, SystemClock, Timestamp};
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::time::Duration;

    /// Moves ~111m north per call; unavailable after `limit` calls.
    struct MovingProvider {
        calls: AtomicU64,
        limit: u64,
    }

    #[async_trait]
    impl LocationProvider for MovingProvider {
        async fn current_fix(&self) -> Result<LocationSample, TelemetryError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n >= self.limit {
                return Err(TelemetryError::LocationUnavailable("no signal".into()));
            }
            Ok(LocationSample {
                latitude: 40.0 + n as f64 * 0.001,
                longitude: -73.9,
                accuracy_meters: 6.0,
                captured_at: Timestamp::from_secs(n),
            })
        }
    }

    #[derive(Default)]
    struct FlakySink {
        down: AtomicBool,
        seen: std::sync::Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl TelemetrySink for FlakySink {
        async fn deliver(&self, batch: &[LocationFix]) -> Result<DeliveryReceipt, TelemetryError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(TelemetryError::Delivery("503".into()));
            }
            self.seen
                .lock()
                .unwrap()
                .extend(batch.iter().map(|f| f.sequence_number));
            Ok(DeliveryReceipt::all(batch))
        }
    }

    fn config(capacity: usize) -> TelemetryConfig {
        TelemetryConfig {
            sample_interval: Duration::from_secs(1),
            buffer_capacity: capacity,
            ..TelemetryConfig::default()
        }
    }

    fn spawn(
        provider: Arc<MovingProvider>,
        sink: Arc<FlakySink>,
        config: TelemetryConfig,
    ) -> (ReporterHandle, Arc<TelemetryMetrics>) {
        let metrics = Arc::new(TelemetryMetrics::unregistered());
        let handle = LocationReporter::new(
            RiderId::new("rider-42").unwrap(),
            provider,
            sink,
            config,
            Arc::new(SystemClock),
            Arc::clone(&metrics),
        )
        .spawn();
        (handle, metrics)
    }

    async fn wait_for_samples(handle: &ReporterHandle, n: u64) {
        for _ in 0..10_000 {
            if handle.stats().await.sampled >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        panic!("reporter never sampled {n} fixes");
    }

    #[tokio::test(start_paused = true)]
    async fn delivers_gap_free_sequence() {
        let provider = Arc::new(MovingProvider {
            calls: AtomicU64::new(0),
            limit: 20,
        });
        let sink = Arc::new(FlakySink::default());
        let (handle, metrics) = spawn(provider, Arc::clone(&sink), config(200));

        wait_for_samples(&handle, 20).await;
        tokio::time::sleep(Duration::from_secs(2)).await;

        let stats = handle.stats().await;
        assert_eq!(stats.delivered, 20);
        assert_eq!(stats.buffered, 0);
        assert_eq!(*sink.seen.lock().unwrap(), (1..=20).collect::<Vec<u64>>());
        assert_eq!(metrics.fixes_delivered.get(), 20);
        assert_eq!(metrics.active_reporters.get(), 1);

        handle.stop().await;
        assert_eq!(metrics.active_reporters.get(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn sink_outage_drops_oldest_and_counts_them() {
        let provider = Arc::new(MovingProvider {
            calls: AtomicU64::new(0),
            limit: 1000,
        });
        let sink = Arc::new(FlakySink::default());
        sink.down.store(true, Ordering::SeqCst);
        let (handle, metrics) = spawn(provider, Arc::clone(&sink), config(200));

        wait_for_samples(&handle, 1000).await;

        let stats = handle.stats().await;
        assert_eq!(stats.dropped, 800);
        assert_eq!(stats.last_dropped_seq, Some(800));
        assert_eq!(stats.buffered, 200);
        assert_eq!(stats.delivered, 0);
        assert_eq!(
            handle.pipeline.lock().await.buffer().sequence_numbers(),
            (801..=1000).collect::<Vec<u64>>()
        );
        assert_eq!(metrics.fixes_dropped.get(), 800);
        assert!(metrics.delivery_failures.get() > 0);
        assert!(sink.seen.lock().unwrap().is_empty());

        // Recovery delivers the survivors in order.
        sink.down.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(30)).await;
        let stats = handle.stats().await;
        assert_eq!(stats.buffered, 0, "{stats:?}");
        assert_eq!(*sink.seen.lock().unwrap(), (801..=1000).collect::<Vec<u64>>());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_discards_buffer_and_halts_sampling() {
        let provider = Arc::new(MovingProvider {
            calls: AtomicU64::new(0),
            limit: u64::MAX,
        });
        let sink = Arc::new(FlakySink::default());
        sink.down.store(true, Ordering::SeqCst);
        let (handle, _metrics) = spawn(Arc::clone(&provider), sink, config(50));

        wait_for_samples(&handle, 10).await;
        assert!(handle.is_running());

        let stats = handle.stop().await;
        assert_eq!(stats.buffered, 0);
        assert!(stats.sampled >= 10);

        let calls = provider.calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), calls);
    }
}
