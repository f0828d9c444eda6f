use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::{interval, Duration};

use quos_common::types::EventType;
use quos_storage::{OutboxRow, Store};

/// A named outbox processor. Implementations hold their own dependencies
/// (store handles, sink clients); the driver owns the polling cadence and
/// the claim/ack protocol.
#[async_trait]
pub trait Consumer: Send + Sync {
    /// Globally unique processor name; replicas share it, which is what
    /// makes the ack cursor race-safe rather than duplicating work.
    fn name(&self) -> &'static str;

    /// Event types this consumer claims.
    fn event_types(&self) -> &'static [EventType];

    /// Processes one event. `Ok` acks the event; `Err` leaves it unacked so
    /// a later poll retries it.
    async fn handle(&self, event: &OutboxRow) -> anyhow::Result<()>;
}

/// Shared polling loop for all consumers.
///
/// Each tick runs one batch inside a single transaction: claim with
/// `FOR UPDATE SKIP LOCKED`, handle every event (one failure never stops
/// the rest of the batch), ack the successes on the same transaction,
/// commit. A crash mid-batch rolls the acks back and the whole batch is
/// re-delivered — downstream effects are idempotent, so that is safe.
pub struct PollingDriver<C> {
    store: Store,
    consumer: C,
    interval_secs: u64,
    batch_size: u64,
}

impl<C: Consumer> PollingDriver<C> {
    pub fn new(store: Store, consumer: C, interval_secs: u64, batch_size: u64) -> Self {
        Self {
            store,
            consumer,
            interval_secs,
            batch_size,
        }
    }

    /// Runs until `shutdown` flips. Cancellation is only observed between
    /// ticks, so an in-flight batch always completes before the loop exits.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let processor = self.consumer.name();
        tracing::info!(
            processor,
            interval_secs = self.interval_secs,
            batch_size = self.batch_size,
            "consumer started"
        );
        let mut tick = interval(Duration::from_secs(self.interval_secs.max(1)));
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    if let Err(e) = self.poll_once().await {
                        tracing::error!(processor, error = %e, "poll cycle failed");
                    }
                }
                _ = shutdown.changed() => {
                    tracing::info!(processor, "consumer stopped");
                    return;
                }
            }
        }
    }

    /// One claim/handle/ack cycle. Public so tests (and tools) can drive a
    /// consumer deterministically without the timer.
    pub async fn poll_once(&self) -> quos_storage::Result<usize> {
        let processor = self.consumer.name();
        let txn = self.store.begin().await?;
        let events = self
            .store
            .claim_events(&txn, processor, self.consumer.event_types(), self.batch_size)
            .await?;
        if events.is_empty() {
            txn.commit().await?;
            return Ok(0);
        }

        let mut processed = 0;
        for event in &events {
            match self.consumer.handle(event).await {
                Ok(()) => {
                    self.store.ack_event(&txn, event.id, processor).await?;
                    processed += 1;
                }
                Err(e) => {
                    tracing::error!(
                        processor,
                        event_id = %event.id,
                        error = %e,
                        "failed to process event"
                    );
                }
            }
        }
        txn.commit().await?;
        Ok(processed)
    }
}
