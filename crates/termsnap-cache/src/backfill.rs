//! Background embedding backfill.
//!
//! The worker keeps no cursor: each batch re-queries entries that still lack
//! an embedding, so an interrupted run simply resumes on the next one.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use termsnap_protocols::{CacheError, EmbeddingProvider, EntryId, EntryMetadata, EntryStore};

#[cfg(test)]
#[path = "backfill_tests.rs"]
mod tests;

/// Computes missing embeddings for stored entries.
pub struct BackfillWorker<M: EntryMetadata> {
    store: Arc<dyn EntryStore<M>>,
    embedder: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    delay: Duration,
    run_on_startup: bool,
}

impl<M: EntryMetadata> BackfillWorker<M> {
    pub fn new(store: Arc<dyn EntryStore<M>>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            store,
            embedder,
            batch_size: 50,
            delay: Duration::from_millis(200),
            run_on_startup: true,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Pause between two provider calls.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_run_on_startup(mut self, run_on_startup: bool) -> Self {
        self.run_on_startup = run_on_startup;
        self
    }

    /// Embed up to `batch_size` pending entries.
    ///
    /// Returns how many were embedded. A failed entry is logged and moved to
    /// the back of the queue; it stays pending for a later run.
    pub async fn run_batch(&self, batch_size: usize) -> Result<usize, CacheError> {
        let pending = self.store.entries_without_embedding(batch_size).await?;
        if pending.is_empty() {
            return Ok(0);
        }

        let expected_dimension = self.embedder.dimension();
        let mut processed = 0;

        for (i, entry) in pending.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let embedding = match self.embedder.embed(&entry.input_text).await {
                Ok(embedding) => embedding,
                Err(e) => {
                    warn!(id = entry.id, "Backfill embedding failed: {}", e);
                    self.defer(entry.id).await;
                    continue;
                }
            };

            if embedding.dimension != expected_dimension {
                warn!(
                    id = entry.id,
                    expected = expected_dimension,
                    actual = embedding.dimension,
                    "Backfill embedding has wrong dimension, skipping"
                );
                self.defer(entry.id).await;
                continue;
            }

            match self.store.update_embedding(entry.id, &embedding).await {
                Ok(()) => processed += 1,
                // Hard-deleted while the batch was in flight.
                Err(CacheError::NotFound(id)) => debug!(id, "Backfill target vanished"),
                Err(e) => return Err(e),
            }
        }

        debug!(
            namespace = M::NAMESPACE,
            fetched = pending.len(),
            processed,
            "Backfill batch complete"
        );
        Ok(processed)
    }

    async fn defer(&self, id: EntryId) {
        if let Err(e) = self.store.defer_backfill(id).await {
            debug!(id, "Could not defer backfill: {}", e);
        }
    }

    /// Run batches until one embeds nothing. Returns the total embedded.
    pub async fn run_until_complete(&self) -> Result<usize, CacheError> {
        let mut total = 0;
        loop {
            let processed = self.run_batch(self.batch_size).await?;
            if processed == 0 {
                return Ok(total);
            }
            total += processed;
        }
    }

    /// Run on a fixed interval until `cancel` fires.
    ///
    /// Cancellation also interrupts a pass in progress; entries already
    /// written keep their embeddings.
    pub fn spawn(self, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                namespace = M::NAMESPACE,
                "Starting backfill worker (interval: {:?})", interval
            );

            if self.run_on_startup {
                self.run_pass(&cancel).await;
            }

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!(namespace = M::NAMESPACE, "Backfill worker shutting down");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        self.run_pass(&cancel).await;
                    }
                }
            }
        })
    }

    async fn run_pass(&self, cancel: &CancellationToken) {
        tokio::select! {
            _ = cancel.cancelled() => {}
            result = self.run_until_complete() => match result {
                Ok(0) => debug!(namespace = M::NAMESPACE, "Nothing to backfill"),
                Ok(total) => info!(namespace = M::NAMESPACE, total, "Backfilled embeddings"),
                Err(e) => warn!(namespace = M::NAMESPACE, "Backfill pass failed: {}", e),
            },
        }
    }
}
