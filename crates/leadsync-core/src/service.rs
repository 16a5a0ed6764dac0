//! End-to-end batch sync: filter, dedupe, chunk, dispatch, aggregate, record.
//!
//! The CRM and the import-log store are reached through the
//! [`ContactUpserter`] and [`ImportLogStore`] traits so the pipeline can be
//! exercised without network or database.

use futures::stream::{self, StreamExt};
use std::future::Future;
use tracing::{info, warn};
use uuid::Uuid;

use crate::chunk::chunk;
use crate::config::SyncConfig;
use crate::error::AppError;
use crate::models::{NewImportLog, Record};
use crate::sync::{Aggregator, ChunkOutcome, RejectionGroup, SyncSummary};
use crate::validation::{dedupe, has_email, is_plausible_email, partition};

/// Sends one chunk of records to the CRM.
///
/// Implementations must not retry and must bound the call with a timeout:
/// every failure, including a timeout, is reported as
/// [`ChunkOutcome::Failure`] rather than an error.
pub trait ContactUpserter: Send + Sync {
    fn upsert_chunk(&self, chunk: Vec<Record>) -> impl Future<Output = ChunkOutcome> + Send;
}

/// Durable, append-only storage for sync summaries.
pub trait ImportLogStore: Send + Sync {
    /// Stores `log` and returns its identifier.
    fn insert(&self, log: &NewImportLog) -> impl Future<Output = Result<Uuid, AppError>> + Send;
}

/// A summary together with the id it was logged under.
#[derive(Debug, Clone)]
pub struct RecordedSync {
    pub log_id: Uuid,
    pub summary: SyncSummary,
}

/// Runs batch syncs against one upstream.
///
/// # Examples
///
/// ```no_run
/// use leadsync_core::{ContactUpserter, Record, SyncConfig, SyncService};
///
/// # async fn example<U: ContactUpserter>(upserter: U) -> Result<(), leadsync_core::AppError> {
/// let service = SyncService::new(upserter, SyncConfig::default())?;
/// let summary = service.sync_batch(vec![Record::new("ada@example.com")]).await?;
/// println!("{} created, {} errors", summary.created_count, summary.error_count);
/// # Ok(())
/// # }
/// ```
pub struct SyncService<U> {
    upserter: U,
    config: SyncConfig,
}

impl<U: ContactUpserter> SyncService<U> {
    /// # Errors
    ///
    /// Returns `AppError::InvalidBatchSize` or `AppError::InvalidConcurrency`
    /// when `config` holds a zero.
    pub fn new(upserter: U, config: SyncConfig) -> Result<Self, AppError> {
        config.validate()?;
        Ok(Self { upserter, config })
    }

    /// Filters, dedupes and upserts `records`, then summarizes what happened.
    ///
    /// Filters run in a fixed order (empty email, email shape, duplicates) and
    /// each only sees what the previous one kept. Chunks are dispatched at
    /// most `concurrency` at a time, once each. A failing chunk never stops
    /// the others.
    pub async fn sync_batch(&self, records: Vec<Record>) -> Result<SyncSummary, AppError> {
        let total = records.len();

        let (with_email, empty_email) = partition(records, has_email);
        let (well_formed, invalid_email) = partition(with_email, is_plausible_email);
        let (unique, duplicates) = dedupe(well_formed, self.config.email_matching);

        info!(
            "Validated {} records: {} to sync, {} empty email, {} invalid email, {} duplicates",
            total,
            unique.len(),
            empty_email.len(),
            invalid_email.len(),
            duplicates.len()
        );

        let chunks = chunk(unique, self.config.batch_size)?;
        let chunk_count = chunks.len();

        let mut aggregator = Aggregator::new();
        aggregator.reject(RejectionGroup::EmptyEmail, empty_email);
        aggregator.reject(RejectionGroup::InvalidEmail, invalid_email);
        aggregator.reject(RejectionGroup::Duplicate, duplicates);

        // Outcomes arrive in completion order; each carries its own chunk, and
        // only this task touches the totals.
        let mut outcomes = stream::iter(chunks.into_iter().enumerate())
            .map(|(i, chunk)| async move {
                let outcome = self.upserter.upsert_chunk(chunk).await;
                if !outcome.is_success() {
                    warn!(
                        "[{}/{}] Upstream rejected chunk of {} records",
                        i + 1,
                        chunk_count,
                        outcome.chunk().len()
                    );
                }
                outcome
            })
            .buffer_unordered(self.config.concurrency);

        while let Some(outcome) = outcomes.next().await {
            aggregator.record(outcome);
        }

        let summary = aggregator.finish();
        info!(
            "Sync complete: {} created, {} updated, {} errors out of {} records in {} chunks",
            summary.created_count, summary.updated_count, summary.error_count, total, chunk_count
        );

        Ok(summary)
    }

    /// Runs [`sync_batch`](Self::sync_batch) and logs the summary to `store`.
    ///
    /// # Errors
    ///
    /// A store failure fails the call and the summary is dropped, so a
    /// summary is only ever returned once it has been persisted.
    pub async fn sync_and_record<S: ImportLogStore>(
        &self,
        records: Vec<Record>,
        store: &S,
    ) -> Result<RecordedSync, AppError> {
        let total_rows = records.len();
        let summary = self.sync_batch(records).await?;

        let log = NewImportLog::from_summary(total_rows, &summary)?;
        let log_id = store.insert(&log).await?;
        info!("Import log created with ID: {}", log_id);

        Ok(RecordedSync { log_id, summary })
    }
}
