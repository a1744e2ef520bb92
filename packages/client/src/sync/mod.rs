//! Sync Drainer: replays outbox records through REST once connectivity is back.

mod submitter;

use std::sync::Arc;

pub use submitter::{HttpSubmitter, RestSubmitter};

use crate::{error::OutboxError, outbox::Outbox};

/// Outcome of one drain cycle, by record id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Acknowledged and removed
    pub submitted: Vec<String>,
    /// Submission failed; record retained for the next cycle
    pub failed: Vec<String>,
    /// Already in flight in a concurrent drain
    pub skipped: Vec<String>,
}

impl DrainReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

pub struct SyncDrainer {
    outbox: Arc<Outbox>,
    submitter: Arc<dyn RestSubmitter>,
}

impl SyncDrainer {
    pub fn new(outbox: Arc<Outbox>, submitter: Arc<dyn RestSubmitter>) -> Self {
        Self { outbox, submitter }
    }

    /// Submit every pending record once, oldest first.
    ///
    /// Failed records stay where they are and the cycle moves on. Records
    /// claimed by a concurrent drain are skipped.
    pub async fn drain(&self) -> Result<DrainReport, OutboxError> {
        let pending = self.outbox.pending().await?;
        let mut report = DrainReport::default();

        for record in pending {
            let Some(_claim) = self.outbox.try_claim(&record.id) else {
                report.skipped.push(record.id);
                continue;
            };
            // A concurrent drain may have finished it between listing and claiming
            if self.outbox.get(&record.id).await?.is_none() {
                report.skipped.push(record.id);
                continue;
            }

            match self.submitter.submit(&record).await {
                Ok(()) => {
                    self.outbox.complete(&record.id).await?;
                    report.submitted.push(record.id);
                }
                Err(e) => {
                    tracing::warn!("Sync of {:?} record '{}' failed: {}", record.kind, record.id, e);
                    report.failed.push(record.id);
                }
            }
        }

        tracing::info!(
            "Drain finished: {} submitted, {} failed, {} skipped",
            report.submitted.len(),
            report.failed.len(),
            report.skipped.len()
        );
        Ok(report)
    }
}
