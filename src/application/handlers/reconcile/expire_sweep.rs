//! ExpireSweepHandler - expires pending transactions past their deadline.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use crate::domain::foundation::Timestamp;
use crate::domain::transaction::{EngineError, TransactionStatus};
use crate::ports::TransactionRepository;

/// Report of one sweep run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Transactions moved to Expired.
    pub expired: usize,

    /// Transactions that settled between the scan and the CAS.
    pub lost_races: usize,
}

/// Handler that sweeps overdue pending transactions to Expired.
///
/// The per-row CAS makes the sweep safe to run concurrently with
/// webhooks and other sweep instances; a row that gets paid mid-sweep
/// simply loses the race and is left alone.
pub struct ExpireSweepHandler {
    transactions: Arc<dyn TransactionRepository>,
}

impl ExpireSweepHandler {
    pub fn new(transactions: Arc<dyn TransactionRepository>) -> Self {
        Self { transactions }
    }

    pub async fn handle(&self) -> Result<SweepReport, EngineError> {
        let now = Timestamp::now();
        let overdue = self.transactions.find_pending_past_deadline(&now).await?;

        let results = join_all(overdue.iter().map(|txn| {
            let transactions = self.transactions.clone();
            async move {
                transactions
                    .transition(&txn.id, TransactionStatus::Expired)
                    .await
            }
        }))
        .await;

        let mut report = SweepReport::default();
        for (txn, result) in overdue.iter().zip(results) {
            match result {
                Ok(receipt) if receipt.changed => report.expired += 1,
                Ok(_) => report.lost_races += 1,
                Err(EngineError::InvalidTransition { current, .. }) => {
                    warn!(
                        transaction_id = %txn.id,
                        current = %current,
                        "transaction settled during sweep"
                    );
                    report.lost_races += 1;
                }
                Err(err) => return Err(err),
            }
        }

        if report.expired > 0 || report.lost_races > 0 {
            info!(
                expired = report.expired,
                lost_races = report.lost_races,
                "expiry sweep finished"
            );
        }
        Ok(report)
    }
}
