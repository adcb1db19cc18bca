//! Final ranking once tender deadlines pass

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{BiddingError, Clock, ProposalRanker};
use crate::store::{retry_once, Store, TenderStore};

/// How long after its deadline a tender keeps being re-ranked, in seconds.
/// Covers submissions admitted just before the deadline whose write lands
/// after the first final pass.
const SETTLE_WINDOW_SECS: i64 = 120;

/// Periodically runs a final ranking pass for tenders whose deadline has
/// passed. The first sweep covers every closed tender; later sweeps only look
/// at deadlines since the previous sweep or within the settle window,
/// whichever reaches further back.
/// A second instance doing the same work is harmless since ranking is
/// idempotent.
pub struct DeadlineSweeper {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    ranker: ProposalRanker,
    last_sweep: Mutex<Option<DateTime<Utc>>>,
}

impl DeadlineSweeper {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, ranker: ProposalRanker) -> Self {
        Self {
            store,
            clock,
            ranker,
            last_sweep: Mutex::new(None),
        }
    }

    /// Rank every tender that closed inside the current window. Returns how
    /// many final rankings were written.
    pub async fn sweep_once(&self) -> Result<usize, BiddingError> {
        let now = self.clock.now();
        let settle_from = now - chrono::Duration::seconds(SETTLE_WINDOW_SECS);
        let last_sweep = *self.last_sweep.lock();
        let since = last_sweep
            .map(|last| last.min(settle_from))
            .unwrap_or_default();
        let closed =
            retry_once("closed_tenders", || self.store.closed_tenders(since, now)).await?;

        let mut finalized = 0;
        for tender in closed {
            match self.ranker.rank(tender.id).await {
                Ok(outcome) if outcome.is_final => finalized += 1,
                Ok(_) => {}
                // Removed between listing and ranking
                Err(BiddingError::NotFound(_)) => {}
                Err(e) => {
                    tracing::warn!(tender_id = %tender.id, error = %e, "Final ranking failed");
                }
            }
        }
        *self.last_sweep.lock() = Some(now);

        if finalized > 0 {
            tracing::info!(finalized, "Deadline sweep finalized rankings");
        }
        Ok(finalized)
    }

    pub fn spawn(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.sweep_once().await {
                    tracing::warn!(error = %e, "Deadline sweep failed");
                }
            }
        })
    }
}
