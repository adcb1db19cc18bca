//! Tender catalog

use std::sync::Arc;
use uuid::Uuid;

use super::{BiddingError, Clock};
use crate::domain::{CreateTenderRequest, Tender};
use crate::store::{retry_once, Store, StoreError, TenderStore};

#[derive(Clone)]
pub struct TenderCatalog {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl TenderCatalog {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn get_tender(&self, id: Uuid) -> Result<Tender, BiddingError> {
        self.find_tender(id)
            .await?
            .ok_or_else(|| BiddingError::tender_not_found(id))
    }

    /// Lookup that treats a missing tender as a normal outcome, for readers
    /// holding a reference to a tender that may have been removed.
    pub async fn find_tender(&self, id: Uuid) -> Result<Option<Tender>, BiddingError> {
        Ok(retry_once("get_tender", || self.store.get_tender(id)).await?)
    }

    pub async fn list_tenders(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<Tender>, u64), BiddingError> {
        Ok(retry_once("list_tenders", || self.store.list_tenders(offset, limit)).await?)
    }

    pub async fn publish(&self, req: CreateTenderRequest) -> Result<Tender, BiddingError> {
        let tender = req
            .into_tender(self.clock.now())
            .map_err(BiddingError::ValidationFailed)?;

        let tender_id = tender.id;
        let inserted =
            retry_once("insert_tender", || self.store.insert_tender(tender.clone())).await;
        let tender = match inserted {
            Ok(t) => t,
            // A retried insert may collide with its own first attempt.
            Err(StoreError::Conflict(msg)) => {
                retry_once("get_tender", || self.store.get_tender(tender_id))
                    .await?
                    .ok_or(StoreError::Conflict(msg))?
            }
            Err(e) => return Err(e.into()),
        };
        tracing::info!(
            tender_id = %tender.id,
            title = %tender.title,
            deadline = %tender.deadline,
            "Tender published"
        );
        Ok(tender)
    }

    /// Removes the tender. Its proposals are kept and keep pointing at the id.
    pub async fn remove(&self, id: Uuid) -> Result<(), BiddingError> {
        let mut attempts = 0u32;
        let removed = retry_once("delete_tender", || {
            attempts += 1;
            self.store.delete_tender(id)
        })
        .await?;
        // A retry that finds nothing may be looking at its own first attempt.
        if !removed && attempts == 1 {
            return Err(BiddingError::tender_not_found(id));
        }
        tracing::info!(tender_id = %id, "Tender removed");
        Ok(())
    }

    pub async fn seed(&self, tenders: Vec<Tender>) -> Result<usize, BiddingError> {
        let offered = tenders.len();
        let added = retry_once("seed_tenders", || self.store.seed_tenders(tenders.clone())).await?;
        tracing::info!(offered, added, "Tender catalog seeded");
        Ok(added)
    }
}
