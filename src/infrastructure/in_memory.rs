use crate::domain::payment::{Claim, ClaimPolicy, PaymentAction, PaymentId, PaymentRecord};
use crate::domain::ports::PaymentStore;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for payment dedup records.
///
/// Uses `Arc<RwLock<HashMap<PaymentId, PaymentRecord>>>`; claims run under the
/// write lock, which makes check-and-mark atomic within this process.
/// State is lost on restart.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    records: Arc<RwLock<HashMap<PaymentId, PaymentRecord>>>,
}

impl InMemoryPaymentStore {
    /// Creates a new, empty in-memory payment store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn get(&self, payment_id: &PaymentId) -> Result<Option<PaymentRecord>> {
        let records = self.records.read().await;
        Ok(records.get(payment_id).cloned())
    }

    async fn claim(
        &self,
        payment_id: &PaymentId,
        action: PaymentAction,
        now: DateTime<Utc>,
        policy: &ClaimPolicy,
    ) -> Result<Claim> {
        let mut records = self.records.write().await;
        let record = records
            .entry(payment_id.clone())
            .or_insert_with(|| PaymentRecord::new(payment_id.clone()));

        let claim = record.try_claim(action, now, policy);
        if record.is_vacant() {
            records.remove(payment_id);
        }
        Ok(claim)
    }

    async fn commit(
        &self,
        payment_id: &PaymentId,
        action: PaymentAction,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut records = self.records.write().await;
        let record = records
            .entry(payment_id.clone())
            .or_insert_with(|| PaymentRecord::new(payment_id.clone()));

        record.settle(action, now);
        if record.is_vacant() {
            records.remove(payment_id);
        }
        Ok(())
    }

    async fn release(&self, payment_id: &PaymentId, action: PaymentAction) -> Result<()> {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(payment_id) {
            record.release(action);
            if record.is_vacant() {
                records.remove(payment_id);
            }
        }
        Ok(())
    }

    async fn all_records(&self) -> Result<Vec<PaymentRecord>> {
        let records = self.records.read().await;
        Ok(records.values().cloned().collect())
    }
}
