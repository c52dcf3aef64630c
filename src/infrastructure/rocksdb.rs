use crate::domain::payment::{Claim, ClaimPolicy, PaymentAction, PaymentId, PaymentRecord};
use crate::domain::ports::PaymentStore;
use crate::error::{RelayError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for storing payment dedup records.
pub const CF_PAYMENTS: &str = "payments";

/// A persistent payment store implementation using RocksDB.
///
/// Records are JSON-encoded and keyed by the raw payment id bytes. RocksDB
/// holds an exclusive lock on its directory, so a single process owns the
/// store; within that process every read-modify-write runs under `write_lock`,
/// which makes `claim` an atomic check-and-set.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBPaymentStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBPaymentStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the "payments" column family exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_payments = ColumnFamilyDescriptor::new(CF_PAYMENTS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_payments])?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn payments_cf(&self) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(CF_PAYMENTS)
            .ok_or_else(|| RelayError::internal("Payments column family not found"))
    }

    /// RocksDB's own key estimate for the payments column family; no scan.
    pub fn estimated_records(&self) -> Result<Option<u64>> {
        let cf = self.payments_cf()?;
        Ok(self
            .db
            .property_int_value_cf(cf, "rocksdb.estimate-num-keys")?)
    }

    fn read(&self, payment_id: &PaymentId) -> Result<Option<PaymentRecord>> {
        let cf = self.payments_cf()?;
        match self.db.get_cf(cf, payment_id.as_str().as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write(&self, record: &PaymentRecord) -> Result<()> {
        let cf = self.payments_cf()?;
        let key = record.payment_id.as_str().as_bytes();
        if record.is_vacant() {
            self.db.delete_cf(cf, key)?;
        } else {
            self.db.put_cf(cf, key, serde_json::to_vec(record)?)?;
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentStore for RocksDBPaymentStore {
    async fn get(&self, payment_id: &PaymentId) -> Result<Option<PaymentRecord>> {
        self.read(payment_id)
    }

    async fn claim(
        &self,
        payment_id: &PaymentId,
        action: PaymentAction,
        now: DateTime<Utc>,
        policy: &ClaimPolicy,
    ) -> Result<Claim> {
        let _guard = self.write_lock.lock().await;
        let mut record = self
            .read(payment_id)?
            .unwrap_or_else(|| PaymentRecord::new(payment_id.clone()));

        let claim = record.try_claim(action, now, policy);
        if claim == Claim::Claimed {
            self.write(&record)?;
        }
        Ok(claim)
    }

    async fn commit(
        &self,
        payment_id: &PaymentId,
        action: PaymentAction,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut record = self
            .read(payment_id)?
            .unwrap_or_else(|| PaymentRecord::new(payment_id.clone()));

        record.settle(action, now);
        self.write(&record)
    }

    async fn release(&self, payment_id: &PaymentId, action: PaymentAction) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if let Some(mut record) = self.read(payment_id)? {
            record.release(action);
            self.write(&record)?;
        }
        Ok(())
    }

    async fn all_records(&self) -> Result<Vec<PaymentRecord>> {
        let cf = self.payments_cf()?;
        let mut records = Vec::new();

        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            records.push(serde_json::from_slice(&value)?);
        }

        Ok(records)
    }
}
