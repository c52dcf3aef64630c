use super::payment::{Claim, ClaimPolicy, PaymentAction, PaymentId, PaymentRecord};
use super::user::VerifiedUser;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Dedup record storage.
///
/// `claim` must check and mark in one atomic step; it is the only thing that
/// keeps concurrent duplicate deliveries from forwarding twice.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn get(&self, payment_id: &PaymentId) -> Result<Option<PaymentRecord>>;
    async fn claim(
        &self,
        payment_id: &PaymentId,
        action: PaymentAction,
        now: DateTime<Utc>,
        policy: &ClaimPolicy,
    ) -> Result<Claim>;
    async fn commit(
        &self,
        payment_id: &PaymentId,
        action: PaymentAction,
        now: DateTime<Utc>,
    ) -> Result<()>;
    async fn release(&self, payment_id: &PaymentId, action: PaymentAction) -> Result<()>;
    async fn all_records(&self) -> Result<Vec<PaymentRecord>>;
}

/// The external service that owns the payment lifecycle.
#[async_trait]
pub trait PaymentAuthority: Send + Sync {
    /// Forwards `action` using the service credential. Any non-2xx is an error.
    async fn forward(&self, payment_id: &PaymentId, action: PaymentAction) -> Result<()>;
    /// Resolves a user access token to the user it belongs to.
    async fn verify_user(&self, access_token: &str) -> Result<VerifiedUser>;
}

pub type PaymentStoreBox = Box<dyn PaymentStore>;
pub type PaymentAuthorityBox = Box<dyn PaymentAuthority>;
