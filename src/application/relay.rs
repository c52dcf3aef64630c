use crate::domain::payment::{Claim, ClaimPolicy, PaymentAction, PaymentId, PaymentState};
use crate::domain::ports::{PaymentAuthority, PaymentAuthorityBox, PaymentStoreBox};
use crate::error::{RelayError, Result};
use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info, warn};

/// Raw callback body as sent by the client SDK.
///
/// Both fields are optional here so that a missing field surfaces as
/// `BadRequest` instead of a deserialization failure.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CallbackRequest {
    pub payment_id: Option<String>,
    pub action: Option<String>,
}

impl CallbackRequest {
    pub fn new(payment_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            payment_id: Some(payment_id.into()),
            action: Some(action.into()),
        }
    }

    pub fn validate(self) -> Result<(PaymentId, PaymentAction)> {
        let payment_id = self
            .payment_id
            .ok_or_else(|| RelayError::BadRequest("missing paymentId".to_string()))?;
        let action = self
            .action
            .ok_or_else(|| RelayError::BadRequest("missing action".to_string()))?;

        Ok((PaymentId::new(payment_id)?, action.parse()?))
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RelayOutcome {
    /// The action reached the payment authority and was accepted.
    Forwarded,
    /// The action had already been forwarded; nothing was sent.
    Duplicate(PaymentState),
}

/// Deduplicating pass-through from client callbacks to the payment authority.
///
/// Each `(payment, action)` pair is forwarded at most once: the store's atomic
/// claim guards the forward, a successful forward commits the new state, and a
/// failed one releases the claim so the caller can retry.
pub struct PaymentRelay {
    store: PaymentStoreBox,
    authority: PaymentAuthorityBox,
    policy: ClaimPolicy,
}

impl PaymentRelay {
    pub fn new(store: PaymentStoreBox, authority: PaymentAuthorityBox, policy: ClaimPolicy) -> Self {
        Self {
            store,
            authority,
            policy,
        }
    }

    pub fn authority(&self) -> &dyn PaymentAuthority {
        self.authority.as_ref()
    }

    pub fn store(&self) -> &PaymentStoreBox {
        &self.store
    }

    /// Validates a raw callback and relays it.
    pub async fn handle(&self, request: CallbackRequest) -> Result<RelayOutcome> {
        let (payment_id, action) = request.validate()?;
        self.relay(payment_id, action).await
    }

    pub async fn relay(&self, payment_id: PaymentId, action: PaymentAction) -> Result<RelayOutcome> {
        info!(payment_id = %payment_id, %action, "Pi callback");

        match self
            .store
            .claim(&payment_id, action, Utc::now(), &self.policy)
            .await?
        {
            Claim::Claimed => {}
            Claim::AlreadyHandled(state) => {
                info!(payment_id = %payment_id, %action, "Already {state}, not forwarding");
                return Ok(RelayOutcome::Duplicate(state));
            }
            Claim::InFlight => return Err(RelayError::InFlight { payment_id, action }),
            Claim::OutOfOrder => return Err(RelayError::OutOfOrder(payment_id)),
        }

        if let Err(e) = self.authority.forward(&payment_id, action).await {
            warn!(payment_id = %payment_id, %action, "Forward failed: {e}");
            if let Err(release_err) = self.store.release(&payment_id, action).await {
                error!(payment_id = %payment_id, %action, "Failed to release claim: {release_err}");
            }
            return Err(e);
        }

        // The authority already accepted the action; a failed commit leaves the
        // claim pending until it expires.
        if let Err(e) = self.store.commit(&payment_id, action, Utc::now()).await {
            error!(payment_id = %payment_id, %action, "Forwarded but failed to record state: {e}");
            return Err(e);
        }

        info!(payment_id = %payment_id, %action, "Forwarded to Pi API");
        Ok(RelayOutcome::Forwarded)
    }
}
