use crate::error::RelayError;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque payment identifier assigned by the payment authority.
///
/// Never empty; the value is kept exactly as the caller sent it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(String);

impl PaymentId {
    pub fn new(value: impl Into<String>) -> Result<Self, RelayError> {
        let value = value.into();
        if value.trim().is_empty() {
            Err(RelayError::BadRequest("paymentId must not be empty".to_string()))
        } else {
            Ok(Self(value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PaymentAction {
    Approve,
    Complete,
    Cancel,
}

impl PaymentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentAction::Approve => "approve",
            PaymentAction::Complete => "complete",
            PaymentAction::Cancel => "cancel",
        }
    }

    /// The state a successful forward of this action moves the payment to.
    /// `cancel` is a pass-through and records nothing.
    pub fn target_state(&self) -> Option<PaymentState> {
        match self {
            PaymentAction::Approve => Some(PaymentState::Approved),
            PaymentAction::Complete => Some(PaymentState::Completed),
            PaymentAction::Cancel => None,
        }
    }
}

impl fmt::Display for PaymentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentAction {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(PaymentAction::Approve),
            "complete" => Ok(PaymentAction::Complete),
            "cancel" => Ok(PaymentAction::Cancel),
            other => Err(RelayError::BadRequest(format!("unknown action '{other}'"))),
        }
    }
}

/// Highest lifecycle stage already forwarded for a payment.
///
/// Variants are declared in lifecycle order so `Ord` follows
/// `unseen -> approved -> completed`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentState {
    #[default]
    Unseen,
    Approved,
    Completed,
}

impl fmt::Display for PaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentState::Unseen => "unseen",
            PaymentState::Approved => "approved",
            PaymentState::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// An action currently being forwarded to the payment authority.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PendingClaim {
    pub action: PaymentAction,
    pub claimed_at: DateTime<Utc>,
}

/// Rules applied when claiming an action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClaimPolicy {
    /// Age after which a pending claim is treated as abandoned.
    pub claim_ttl: TimeDelta,
    /// Reject `complete` for a payment that was never approved.
    pub strict_ordering: bool,
}

impl Default for ClaimPolicy {
    fn default() -> Self {
        Self {
            claim_ttl: TimeDelta::seconds(120),
            strict_ordering: false,
        }
    }
}

/// Outcome of an atomic claim on `(payment_id, action)`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Claim {
    /// The caller owns the forward and must later commit or release it.
    Claimed,
    /// The action was already forwarded; nothing to do.
    AlreadyHandled(PaymentState),
    /// Another delivery holds a live claim on this payment.
    InFlight,
    /// `complete` before `approve` under strict ordering.
    OutOfOrder,
}

/// Dedup record for a single payment.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentRecord {
    pub payment_id: PaymentId,
    pub state: PaymentState,
    #[serde(default)]
    pub pending: Option<PendingClaim>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PaymentRecord {
    pub fn new(payment_id: PaymentId) -> Self {
        Self {
            payment_id,
            state: PaymentState::Unseen,
            pending: None,
            updated_at: None,
        }
    }

    /// True once `action` needs no further forwarding.
    pub fn covers(&self, action: PaymentAction) -> bool {
        match action {
            PaymentAction::Approve => self.state >= PaymentState::Approved,
            PaymentAction::Complete => self.state == PaymentState::Completed,
            PaymentAction::Cancel => false,
        }
    }

    /// A record with no state and no claim carries no information and need not be stored.
    pub fn is_vacant(&self) -> bool {
        self.state == PaymentState::Unseen && self.pending.is_none()
    }

    fn live_claim(&self, now: DateTime<Utc>, ttl: TimeDelta) -> Option<&PendingClaim> {
        self.pending
            .as_ref()
            .filter(|claim| now.signed_duration_since(claim.claimed_at) < ttl)
    }

    /// Decides whether `action` may be forwarded and, if so, marks it pending.
    ///
    /// Stores call this inside their exclusive section so the check and the
    /// mark are a single step.
    pub fn try_claim(
        &mut self,
        action: PaymentAction,
        now: DateTime<Utc>,
        policy: &ClaimPolicy,
    ) -> Claim {
        if action == PaymentAction::Cancel {
            return Claim::Claimed;
        }

        if self.covers(action) {
            return Claim::AlreadyHandled(self.state);
        }

        if self.live_claim(now, policy.claim_ttl).is_some() {
            return Claim::InFlight;
        }

        if policy.strict_ordering
            && action == PaymentAction::Complete
            && self.state == PaymentState::Unseen
        {
            return Claim::OutOfOrder;
        }

        self.pending = Some(PendingClaim {
            action,
            claimed_at: now,
        });
        Claim::Claimed
    }

    /// Records a successful forward. State never moves backwards.
    pub fn settle(&mut self, action: PaymentAction, now: DateTime<Utc>) {
        if let Some(target) = action.target_state() {
            if target > self.state {
                self.state = target;
            }
            self.updated_at = Some(now);
        }
        self.release(action);
    }

    /// Drops the pending claim for `action`, leaving state untouched.
    pub fn release(&mut self, action: PaymentAction) {
        if self
            .pending
            .as_ref()
            .is_some_and(|claim| claim.action == action)
        {
            self.pending = None;
        }
    }
}
