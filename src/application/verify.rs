use crate::domain::ports::PaymentAuthority;
use crate::domain::user::VerifiedUser;
use crate::error::{RelayError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub access_token: Option<String>,
    pub proofs: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub ok: bool,
    pub user: VerifiedUser,
    pub proofs_count: usize,
    pub verified_at: DateTime<Utc>,
}

/// Checks a user access token with the payment authority.
///
/// Any rejection by the authority is reported as `Unauthorized`; transport
/// failures keep their own variant so they map to a server error. A request
/// without `proofs` is rejected only after the token checks out.
pub async fn verify_access_token(
    authority: &dyn PaymentAuthority,
    request: VerifyRequest,
) -> Result<Verification> {
    let access_token = request
        .access_token
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| RelayError::Unauthorized("missing access token".to_string()))?;

    let user = authority
        .verify_user(&access_token)
        .await
        .map_err(|e| match e {
            RelayError::Upstream { status, .. } => {
                warn!("Pi API rejected access token with {status}");
                RelayError::Unauthorized("Invalid Pi access token".to_string())
            }
            other => other,
        })?;

    let proofs = request
        .proofs
        .ok_or_else(|| RelayError::Unauthorized("missing proofs".to_string()))?;

    Ok(Verification {
        ok: true,
        user,
        proofs_count: proofs.len(),
        verified_at: Utc::now(),
    })
}
