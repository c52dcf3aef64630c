use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use crate::domain::payment::{PaymentAction, PaymentId};

pub type Result<T> = std::result::Result<T, RelayError>;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Payment authority returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Payment authority unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{action} for payment {payment_id} is already in flight")]
    InFlight {
        payment_id: PaymentId,
        action: PaymentAction,
    },

    #[error("complete for payment {0} arrived before approve")]
    OutOfOrder(PaymentId),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl RelayError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into().into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RelayError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            RelayError::OutOfOrder(_) => StatusCode::CONFLICT,
            // The Pi SDK retries on 5xx, so an in-flight duplicate comes back later
            RelayError::InFlight { .. }
            | RelayError::Upstream { .. }
            | RelayError::Transport(_)
            | RelayError::Config(_)
            | RelayError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the caller may resend the same payload unchanged.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            RelayError::BadRequest(_) | RelayError::Unauthorized(_) | RelayError::Config(_)
        )
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(e: serde_json::Error) -> Self {
        RelayError::InternalError(Box::new(e))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for RelayError {
    fn from(e: rocksdb::Error) -> Self {
        RelayError::InternalError(Box::new(e))
    }
}

// The Pi SDK only looks at the status code, so bodies stay short plain text.
impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            RelayError::Upstream { .. } | RelayError::Transport(_) => {
                error!("Pi API error: {self}");
                "Pi API error".to_string()
            }
            RelayError::InternalError(_) | RelayError::Config(_) => {
                error!("Server error: {self}");
                "Server error".to_string()
            }
            _ => {
                warn!(retryable = self.is_retryable(), "Rejected request: {self}");
                self.to_string()
            }
        };

        (status, body).into_response()
    }
}
