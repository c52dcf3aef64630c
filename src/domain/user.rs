use serde::{Deserialize, Serialize};

/// A Pi user whose access token the payment authority accepted.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct VerifiedUser {
    pub uid: String,
    pub username: String,
}
