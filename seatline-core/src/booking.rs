use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Classified, ErrorClass};

/// Reason code the confirmation endpoint uses when the hold lapsed before
/// the booking could be written.
pub const REASON_HOLD_EXPIRED: &str = "HOLD_EXPIRED";

/// The idempotency unit for confirmation. The server keys on
/// `(hold_id, payment_id)`; a retry must resend this exact request, never
/// mint a new pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfirmationRequest {
    pub hold_id: String,
    pub payment_id: String,
    pub gateway_order_ref: String,
    pub amount: i64,
    pub currency: String,
}

/// The durable, ticketed outcome of a hold + payment + confirm sequence.
/// Creation is the single irreversible event of the workflow; once created
/// the hold is consumed regardless of its expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRecord {
    pub confirmation_code: String,
    pub hold_id: String,
    pub payment_id: String,
    pub gateway_order_ref: String,
    pub amount_charged: i64,
    pub currency: String,
    pub booked_at: DateTime<Utc>,
}

#[async_trait]
pub trait BookingConfirmer: Send + Sync {
    async fn confirm(&self, request: &ConfirmationRequest) -> Result<BookingRecord, ConfirmError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ConfirmError {
    #[error("Confirmation rejected ({reason_code}): {message}")]
    Rejected { reason_code: String, message: String },

    #[error("Confirmation request failed: {0}")]
    Transport(String),
}

impl ConfirmError {
    pub fn is_expiry_related(&self) -> bool {
        matches!(self, ConfirmError::Rejected { reason_code, .. } if reason_code == REASON_HOLD_EXPIRED)
    }
}

impl Classified for ConfirmError {
    fn class(&self) -> ErrorClass {
        match self {
            ConfirmError::Rejected { .. } => ErrorClass::BusinessRejection,
            ConfirmError::Transport(_) => ErrorClass::TransientRemote,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_reason_detection() {
        let err = ConfirmError::Rejected {
            reason_code: REASON_HOLD_EXPIRED.to_string(),
            message: "hold lapsed".to_string(),
        };
        assert!(err.is_expiry_related());

        let err = ConfirmError::Rejected {
            reason_code: "AMOUNT_MISMATCH".to_string(),
            message: "amount does not match order".to_string(),
        };
        assert!(!err.is_expiry_related());
    }
}
