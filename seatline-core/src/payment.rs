use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Classified, ErrorClass};

/// Server-side order record, created before the external checkout flow is
/// ever invoked. The gateway reference is the correlation token: a success
/// callback is only evidence of authorization on the order it names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOrder {
    pub order_id: Uuid,
    pub gateway_order_ref: String,
    pub amount: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptOutcome {
    Succeeded { payment_id: String },
    Dismissed,
    GatewayError { reason: String },
}

impl AttemptOutcome {
    pub fn is_succeeded(&self) -> bool {
        matches!(self, AttemptOutcome::Succeeded { .. })
    }

    pub fn payment_id(&self) -> Option<&str> {
        match self {
            AttemptOutcome::Succeeded { payment_id } => Some(payment_id),
            _ => None,
        }
    }
}

/// One round of authorization against the gateway for a given order.
/// Exactly one attempt is in flight per hold at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentAttempt {
    pub order_id: Uuid,
    pub gateway_order_ref: String,
    pub amount: i64,
    pub currency: String,
    pub outcome: AttemptOutcome,
}

/// Hand-off payload for the external authorization UI.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutRequest {
    pub gateway_order_ref: String,
    pub amount: i64,
    pub currency: String,
}

/// What the external flow eventually reports back. Untrusted until the
/// confirmation endpoint independently verifies it server-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutSignal {
    Success {
        payment_id: String,
        gateway_order_ref: String,
    },
    Dismissed,
    Error(String),
}

#[async_trait]
pub trait PaymentOrders: Send + Sync {
    async fn create_order(
        &self,
        hold_id: &str,
        amount: i64,
        currency: &str,
    ) -> Result<PaymentOrder, PaymentError>;
}

/// The third-party checkout flow as a black box: drive it for one order
/// and report the terminal signal. The orchestrator owns correlation and
/// timeout; implementations must report exactly once per invocation.
#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    async fn drive(&self, request: CheckoutRequest) -> CheckoutSignal;
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Hold has expired; payment cannot be started")]
    HoldExpired,

    #[error("Payment order rejected: {0}")]
    OrderRejected(String),

    #[error("Payment order request failed: {0}")]
    Transport(String),
}

impl Classified for PaymentError {
    fn class(&self) -> ErrorClass {
        match self {
            PaymentError::HoldExpired | PaymentError::OrderRejected(_) => {
                ErrorClass::BusinessRejection
            }
            PaymentError::Transport(_) => ErrorClass::TransientRemote,
        }
    }
}
