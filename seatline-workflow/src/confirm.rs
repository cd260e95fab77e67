use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use seatline_core::booking::{BookingConfirmer, BookingRecord, ConfirmError, ConfirmationRequest};
use seatline_core::error::{Classified, ErrorClass};
use seatline_core::hold::SeatHold;
use seatline_core::payment::PaymentAttempt;

/// Exchanges a hold plus payment proof for the durable booking record.
///
/// The confirmation endpoint keys on `(hold_id, payment_id)`, so the one
/// request built here is resent byte-identical on transport failures; a
/// client-side timeout followed by a retry must not mint a new pair.
pub struct BookingConfirmationService {
    confirmer: Arc<dyn BookingConfirmer>,
    retry_attempts: u32,
    retry_backoff: Duration,
}

impl BookingConfirmationService {
    pub fn new(
        confirmer: Arc<dyn BookingConfirmer>,
        retry_attempts: u32,
        retry_backoff: Duration,
    ) -> Self {
        Self {
            confirmer,
            retry_attempts,
            retry_backoff,
        }
    }

    pub async fn confirm(
        &self,
        hold: &SeatHold,
        attempt: &PaymentAttempt,
    ) -> Result<BookingRecord, ConfirmServiceError> {
        let payment_id = attempt
            .outcome
            .payment_id()
            .ok_or(ConfirmServiceError::PaymentNotSettled)?;

        let request = ConfirmationRequest {
            hold_id: hold.hold_id.clone(),
            payment_id: payment_id.to_string(),
            gateway_order_ref: attempt.gateway_order_ref.clone(),
            amount: attempt.amount,
            currency: attempt.currency.clone(),
        };

        let attempts = self.retry_attempts.max(1);
        let mut last = ConfirmError::Transport("confirmation not attempted".to_string());

        for n in 1..=attempts {
            match self.confirmer.confirm(&request).await {
                Ok(record) => {
                    info!(
                        "Booking {} confirmed for hold {} / payment {}",
                        record.confirmation_code, request.hold_id, request.payment_id
                    );
                    return Ok(record);
                }
                Err(ConfirmError::Transport(reason)) => {
                    warn!(
                        "Confirmation attempt {}/{} lost in transit ({}); resending identical request",
                        n, attempts, reason
                    );
                    last = ConfirmError::Transport(reason);
                    if n < attempts {
                        tokio::time::sleep(self.retry_backoff).await;
                    }
                }
                // A rejection is an answer, not a transport fault
                Err(rejected) => return Err(ConfirmServiceError::Service(rejected)),
            }
        }

        Err(ConfirmServiceError::Service(last))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfirmServiceError {
    #[error("Payment attempt has not succeeded; nothing to confirm")]
    PaymentNotSettled,

    #[error(transparent)]
    Service(#[from] ConfirmError),
}

impl Classified for ConfirmServiceError {
    fn class(&self) -> ErrorClass {
        match self {
            ConfirmServiceError::PaymentNotSettled => ErrorClass::Caller,
            ConfirmServiceError::Service(e) => e.class(),
        }
    }
}
