use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use seatline_core::booking::{BookingConfirmer, BookingRecord, ConfirmError, ConfirmationRequest};

use crate::http::RestClient;

#[derive(Clone)]
pub struct HttpBookingConfirmer {
    rest: RestClient,
}

#[derive(Debug, Deserialize)]
struct ConfirmationData {
    confirmation_code: String,
    booked_at: Option<DateTime<Utc>>,
}

impl HttpBookingConfirmer {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }
}

#[async_trait]
impl BookingConfirmer for HttpBookingConfirmer {
    async fn confirm(&self, request: &ConfirmationRequest) -> Result<BookingRecord, ConfirmError> {
        // The endpoint keys on (hold_id, payment_id); resending the
        // identical body is safe. Retry policy lives with the caller, which
        // owns that pair.
        let envelope = self
            .rest
            .post::<_, ConfirmationData>("/v1/bookings/confirm", request)
            .await
            .map_err(|e| ConfirmError::Transport(e.to_string()))?;

        if !envelope.success {
            return Err(ConfirmError::Rejected {
                reason_code: envelope
                    .code
                    .clone()
                    .unwrap_or_else(|| "CONFIRMATION_FAILED".to_string()),
                message: envelope.reason(),
            });
        }

        let data = envelope
            .data
            .ok_or_else(|| ConfirmError::Transport("confirmation response missing data".into()))?;

        info!(
            "Booking confirmed: {} for hold {} / payment {}",
            data.confirmation_code, request.hold_id, request.payment_id
        );

        Ok(BookingRecord {
            confirmation_code: data.confirmation_code,
            hold_id: request.hold_id.clone(),
            payment_id: request.payment_id.clone(),
            gateway_order_ref: request.gateway_order_ref.clone(),
            amount_charged: request.amount,
            currency: request.currency.clone(),
            booked_at: data.booked_at.unwrap_or_else(Utc::now),
        })
    }
}
