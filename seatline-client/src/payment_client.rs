use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use seatline_core::payment::{PaymentError, PaymentOrder, PaymentOrders};

use crate::http::RestClient;

#[derive(Clone)]
pub struct HttpPaymentOrders {
    rest: RestClient,
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    hold_id: &'a str,
    amount: i64,
    currency: &'a str,
}

#[derive(Debug, Deserialize)]
struct OrderData {
    order_id: Uuid,
    gateway_order_ref: String,
}

impl HttpPaymentOrders {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }
}

#[async_trait]
impl PaymentOrders for HttpPaymentOrders {
    async fn create_order(
        &self,
        hold_id: &str,
        amount: i64,
        currency: &str,
    ) -> Result<PaymentOrder, PaymentError> {
        let request = CreateOrderRequest {
            hold_id,
            amount,
            currency,
        };

        let envelope = self
            .rest
            .post::<_, OrderData>("/v1/payments/orders", &request)
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        if !envelope.success {
            return Err(PaymentError::OrderRejected(envelope.reason()));
        }

        let data = envelope
            .data
            .ok_or_else(|| PaymentError::Transport("order response missing data".into()))?;

        info!(
            "Payment order {} created for hold {} ({} {})",
            data.gateway_order_ref, hold_id, amount, currency
        );

        Ok(PaymentOrder {
            order_id: data.order_id,
            gateway_order_ref: data.gateway_order_ref,
            amount,
            currency: currency.to_string(),
            created_at: Utc::now(),
        })
    }
}
