use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{info, warn};

use seatline_core::hold::SeatHold;
use seatline_core::payment::{
    AttemptOutcome, CheckoutGateway, CheckoutRequest, CheckoutSignal, PaymentAttempt,
    PaymentError, PaymentOrders,
};

/// Drives one authorization round against the external gateway.
///
/// Order first, gateway second: a server-side order record exists before
/// the external flow is ever invoked, and a success payload counts only if
/// it names the order reference issued for this attempt. The external flow
/// reports through a one-shot channel created fresh per attempt; dropping
/// the receiver on timeout is the unsubscribe that keeps a late callback
/// from reaching a later attempt.
pub struct PaymentOrchestrator {
    orders: Arc<dyn PaymentOrders>,
    gateway: Arc<dyn CheckoutGateway>,
    checkout_timeout: Duration,
}

impl PaymentOrchestrator {
    pub fn new(
        orders: Arc<dyn PaymentOrders>,
        gateway: Arc<dyn CheckoutGateway>,
        checkout_timeout: Duration,
    ) -> Self {
        Self {
            orders,
            gateway,
            checkout_timeout,
        }
    }

    pub async fn authorize(
        &self,
        hold: &SeatHold,
        amount: i64,
        currency: &str,
    ) -> Result<PaymentAttempt, PaymentError> {
        let now = Utc::now();
        if hold.is_expired(now) {
            return Err(PaymentError::HoldExpired);
        }

        // 1. Create the server-side order before any gateway involvement
        let order = self
            .orders
            .create_order(&hold.hold_id, amount, currency)
            .await?;

        // 2. Subscribe for exactly one attempt, then hand off to the flow
        let (tx, rx) = oneshot::channel();
        let gateway = Arc::clone(&self.gateway);
        let request = CheckoutRequest {
            gateway_order_ref: order.gateway_order_ref.clone(),
            amount,
            currency: currency.to_string(),
        };
        tokio::spawn(async move {
            let signal = gateway.drive(request).await;
            // Receiver gone means the attempt timed out and unsubscribed;
            // the late signal dies here.
            let _ = tx.send(signal);
        });

        // 3. Never wait past the hold itself
        let remaining = hold.remaining(now).to_std().unwrap_or_default();
        let wait = self.checkout_timeout.min(remaining);

        let outcome = match tokio::time::timeout(wait, rx).await {
            Ok(Ok(CheckoutSignal::Success {
                payment_id,
                gateway_order_ref,
            })) => {
                if gateway_order_ref == order.gateway_order_ref {
                    info!(
                        "Payment {} authorized for order {}",
                        payment_id, order.gateway_order_ref
                    );
                    AttemptOutcome::Succeeded { payment_id }
                } else {
                    // A payload that cannot be correlated to the order just
                    // issued is not evidence of anything
                    warn!(
                        "Success callback for order {} while awaiting {}; discarding",
                        gateway_order_ref, order.gateway_order_ref
                    );
                    AttemptOutcome::GatewayError {
                        reason: "uncorrelated success callback".to_string(),
                    }
                }
            }
            Ok(Ok(CheckoutSignal::Dismissed)) => {
                info!("Checkout dismissed for order {}", order.gateway_order_ref);
                AttemptOutcome::Dismissed
            }
            Ok(Ok(CheckoutSignal::Error(reason))) => AttemptOutcome::GatewayError { reason },
            Ok(Err(_)) => AttemptOutcome::GatewayError {
                reason: "checkout flow ended without reporting".to_string(),
            },
            Err(_) => {
                warn!(
                    "Checkout for order {} timed out after {:?}",
                    order.gateway_order_ref, wait
                );
                AttemptOutcome::GatewayError {
                    reason: "checkout timed out".to_string(),
                }
            }
        };

        Ok(PaymentAttempt {
            order_id: order.order_id,
            gateway_order_ref: order.gateway_order_ref,
            amount,
            currency: currency.to_string(),
            outcome,
        })
    }
}
