use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use seatline_core::payment::{CheckoutGateway, CheckoutRequest, CheckoutSignal};

use crate::config::GatewayConfig;
use crate::http::RestClient;

const STATUS_AUTHORIZED: &str = "AUTHORIZED";
const STATUS_DISMISSED: &str = "DISMISSED";
const STATUS_FAILED: &str = "FAILED";

const MAX_CONSECUTIVE_POLL_FAILURES: u32 = 5;

/// The authorization UI runs outside this process, in the gateway's hosted
/// page. This adapter surfaces the page location, then watches the order's
/// status until the gateway reports a terminal state. It emits exactly one
/// signal per invocation.
pub struct PollingCheckoutGateway {
    rest: RestClient,
    key_id: String,
    poll_interval: Duration,
    deadline: Duration,
}

#[derive(Debug, Deserialize)]
struct CheckoutStatusData {
    status: String,
    payment_id: Option<String>,
}

impl PollingCheckoutGateway {
    pub fn new(rest: RestClient, gateway: &GatewayConfig, checkout_timeout_secs: u64) -> Self {
        Self {
            rest,
            key_id: gateway.key_id.clone(),
            poll_interval: Duration::from_millis(gateway.poll_interval_ms),
            deadline: Duration::from_secs(checkout_timeout_secs),
        }
    }
}

#[async_trait]
impl CheckoutGateway for PollingCheckoutGateway {
    async fn drive(&self, request: CheckoutRequest) -> CheckoutSignal {
        info!(
            "Complete payment of {} {} at /checkout/{}?key={}",
            request.amount, request.currency, request.gateway_order_ref, self.key_id
        );

        let started = Instant::now();
        let mut poll_failures = 0u32;

        loop {
            if started.elapsed() >= self.deadline {
                return CheckoutSignal::Error("checkout timed out".to_string());
            }
            tokio::time::sleep(self.poll_interval).await;

            let path = format!("/v1/payments/orders/{}/status", request.gateway_order_ref);
            let envelope = match self.rest.get::<CheckoutStatusData>(&path).await {
                Ok(envelope) => {
                    poll_failures = 0;
                    envelope
                }
                Err(e) => {
                    poll_failures += 1;
                    warn!(
                        "Checkout status poll failed ({}/{}): {}",
                        poll_failures, MAX_CONSECUTIVE_POLL_FAILURES, e
                    );
                    if poll_failures >= MAX_CONSECUTIVE_POLL_FAILURES {
                        return CheckoutSignal::Error(format!("status polling failed: {}", e));
                    }
                    continue;
                }
            };

            if !envelope.success {
                return CheckoutSignal::Error(envelope.reason());
            }

            let data = match envelope.data {
                Some(data) => data,
                None => continue,
            };

            match data.status.as_str() {
                STATUS_AUTHORIZED => {
                    let payment_id = match data.payment_id {
                        Some(id) => id,
                        None => {
                            return CheckoutSignal::Error(
                                "authorized status without a payment id".to_string(),
                            )
                        }
                    };
                    return CheckoutSignal::Success {
                        payment_id,
                        gateway_order_ref: request.gateway_order_ref.clone(),
                    };
                }
                STATUS_DISMISSED => return CheckoutSignal::Dismissed,
                STATUS_FAILED => {
                    return CheckoutSignal::Error(format!(
                        "gateway reported failure for order {}",
                        request.gateway_order_ref
                    ))
                }
                // PENDING or anything newer: keep watching
                _ => continue,
            }
        }
    }
}
