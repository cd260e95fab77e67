use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use seatline_core::hold::{HoldError, HoldService, SeatHold};
use seatline_core::manifest::Passenger;

use crate::http::RestClient;

const CODE_SEATS_UNAVAILABLE: &str = "SEATS_UNAVAILABLE";

#[derive(Clone)]
pub struct HttpHoldService {
    rest: RestClient,
}

#[derive(Debug, Serialize)]
struct HoldRequest<'a> {
    trip_id: &'a str,
    seat_ids: &'a [String],
    passengers: &'a [Passenger],
}

#[derive(Debug, Deserialize)]
struct HoldData {
    hold_id: String,
    seat_ids: Vec<String>,
    expires_at: DateTime<Utc>,
}

impl HttpHoldService {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }
}

#[async_trait]
impl HoldService for HttpHoldService {
    async fn request_hold(
        &self,
        trip_id: &str,
        seat_ids: &[String],
        manifest: &[Passenger],
    ) -> Result<SeatHold, HoldError> {
        let request = HoldRequest {
            trip_id,
            seat_ids,
            passengers: manifest,
        };

        // Never auto-retried: a timed-out hold request may have placed a
        // real reservation server-side.
        let envelope = self
            .rest
            .post::<_, HoldData>("/v1/holds", &request)
            .await
            .map_err(|e| HoldError::Transport(e.to_string()))?;

        if !envelope.success {
            return Err(match envelope.code.as_deref() {
                Some(CODE_SEATS_UNAVAILABLE) => HoldError::SeatsUnavailable {
                    seat_ids: seat_ids.to_vec(),
                },
                _ => HoldError::Rejected(envelope.reason()),
            });
        }

        let data = envelope
            .data
            .ok_or_else(|| HoldError::Transport("hold response missing data".into()))?;

        info!(
            "Hold {} placed on trip {} for seats [{}], expires {}",
            data.hold_id,
            trip_id,
            data.seat_ids.join(", "),
            data.expires_at
        );

        Ok(SeatHold {
            hold_id: data.hold_id,
            trip_id: trip_id.to_string(),
            seat_ids: data.seat_ids,
            manifest: manifest.to_vec(),
            expires_at: data.expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ApiEnvelope;

    #[test]
    fn test_hold_data_deserialization() {
        let json = r#"
            {
                "success": true,
                "data": {
                    "hold_id": "hold-7781",
                    "seat_ids": ["S3", "S4"],
                    "expires_at": "2026-09-01T06:45:00Z"
                }
            }
        "#;
        let envelope: ApiEnvelope<HoldData> = serde_json::from_str(json).unwrap();
        let data = envelope.data.unwrap();
        assert_eq!(data.hold_id, "hold-7781");
        assert_eq!(data.seat_ids, vec!["S3", "S4"]);
    }

    #[test]
    fn test_unavailable_code_maps_to_variant() {
        let json = r#"{"success": false, "message": "raced", "code": "SEATS_UNAVAILABLE"}"#;
        let envelope: ApiEnvelope<HoldData> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.code.as_deref(), Some(CODE_SEATS_UNAVAILABLE));
    }
}
