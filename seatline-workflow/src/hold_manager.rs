use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use seatline_core::error::{Classified, ErrorClass};
use seatline_core::hold::{HoldError, HoldService, SeatHold};
use seatline_core::manifest::Passenger;

/// Requests time-boxed exclusive holds on behalf of a passenger manifest.
///
/// The remote inventory system is the source of truth; it may reject seats
/// the stale snapshot showed as available. What this manager guarantees is
/// that no malformed request goes out, and that no malformed hold comes
/// back in: a hold is accepted only if it covers exactly the requested
/// seats and its expiry is in the future.
pub struct SeatHoldManager {
    service: Arc<dyn HoldService>,
    max_seats: usize,
}

impl SeatHoldManager {
    pub fn new(service: Arc<dyn HoldService>, max_seats: usize) -> Self {
        Self { service, max_seats }
    }

    pub async fn request(
        &self,
        trip_id: &str,
        seat_ids: &[String],
        manifest: &[Passenger],
    ) -> Result<SeatHold, HoldManagerError> {
        self.validate_request(seat_ids, manifest)?;

        let hold = self.service.request_hold(trip_id, seat_ids, manifest).await?;

        // No partial holds: the remote response must cover exactly what
        // was asked for.
        if !hold.covers_exactly(seat_ids) {
            warn!(
                "Hold {} covers [{}], requested [{}]; rejecting",
                hold.hold_id,
                hold.seat_ids.join(", "),
                seat_ids.join(", ")
            );
            return Err(HoldManagerError::CoverageMismatch);
        }

        let now = Utc::now();
        if hold.is_expired(now) {
            return Err(HoldManagerError::ExpiredOnArrival);
        }

        // A granted hold must end as a booking or expire; either way the
        // caller knows until when the seats stay held.
        info!(
            "Hold {} on trip {} for {} seats, expires {}",
            hold.hold_id,
            trip_id,
            hold.seat_ids.len(),
            hold.expires_at
        );
        Ok(hold)
    }

    fn validate_request(
        &self,
        seat_ids: &[String],
        manifest: &[Passenger],
    ) -> Result<(), HoldManagerError> {
        if seat_ids.is_empty() {
            return Err(HoldManagerError::NoSeatsSelected);
        }
        if seat_ids.len() > self.max_seats {
            return Err(HoldManagerError::TooManySeats {
                requested: seat_ids.len(),
                limit: self.max_seats,
            });
        }

        let mut seen = HashSet::new();
        for id in seat_ids {
            if !seen.insert(id.as_str()) {
                return Err(HoldManagerError::DuplicateSeat(id.clone()));
            }
        }

        if manifest.len() != seat_ids.len() {
            return Err(HoldManagerError::ManifestMismatch {
                seats: seat_ids.len(),
                passengers: manifest.len(),
            });
        }

        for (index, passenger) in manifest.iter().enumerate() {
            passenger
                .validate()
                .map_err(|reason| HoldManagerError::InvalidPassenger { index, reason })?;
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HoldManagerError {
    #[error("No seats selected")]
    NoSeatsSelected,

    #[error("{requested} seats requested, limit is {limit}")]
    TooManySeats { requested: usize, limit: usize },

    #[error("Seat {0} appears more than once in the selection")]
    DuplicateSeat(String),

    #[error("Manifest has {passengers} entries for {seats} seats")]
    ManifestMismatch { seats: usize, passengers: usize },

    #[error("Passenger {index}: {reason}")]
    InvalidPassenger { index: usize, reason: String },

    #[error("Hold does not cover the requested seats exactly")]
    CoverageMismatch,

    #[error("Hold arrived already expired")]
    ExpiredOnArrival,

    #[error(transparent)]
    Service(#[from] HoldError),
}

impl Classified for HoldManagerError {
    fn class(&self) -> ErrorClass {
        match self {
            HoldManagerError::NoSeatsSelected
            | HoldManagerError::TooManySeats { .. }
            | HoldManagerError::DuplicateSeat(_)
            | HoldManagerError::ManifestMismatch { .. }
            | HoldManagerError::InvalidPassenger { .. } => ErrorClass::Caller,
            HoldManagerError::CoverageMismatch | HoldManagerError::ExpiredOnArrival => {
                ErrorClass::BusinessRejection
            }
            HoldManagerError::Service(e) => e.class(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{demo_manifest, MockHoldService};
    use chrono::Duration;

    fn manager(service: MockHoldService) -> SeatHoldManager {
        SeatHoldManager::new(Arc::new(service), 4)
    }

    fn seats(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_successful_hold_echoes_request() {
        let m = manager(MockHoldService::new(Duration::minutes(10)));
        let ids = seats(&["S1", "S2"]);
        let hold = m.request("trip-1", &ids, &demo_manifest(2)).await.unwrap();
        assert_eq!(hold.seat_ids, ids);
        assert!(!hold.is_expired(Utc::now()));
    }

    #[tokio::test]
    async fn test_empty_selection_rejected_without_remote_call() {
        let service = MockHoldService::new(Duration::minutes(10));
        let m = SeatHoldManager::new(Arc::new(service), 4);
        let err = m.request("trip-1", &[], &[]).await.unwrap_err();
        assert!(matches!(err, HoldManagerError::NoSeatsSelected));
        assert_eq!(err.class(), ErrorClass::Caller);
    }

    #[tokio::test]
    async fn test_seat_limit_enforced() {
        let m = manager(MockHoldService::new(Duration::minutes(10)));
        let ids = seats(&["S1", "S2", "S3", "S4", "S5"]);
        let err = m.request("trip-1", &ids, &demo_manifest(5)).await.unwrap_err();
        assert!(matches!(err, HoldManagerError::TooManySeats { requested: 5, limit: 4 }));
    }

    #[tokio::test]
    async fn test_duplicate_seat_rejected() {
        let m = manager(MockHoldService::new(Duration::minutes(10)));
        let ids = seats(&["S1", "S1"]);
        let err = m.request("trip-1", &ids, &demo_manifest(2)).await.unwrap_err();
        assert!(matches!(err, HoldManagerError::DuplicateSeat(_)));
    }

    #[tokio::test]
    async fn test_manifest_length_must_match() {
        let m = manager(MockHoldService::new(Duration::minutes(10)));
        let ids = seats(&["S1", "S2"]);
        let err = m.request("trip-1", &ids, &demo_manifest(1)).await.unwrap_err();
        assert!(matches!(err, HoldManagerError::ManifestMismatch { seats: 2, passengers: 1 }));
    }

    #[tokio::test]
    async fn test_partial_hold_rejected() {
        let service = MockHoldService::new(Duration::minutes(10));
        service.push_hold_covering(&["S1"]);
        let m = manager(service);
        let ids = seats(&["S1", "S2"]);
        let err = m.request("trip-1", &ids, &demo_manifest(2)).await.unwrap_err();
        assert!(matches!(err, HoldManagerError::CoverageMismatch));
        assert_eq!(err.class(), ErrorClass::BusinessRejection);
    }

    #[tokio::test]
    async fn test_expired_on_arrival_rejected() {
        let service = MockHoldService::new(Duration::minutes(-1));
        let m = manager(service);
        let ids = seats(&["S1"]);
        let err = m.request("trip-1", &ids, &demo_manifest(1)).await.unwrap_err();
        assert!(matches!(err, HoldManagerError::ExpiredOnArrival));
    }

    #[tokio::test]
    async fn test_raced_seats_pass_through() {
        let service = MockHoldService::new(Duration::minutes(10));
        service.push_response(Err(HoldError::SeatsUnavailable {
            seat_ids: vec!["S2".to_string()],
        }));
        let m = manager(service);
        let ids = seats(&["S1", "S2"]);
        let err = m.request("trip-1", &ids, &demo_manifest(2)).await.unwrap_err();
        assert!(matches!(
            err,
            HoldManagerError::Service(HoldError::SeatsUnavailable { .. })
        ));
        assert_eq!(err.class(), ErrorClass::BusinessRejection);
    }
}
