use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{Classified, ErrorClass};
use crate::manifest::Passenger;

/// A time-boxed exclusive reservation on specific seats, issued by the
/// remote inventory system. Mutable only by expiring or being consumed
/// into a booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatHold {
    pub hold_id: String,
    pub trip_id: String,
    pub seat_ids: Vec<String>,
    pub manifest: Vec<Passenger>,
    pub expires_at: DateTime<Utc>,
}

impl SeatHold {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Time left on the hold, clamped at zero.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).max(Duration::zero())
    }

    /// True if the hold covers exactly the requested seats: same set, no
    /// partial holds, nothing extra. Order-insensitive.
    pub fn covers_exactly(&self, requested: &[String]) -> bool {
        if self.seat_ids.len() != requested.len() {
            return false;
        }
        let held: HashSet<&str> = self.seat_ids.iter().map(String::as_str).collect();
        requested.iter().all(|id| held.contains(id.as_str()))
    }
}

#[async_trait]
pub trait HoldService: Send + Sync {
    async fn request_hold(
        &self,
        trip_id: &str,
        seat_ids: &[String],
        manifest: &[Passenger],
    ) -> Result<SeatHold, HoldError>;
}

#[derive(Debug, thiserror::Error)]
pub enum HoldError {
    /// One or more seats raced away between the snapshot and the hold
    /// request. The caller must re-fetch the layout and re-select.
    #[error("Seats no longer available: {}", seat_ids.join(", "))]
    SeatsUnavailable { seat_ids: Vec<String> },

    #[error("Hold rejected: {0}")]
    Rejected(String),

    #[error("Hold request failed: {0}")]
    Transport(String),
}

impl Classified for HoldError {
    fn class(&self) -> ErrorClass {
        match self {
            HoldError::SeatsUnavailable { .. } | HoldError::Rejected(_) => {
                ErrorClass::BusinessRejection
            }
            HoldError::Transport(_) => ErrorClass::TransientRemote,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hold(seat_ids: &[&str], ttl_minutes: i64) -> SeatHold {
        SeatHold {
            hold_id: "hold-1".to_string(),
            trip_id: "trip-1".to_string(),
            seat_ids: seat_ids.iter().map(|s| s.to_string()).collect(),
            manifest: vec![],
            expires_at: Utc::now() + Duration::minutes(ttl_minutes),
        }
    }

    #[test]
    fn test_expiry_clock() {
        let h = hold(&["S1"], 10);
        let now = Utc::now();
        assert!(!h.is_expired(now));
        assert!(h.remaining(now) > Duration::minutes(9));
        assert!(h.is_expired(h.expires_at));
        assert_eq!(h.remaining(h.expires_at + Duration::minutes(1)), Duration::zero());
    }

    #[test]
    fn test_covers_exactly_is_order_insensitive() {
        let h = hold(&["S1", "S2"], 10);
        assert!(h.covers_exactly(&["S2".to_string(), "S1".to_string()]));
    }

    #[test]
    fn test_covers_exactly_rejects_partial_and_superset() {
        let h = hold(&["S1"], 10);
        assert!(!h.covers_exactly(&["S1".to_string(), "S2".to_string()]));

        let h = hold(&["S1", "S2", "S3"], 10);
        assert!(!h.covers_exactly(&["S1".to_string(), "S2".to_string()]));
    }
}
