use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Classified, ErrorClass};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatCategory {
    Seater,
    Sleeper,
    UpperBerth,
    LowerBerth,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatStatus {
    Available,
    HeldByOther,
    Booked,
    SelectedByMe,
}

/// One addressable seat in a trip's layout. A fetched seat map is a
/// snapshot; it may be stale relative to server truth, and staleness is
/// resolved only at hold time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seat {
    pub id: String,
    pub category: SeatCategory,
    pub fare: i64,
    pub status: SeatStatus,
}

impl Seat {
    pub fn is_selectable(&self) -> bool {
        self.status == SeatStatus::Available
    }
}

/// Sum of fares for the named seats, per the current snapshot.
pub fn fare_total(seats: &[Seat], seat_ids: &[String]) -> i64 {
    seats
        .iter()
        .filter(|s| seat_ids.contains(&s.id))
        .map(|s| s.fare)
        .sum()
}

#[async_trait]
pub trait SeatMapSource: Send + Sync {
    async fn fetch_seat_map(&self, trip_id: &str) -> Result<Vec<Seat>, SeatMapError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SeatMapError {
    #[error("Seat map unavailable: {0}")]
    Unavailable(String),

    #[error("Seat map request failed: {0}")]
    Transport(String),
}

impl Classified for SeatMapError {
    fn class(&self) -> ErrorClass {
        ErrorClass::TransientRemote
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seat(id: &str, fare: i64, status: SeatStatus) -> Seat {
        Seat {
            id: id.to_string(),
            category: SeatCategory::Seater,
            fare,
            status,
        }
    }

    #[test]
    fn test_fare_total_only_counts_named_seats() {
        let seats = vec![
            seat("S1", 40000, SeatStatus::Available),
            seat("S2", 45000, SeatStatus::Available),
            seat("S3", 60000, SeatStatus::Booked),
        ];
        let total = fare_total(&seats, &["S1".to_string(), "S2".to_string()]);
        assert_eq!(total, 85000);
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&SeatStatus::HeldByOther).unwrap();
        assert_eq!(json, "\"HELD_BY_OTHER\"");
    }
}
