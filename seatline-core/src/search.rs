use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Classified, ErrorClass};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchCriteria {
    pub origin: String,
    pub destination: String,
    pub travel_date: NaiveDate,
    pub passengers: u32,
}

impl SearchCriteria {
    /// Caller-side validation. Runs before any network call.
    pub fn validate(&self, today: NaiveDate, max_passengers: u32) -> Result<(), SearchError> {
        if self.origin.trim().is_empty() {
            return Err(SearchError::InvalidCriteria("origin is required".into()));
        }
        if self.destination.trim().is_empty() {
            return Err(SearchError::InvalidCriteria("destination is required".into()));
        }
        if self.origin.trim().eq_ignore_ascii_case(self.destination.trim()) {
            return Err(SearchError::InvalidCriteria(
                "origin and destination must differ".into(),
            ));
        }
        if self.travel_date < today {
            return Err(SearchError::InvalidCriteria(format!(
                "travel date {} is in the past",
                self.travel_date
            )));
        }
        if self.passengers == 0 || self.passengers > max_passengers {
            return Err(SearchError::InvalidCriteria(format!(
                "passenger count must be between 1 and {}",
                max_passengers
            )));
        }
        Ok(())
    }
}

/// One bookable scheduled run, as returned by the inventory system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripOption {
    pub trip_id: String,
    pub operator: String,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub seat_map_ref: String,
    pub base_fare: i64,
    pub currency: String,
    pub rating: Option<f32>,
}

/// An empty result set is a successful search (`Ok(vec![])`), not an error.
#[async_trait]
pub trait InventorySearch: Send + Sync {
    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<TripOption>, SearchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Invalid search criteria: {0}")]
    InvalidCriteria(String),

    #[error("Search could not be performed: {0}")]
    Unavailable(String),

    #[error("Search request failed: {0}")]
    Transport(String),
}

impl Classified for SearchError {
    fn class(&self) -> ErrorClass {
        match self {
            SearchError::InvalidCriteria(_) => ErrorClass::Caller,
            SearchError::Unavailable(_) | SearchError::Transport(_) => ErrorClass::TransientRemote,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criteria() -> SearchCriteria {
        SearchCriteria {
            origin: "Pune".to_string(),
            destination: "Mumbai".to_string(),
            travel_date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            passengers: 2,
        }
    }

    #[test]
    fn test_valid_criteria() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        assert!(criteria().validate(today, 6).is_ok());
    }

    #[test]
    fn test_past_date_rejected() {
        let today = NaiveDate::from_ymd_opt(2026, 9, 2).unwrap();
        let err = criteria().validate(today, 6).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Caller);
    }

    #[test]
    fn test_same_endpoints_rejected() {
        let mut c = criteria();
        c.destination = "pune".to_string();
        let today = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        assert!(c.validate(today, 6).is_err());
    }

    #[test]
    fn test_passenger_bounds() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        let mut c = criteria();
        c.passengers = 0;
        assert!(c.validate(today, 6).is_err());
        c.passengers = 7;
        assert!(c.validate(today, 6).is_err());
    }

    #[test]
    fn test_trip_option_deserialization() {
        let json = r#"
            {
                "trip_id": "trip-991",
                "operator": "Skyline Travels",
                "origin": "Pune",
                "destination": "Mumbai",
                "departure_time": "2026-09-01T06:30:00Z",
                "arrival_time": "2026-09-01T10:00:00Z",
                "seat_map_ref": "layout-44",
                "base_fare": 55000,
                "currency": "INR",
                "rating": 4.3
            }
        "#;
        let trip: TripOption = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(trip.trip_id, "trip-991");
        assert_eq!(trip.base_fare, 55000);
    }
}
