use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use seatline_core::search::{InventorySearch, SearchCriteria, SearchError, TripOption};

use crate::http::RestClient;

#[derive(Clone)]
pub struct HttpInventorySearch {
    rest: RestClient,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    origin: &'a str,
    destination: &'a str,
    date: NaiveDate,
    passengers: u32,
}

impl HttpInventorySearch {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }
}

#[async_trait]
impl InventorySearch for HttpInventorySearch {
    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<TripOption>, SearchError> {
        let request = SearchRequest {
            origin: &criteria.origin,
            destination: &criteria.destination,
            date: criteria.travel_date,
            passengers: criteria.passengers,
        };

        let envelope = self
            .rest
            .post_with_retry::<_, Vec<TripOption>>("/v1/trips/search", &request)
            .await
            .map_err(|e| SearchError::Transport(e.to_string()))?;

        if !envelope.success {
            return Err(SearchError::Unavailable(envelope.reason()));
        }

        // Empty data is a successful search that matched nothing
        let trips = envelope.data.unwrap_or_default();
        info!(
            "Search {} -> {} on {}: {} trips",
            criteria.origin,
            criteria.destination,
            criteria.travel_date,
            trips.len()
        );
        Ok(trips)
    }
}
