use async_trait::async_trait;
use tracing::debug;

use seatline_core::seatmap::{Seat, SeatMapError, SeatMapSource};

use crate::http::RestClient;

#[derive(Clone)]
pub struct HttpSeatMapSource {
    rest: RestClient,
}

impl HttpSeatMapSource {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }
}

#[async_trait]
impl SeatMapSource for HttpSeatMapSource {
    async fn fetch_seat_map(&self, trip_id: &str) -> Result<Vec<Seat>, SeatMapError> {
        let envelope = self
            .rest
            .get_with_retry::<Vec<Seat>>(&format!("/v1/trips/{}/seat-map", trip_id))
            .await
            .map_err(|e| SeatMapError::Transport(e.to_string()))?;

        if !envelope.success {
            return Err(SeatMapError::Unavailable(envelope.reason()));
        }

        let seats = envelope
            .data
            .ok_or_else(|| SeatMapError::Unavailable("seat map response missing data".into()))?;
        debug!("Seat map for trip {}: {} seats", trip_id, seats.len());
        Ok(seats)
    }
}
