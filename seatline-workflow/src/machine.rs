use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore, SemaphorePermit};
use tracing::{info, warn};

use seatline_core::booking::BookingRecord;
use seatline_core::error::{Classified, ErrorClass};
use seatline_core::hold::{HoldError, SeatHold};
use seatline_core::manifest::{Passenger, UserContext};
use seatline_core::payment::{AttemptOutcome, PaymentAttempt, PaymentError};
use seatline_core::search::{InventorySearch, SearchCriteria, SearchError, TripOption};
use seatline_core::seatmap::{fare_total, Seat, SeatMapError, SeatMapSource};

use crate::confirm::BookingConfirmationService;
use crate::hold_manager::{HoldManagerError, SeatHoldManager};
use crate::payment::PaymentOrchestrator;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Search,
    Results,
    SeatSelection,
    Payment,
    Confirmation,
    Failed,
}

/// Everything the workflow has accumulated, keyed by stage. Components
/// never touch this; they return values and the workflow folds them in.
enum FlowState {
    Search,
    Results {
        criteria: SearchCriteria,
        trips: Vec<TripOption>,
    },
    SeatSelection {
        criteria: SearchCriteria,
        trips: Vec<TripOption>,
        trip: TripOption,
        seat_map: Vec<Seat>,
    },
    Payment {
        trip: TripOption,
        hold: SeatHold,
        total_due: i64,
        currency: String,
        last_outcome: Option<AttemptOutcome>,
        /// A succeeded attempt whose confirmation has not landed yet.
        /// While set, the only way forward is retrying confirmation with
        /// the identical pair.
        settled: Option<PaymentAttempt>,
    },
    Confirmation {
        record: BookingRecord,
    },
    Failed {
        stage: Stage,
        reason: String,
    },
}

impl FlowState {
    fn stage(&self) -> Stage {
        match self {
            FlowState::Search => Stage::Search,
            FlowState::Results { .. } => Stage::Results,
            FlowState::SeatSelection { .. } => Stage::SeatSelection,
            FlowState::Payment { .. } => Stage::Payment,
            FlowState::Confirmation { .. } => Stage::Confirmation,
            FlowState::Failed { .. } => Stage::Failed,
        }
    }
}

/// Read-only projection for the surrounding UI layer.
#[derive(Debug, Clone, Serialize)]
pub struct StateView {
    pub stage: Stage,
    pub criteria: Option<SearchCriteria>,
    pub trips: Vec<TripOption>,
    pub selected_trip: Option<TripOption>,
    pub seat_map: Vec<Seat>,
    pub held_seats: Vec<String>,
    pub hold_expires_at: Option<DateTime<Utc>>,
    pub total_due: Option<i64>,
    pub currency: Option<String>,
    /// Terminal outcome of the last authorization round, if it failed.
    pub last_payment_outcome: Option<AttemptOutcome>,
    /// Funds may already be captured; confirmation retry is the only move.
    pub awaiting_confirmation: bool,
    pub booking: Option<BookingRecord>,
    pub failure: Option<FailureView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureView {
    pub stage: Stage,
    pub reason: String,
}

/// What `reset` abandoned, so the caller can tell the user instead of the
/// workflow swallowing it.
#[derive(Debug, Clone, Serialize)]
pub struct ResetNotice {
    pub seats_held_until: Option<DateTime<Utc>>,
    pub payment_pending_confirmation: bool,
}

pub struct Collaborators {
    pub search: Arc<dyn InventorySearch>,
    pub seat_maps: Arc<dyn SeatMapSource>,
    pub holds: SeatHoldManager,
    pub payments: PaymentOrchestrator,
    pub confirmations: BookingConfirmationService,
}

/// The booking workflow: search -> results -> seat selection -> payment ->
/// confirmation, strictly forward except for the two sanctioned backward
/// edges before a hold exists, and `reset`.
///
/// All mutating operations are serialized through a single-permit gate: a
/// second call while one is outstanding is rejected synchronously rather
/// than queued, so a doubly-fired user action cannot place two holds or two
/// charge attempts. `state()` is never gated.
pub struct BookingWorkflow {
    inventory: Arc<dyn InventorySearch>,
    seat_maps: Arc<dyn SeatMapSource>,
    holds: SeatHoldManager,
    payments: PaymentOrchestrator,
    confirmations: BookingConfirmationService,
    user: UserContext,
    max_passengers: u32,
    state: Mutex<FlowState>,
    gate: Semaphore,
}

impl BookingWorkflow {
    pub fn new(collab: Collaborators, user: UserContext, max_passengers: u32) -> Self {
        Self {
            inventory: collab.search,
            seat_maps: collab.seat_maps,
            holds: collab.holds,
            payments: collab.payments,
            confirmations: collab.confirmations,
            user,
            max_passengers,
            state: Mutex::new(FlowState::Search),
            gate: Semaphore::new(1),
        }
    }

    pub async fn state(&self) -> StateView {
        let state = self.state.lock().await;
        project(&state)
    }

    pub async fn search(&self, criteria: SearchCriteria) -> Result<StateView, WorkflowError> {
        let _permit = self.begin()?;

        {
            let state = self.state.lock().await;
            match &*state {
                FlowState::Search | FlowState::Results { .. } => {}
                other => {
                    return Err(WorkflowError::InvalidTransition {
                        stage: other.stage(),
                        action: "search",
                    })
                }
            }
        }

        criteria.validate(Utc::now().date_naive(), self.max_passengers)?;

        let trips = self.inventory.search(&criteria).await?;
        if trips.is_empty() {
            info!(
                "No trips matched {} -> {} on {}",
                criteria.origin, criteria.destination, criteria.travel_date
            );
        }

        let mut state = self.state.lock().await;
        *state = FlowState::Results { criteria, trips };
        Ok(project(&state))
    }

    pub async fn select_trip(&self, trip_id: &str) -> Result<StateView, WorkflowError> {
        let _permit = self.begin()?;

        let (criteria, trips, trip) = {
            let state = self.state.lock().await;
            match &*state {
                FlowState::Results { criteria, trips } => {
                    let trip = trips
                        .iter()
                        .find(|t| t.trip_id == trip_id)
                        .cloned()
                        .ok_or_else(|| WorkflowError::UnknownTrip(trip_id.to_string()))?;
                    (criteria.clone(), trips.clone(), trip)
                }
                other => {
                    return Err(WorkflowError::InvalidTransition {
                        stage: other.stage(),
                        action: "select_trip",
                    })
                }
            }
        };

        // Seat selection never proceeds without a layout
        let seat_map = self.seat_maps.fetch_seat_map(&trip.trip_id).await?;

        let mut state = self.state.lock().await;
        *state = FlowState::SeatSelection {
            criteria,
            trips,
            trip,
            seat_map,
        };
        Ok(project(&state))
    }

    /// `SeatSelection -> Results`, legal only while no hold exists. That
    /// is every `SeatSelection` state, since a granted hold moves straight
    /// to `Payment`.
    pub async fn back_to_results(&self) -> Result<StateView, WorkflowError> {
        let _permit = self.begin()?;
        let mut state = self.state.lock().await;

        let next = match &*state {
            FlowState::SeatSelection {
                criteria, trips, ..
            } => FlowState::Results {
                criteria: criteria.clone(),
                trips: trips.clone(),
            },
            other => {
                return Err(WorkflowError::InvalidTransition {
                    stage: other.stage(),
                    action: "back_to_results",
                })
            }
        };
        *state = next;
        Ok(project(&state))
    }

    /// `Results -> Search` for refining the query.
    pub async fn back_to_search(&self) -> Result<StateView, WorkflowError> {
        let _permit = self.begin()?;
        let mut state = self.state.lock().await;

        match &*state {
            FlowState::Results { .. } => {
                *state = FlowState::Search;
                Ok(project(&state))
            }
            other => Err(WorkflowError::InvalidTransition {
                stage: other.stage(),
                action: "back_to_search",
            }),
        }
    }

    /// Takes the hold for the selected seats and moves to `Payment`.
    ///
    /// If the seats raced away, the layout is re-fetched automatically so
    /// the caller re-selects against server truth instead of retrying the
    /// same stale snapshot.
    pub async fn select_seats(
        &self,
        seat_ids: Vec<String>,
        manifest: Vec<Passenger>,
    ) -> Result<StateView, WorkflowError> {
        let _permit = self.begin()?;

        let (trip, seat_map) = {
            let state = self.state.lock().await;
            match &*state {
                FlowState::SeatSelection { trip, seat_map, .. } => {
                    (trip.clone(), seat_map.clone())
                }
                other => {
                    return Err(WorkflowError::InvalidTransition {
                        stage: other.stage(),
                        action: "select_seats",
                    })
                }
            }
        };

        for id in &seat_ids {
            let seat = seat_map
                .iter()
                .find(|s| s.id == *id)
                .ok_or_else(|| WorkflowError::UnknownSeat(id.clone()))?;
            if !seat.is_selectable() {
                return Err(WorkflowError::SeatNotSelectable(id.clone()));
            }
        }

        let manifest: Vec<Passenger> = manifest
            .into_iter()
            .map(|p| p.with_contact_defaults(&self.user))
            .collect();

        let total_due = fare_total(&seat_map, &seat_ids);

        match self.holds.request(&trip.trip_id, &seat_ids, &manifest).await {
            Ok(hold) => {
                let currency = trip.currency.clone();
                let mut state = self.state.lock().await;
                *state = FlowState::Payment {
                    trip,
                    hold,
                    total_due,
                    currency,
                    last_outcome: None,
                    settled: None,
                };
                Ok(project(&state))
            }
            Err(err @ HoldManagerError::Service(HoldError::SeatsUnavailable { .. })) => {
                match self.seat_maps.fetch_seat_map(&trip.trip_id).await {
                    Ok(fresh) => {
                        let mut state = self.state.lock().await;
                        if let FlowState::SeatSelection { seat_map, .. } = &mut *state {
                            *seat_map = fresh;
                        }
                    }
                    Err(e) => warn!("Seat map refresh after raced hold failed: {}", e),
                }
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Drives one authorization round and, on success, confirmation.
    pub async fn pay(&self) -> Result<StateView, WorkflowError> {
        let _permit = self.begin()?;

        let (hold, total_due, currency, settled) = {
            let state = self.state.lock().await;
            match &*state {
                FlowState::Payment {
                    hold,
                    total_due,
                    currency,
                    settled,
                    ..
                } => (hold.clone(), *total_due, currency.clone(), settled.clone()),
                other => {
                    return Err(WorkflowError::InvalidTransition {
                        stage: other.stage(),
                        action: "pay",
                    })
                }
            }
        };

        if settled.is_some() {
            // Money may already be captured; the only legal move is to
            // retry confirmation with the same pair
            return Err(WorkflowError::ConfirmationPending(
                "a settled payment is awaiting confirmation; retry confirmation instead of paying again"
                    .to_string(),
            ));
        }

        if hold.is_expired(Utc::now()) {
            return self.fail_hold_expired(&hold).await;
        }

        let attempt = match self.payments.authorize(&hold, total_due, &currency).await {
            Ok(attempt) => attempt,
            Err(PaymentError::HoldExpired) => return self.fail_hold_expired(&hold).await,
            Err(e) => return Err(e.into()),
        };

        match attempt.outcome.clone() {
            AttemptOutcome::Succeeded { .. } => self.finish_confirmation(hold, attempt).await,
            AttemptOutcome::Dismissed => {
                self.record_outcome(AttemptOutcome::Dismissed).await;
                Err(WorkflowError::CheckoutDismissed)
            }
            AttemptOutcome::GatewayError { reason } => {
                self.record_outcome(AttemptOutcome::GatewayError {
                    reason: reason.clone(),
                })
                .await;
                Err(WorkflowError::CheckoutFailed(reason))
            }
        }
    }

    /// Resends the identical `(hold_id, payment_id)` confirmation after a
    /// `ConfirmationPending` outcome. Never re-invokes the gateway.
    pub async fn retry_confirm(&self) -> Result<StateView, WorkflowError> {
        let _permit = self.begin()?;

        let (hold, attempt) = {
            let state = self.state.lock().await;
            match &*state {
                FlowState::Payment {
                    hold,
                    settled: Some(attempt),
                    ..
                } => (hold.clone(), attempt.clone()),
                FlowState::Payment { .. } => return Err(WorkflowError::NothingToConfirm),
                other => {
                    return Err(WorkflowError::InvalidTransition {
                        stage: other.stage(),
                        action: "retry_confirm",
                    })
                }
            }
        };

        self.finish_confirmation(hold, attempt).await
    }

    /// Full restart, from any stage. A live hold cannot be released early
    /// (it expires on the remote side), so the notice says what stays held.
    pub async fn reset(&self) -> Result<ResetNotice, WorkflowError> {
        let _permit = self.begin()?;
        let mut state = self.state.lock().await;

        let mut notice = ResetNotice {
            seats_held_until: None,
            payment_pending_confirmation: false,
        };

        if let FlowState::Payment { hold, settled, .. } = &*state {
            if !hold.is_expired(Utc::now()) {
                // No release call exists; the hold lapses remotely
                warn!(
                    "Restarting with hold {} still live; seats [{}] stay held until {}",
                    hold.hold_id,
                    hold.seat_ids.join(", "),
                    hold.expires_at
                );
                notice.seats_held_until = Some(hold.expires_at);
            }
            if settled.is_some() {
                warn!("Restarting with a payment awaiting confirmation; funds may be captured");
                notice.payment_pending_confirmation = true;
            }
        }

        *state = FlowState::Search;
        Ok(notice)
    }

    fn begin(&self) -> Result<SemaphorePermit<'_>, WorkflowError> {
        self.gate.try_acquire().map_err(|_| WorkflowError::Busy)
    }

    async fn fail_hold_expired(&self, hold: &SeatHold) -> Result<StateView, WorkflowError> {
        let mut state = self.state.lock().await;
        *state = FlowState::Failed {
            stage: Stage::Payment,
            reason: format!("hold {} expired before payment completed", hold.hold_id),
        };
        Err(WorkflowError::HoldExpired)
    }

    async fn record_outcome(&self, outcome: AttemptOutcome) {
        let mut state = self.state.lock().await;
        if let FlowState::Payment { last_outcome, .. } = &mut *state {
            *last_outcome = Some(outcome);
        }
    }

    async fn finish_confirmation(
        &self,
        hold: SeatHold,
        attempt: PaymentAttempt,
    ) -> Result<StateView, WorkflowError> {
        match self.confirmations.confirm(&hold, &attempt).await {
            Ok(record) => {
                info!(
                    "Booking {} confirmed; hold {} consumed",
                    record.confirmation_code, hold.hold_id
                );
                let mut state = self.state.lock().await;
                *state = FlowState::Confirmation { record };
                Ok(project(&state))
            }
            Err(err) => {
                // A success callback was received: surface pending
                // confirmation, never plain failure, and keep the identical
                // pair available for retry
                warn!(
                    "Confirmation failed after authorized payment on order {}: {}",
                    attempt.gateway_order_ref, err
                );
                let reason = err.to_string();
                let mut state = self.state.lock().await;
                if let FlowState::Payment {
                    settled,
                    last_outcome,
                    ..
                } = &mut *state
                {
                    *settled = Some(attempt);
                    *last_outcome = None;
                }
                Err(WorkflowError::ConfirmationPending(reason))
            }
        }
    }
}

fn project(state: &FlowState) -> StateView {
    let mut view = StateView {
        stage: state.stage(),
        criteria: None,
        trips: Vec::new(),
        selected_trip: None,
        seat_map: Vec::new(),
        held_seats: Vec::new(),
        hold_expires_at: None,
        total_due: None,
        currency: None,
        last_payment_outcome: None,
        awaiting_confirmation: false,
        booking: None,
        failure: None,
    };

    match state {
        FlowState::Search => {}
        FlowState::Results { criteria, trips } => {
            view.criteria = Some(criteria.clone());
            view.trips = trips.clone();
        }
        FlowState::SeatSelection {
            criteria,
            trips,
            trip,
            seat_map,
        } => {
            view.criteria = Some(criteria.clone());
            view.trips = trips.clone();
            view.selected_trip = Some(trip.clone());
            view.seat_map = seat_map.clone();
        }
        FlowState::Payment {
            trip,
            hold,
            total_due,
            currency,
            last_outcome,
            settled,
        } => {
            view.selected_trip = Some(trip.clone());
            view.held_seats = hold.seat_ids.clone();
            view.hold_expires_at = Some(hold.expires_at);
            view.total_due = Some(*total_due);
            view.currency = Some(currency.clone());
            view.last_payment_outcome = last_outcome.clone();
            view.awaiting_confirmation = settled.is_some();
        }
        FlowState::Confirmation { record } => {
            view.total_due = Some(record.amount_charged);
            view.currency = Some(record.currency.clone());
            view.booking = Some(record.clone());
        }
        FlowState::Failed { stage, reason } => {
            view.failure = Some(FailureView {
                stage: *stage,
                reason: reason.clone(),
            });
        }
    }

    view
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Another operation is already in flight")]
    Busy,

    #[error("{action} is not valid in the {stage:?} stage")]
    InvalidTransition { stage: Stage, action: &'static str },

    #[error("Unknown trip: {0}")]
    UnknownTrip(String),

    #[error("Seat {0} is not in the current layout")]
    UnknownSeat(String),

    #[error("Seat {0} is not selectable")]
    SeatNotSelectable(String),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    SeatMap(#[from] SeatMapError),

    #[error(transparent)]
    Hold(#[from] HoldManagerError),

    #[error("Hold expired; seats must be re-selected")]
    HoldExpired,

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("Checkout dismissed")]
    CheckoutDismissed,

    #[error("Checkout failed: {0}")]
    CheckoutFailed(String),

    #[error("Payment authorized but booking unconfirmed: {0}")]
    ConfirmationPending(String),

    #[error("No settled payment awaiting confirmation")]
    NothingToConfirm,
}

impl Classified for WorkflowError {
    fn class(&self) -> ErrorClass {
        match self {
            WorkflowError::Busy
            | WorkflowError::InvalidTransition { .. }
            | WorkflowError::UnknownTrip(_)
            | WorkflowError::UnknownSeat(_)
            | WorkflowError::SeatNotSelectable(_)
            | WorkflowError::NothingToConfirm => ErrorClass::Caller,
            WorkflowError::Search(e) => e.class(),
            WorkflowError::SeatMap(e) => e.class(),
            WorkflowError::Hold(e) => e.class(),
            WorkflowError::Payment(e) => e.class(),
            WorkflowError::HoldExpired => ErrorClass::BusinessRejection,
            WorkflowError::CheckoutDismissed | WorkflowError::CheckoutFailed(_) => {
                ErrorClass::PaymentNotCompleted
            }
            WorkflowError::ConfirmationPending(_) => ErrorClass::ConfirmationAmbiguous,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{
        demo_seats, demo_trips, demo_user, MockBookingConfirmer, MockCheckoutGateway,
        MockHoldService, MockInventorySearch, MockPaymentOrders, MockSeatMapSource, ScriptedSignal,
    };
    use chrono::{Duration as ChronoDuration, NaiveDate};
    use std::time::Duration;

    fn criteria() -> SearchCriteria {
        SearchCriteria {
            origin: "Pune".to_string(),
            destination: "Mumbai".to_string(),
            travel_date: Utc::now().date_naive() + ChronoDuration::days(7),
            passengers: 2,
        }
    }

    fn workflow_with(gateway: Arc<MockCheckoutGateway>, checkout_timeout: Duration) -> BookingWorkflow {
        let seat_maps = Arc::new(MockSeatMapSource::new());
        seat_maps.set_seats("trip-101", demo_seats());
        seat_maps.set_seats("trip-102", demo_seats());

        let collab = Collaborators {
            search: Arc::new(MockInventorySearch::new(demo_trips())),
            seat_maps,
            holds: SeatHoldManager::new(
                Arc::new(MockHoldService::new(ChronoDuration::minutes(10))),
                6,
            ),
            payments: PaymentOrchestrator::new(
                Arc::new(MockPaymentOrders::new()),
                gateway,
                checkout_timeout,
            ),
            confirmations: BookingConfirmationService::new(
                Arc::new(MockBookingConfirmer::new()),
                3,
                Duration::from_millis(1),
            ),
        };
        BookingWorkflow::new(collab, demo_user(), 6)
    }

    fn workflow() -> BookingWorkflow {
        workflow_with(Arc::new(MockCheckoutGateway::new()), Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_pay_without_hold_is_a_caller_error() {
        let wf = workflow();
        let err = wf.pay().await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
        assert_eq!(err.class(), ErrorClass::Caller);
    }

    #[tokio::test]
    async fn test_select_trip_requires_results() {
        let wf = workflow();
        let err = wf.select_trip("trip-101").await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_unknown_trip_rejected() {
        let wf = workflow();
        wf.search(criteria()).await.unwrap();
        let err = wf.select_trip("trip-404").await.unwrap_err();
        assert!(matches!(err, WorkflowError::UnknownTrip(_)));
    }

    #[tokio::test]
    async fn test_unselectable_seat_rejected_before_hold() {
        let wf = workflow();
        wf.search(criteria()).await.unwrap();
        wf.select_trip("trip-101").await.unwrap();

        // S5 is BOOKED in the demo layout
        let err = wf
            .select_seats(
                vec!["S5".to_string()],
                crate::mock::demo_manifest(1),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::SeatNotSelectable(_)));

        let err = wf
            .select_seats(
                vec!["S99".to_string()],
                crate::mock::demo_manifest(1),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::UnknownSeat(_)));
    }

    #[tokio::test]
    async fn test_backward_edges_before_hold() {
        let wf = workflow();
        wf.search(criteria()).await.unwrap();
        wf.select_trip("trip-101").await.unwrap();

        let view = wf.back_to_results().await.unwrap();
        assert_eq!(view.stage, Stage::Results);

        let view = wf.back_to_search().await.unwrap();
        assert_eq!(view.stage, Stage::Search);
    }

    #[tokio::test]
    async fn test_no_backward_navigation_once_held() {
        let wf = workflow();
        wf.search(criteria()).await.unwrap();
        wf.select_trip("trip-101").await.unwrap();
        wf.select_seats(
            vec!["S1".to_string(), "S2".to_string()],
            crate::mock::demo_manifest(2),
        )
        .await
        .unwrap();

        let err = wf.back_to_results().await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
        let err = wf.search(criteria()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_no_payment_reentry_after_confirmation() {
        let wf = workflow();
        wf.search(criteria()).await.unwrap();
        wf.select_trip("trip-101").await.unwrap();
        wf.select_seats(vec!["S1".to_string()], crate::mock::demo_manifest(1))
            .await
            .unwrap();
        let view = wf.pay().await.unwrap();
        assert_eq!(view.stage, Stage::Confirmation);

        let err = wf.pay().await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_in_flight_guard_rejects_second_mutating_call() {
        let gateway = Arc::new(MockCheckoutGateway::new());
        gateway.push(ScriptedSignal::Hang);
        let wf = Arc::new(workflow_with(gateway, Duration::from_millis(300)));

        wf.search(criteria()).await.unwrap();
        wf.select_trip("trip-101").await.unwrap();
        wf.select_seats(vec!["S1".to_string()], crate::mock::demo_manifest(1))
            .await
            .unwrap();

        let paying = {
            let wf = Arc::clone(&wf);
            tokio::spawn(async move { wf.pay().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        // A doubly-fired action lands while pay() is outstanding
        let err = wf.pay().await.unwrap_err();
        assert!(matches!(err, WorkflowError::Busy));
        // The read-only projection is never gated
        assert_eq!(wf.state().await.stage, Stage::Payment);

        let outcome = paying.await.unwrap();
        assert!(matches!(outcome, Err(WorkflowError::CheckoutFailed(_))));
    }

    #[tokio::test]
    async fn test_empty_results_are_a_successful_search() {
        let seat_maps = Arc::new(MockSeatMapSource::new());
        let collab = Collaborators {
            search: Arc::new(MockInventorySearch::new(vec![])),
            seat_maps,
            holds: SeatHoldManager::new(
                Arc::new(MockHoldService::new(ChronoDuration::minutes(10))),
                6,
            ),
            payments: PaymentOrchestrator::new(
                Arc::new(MockPaymentOrders::new()),
                Arc::new(MockCheckoutGateway::new()),
                Duration::from_secs(2),
            ),
            confirmations: BookingConfirmationService::new(
                Arc::new(MockBookingConfirmer::new()),
                3,
                Duration::from_millis(1),
            ),
        };
        let wf = BookingWorkflow::new(collab, demo_user(), 6);

        let view = wf.search(criteria()).await.unwrap();
        assert_eq!(view.stage, Stage::Results);
        assert!(view.trips.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_criteria_rejected_synchronously() {
        let wf = workflow();
        let mut c = criteria();
        c.travel_date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let err = wf.search(c).await.unwrap_err();
        assert_eq!(err.class(), ErrorClass::Caller);
    }
}
