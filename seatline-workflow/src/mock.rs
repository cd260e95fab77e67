//! Scriptable in-memory collaborators. Used by the test suites and by the
//! CLI's `--mock` mode; scripted entries are consumed front-to-back and
//! every mock falls back to a plain success path when its script is empty.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use seatline_core::booking::{BookingConfirmer, BookingRecord, ConfirmError, ConfirmationRequest};
use seatline_core::hold::{HoldError, HoldService, SeatHold};
use seatline_core::manifest::{Passenger, PassengerCategory, UserContext};
use seatline_core::payment::{
    CheckoutGateway, CheckoutRequest, CheckoutSignal, PaymentError, PaymentOrder, PaymentOrders,
};
use seatline_core::search::{InventorySearch, SearchCriteria, SearchError, TripOption};
use seatline_core::seatmap::{Seat, SeatCategory, SeatMapError, SeatMapSource, SeatStatus};

// ============================================================================
// Demo data
// ============================================================================

pub fn demo_trips() -> Vec<TripOption> {
    let depart = Utc::now() + Duration::days(7);
    vec![
        TripOption {
            trip_id: "trip-101".to_string(),
            operator: "Skyline Travels".to_string(),
            origin: "Pune".to_string(),
            destination: "Mumbai".to_string(),
            departure_time: depart,
            arrival_time: depart + Duration::hours(4),
            seat_map_ref: "layout-101".to_string(),
            base_fare: 40000,
            currency: "INR".to_string(),
            rating: Some(4.1),
        },
        TripOption {
            trip_id: "trip-102".to_string(),
            operator: "Western Express".to_string(),
            origin: "Pune".to_string(),
            destination: "Mumbai".to_string(),
            departure_time: depart + Duration::hours(2),
            arrival_time: depart + Duration::hours(6),
            seat_map_ref: "layout-102".to_string(),
            base_fare: 45000,
            currency: "INR".to_string(),
            rating: Some(4.6),
        },
    ]
}

pub fn demo_seats() -> Vec<Seat> {
    let seat = |id: &str, category: SeatCategory, fare: i64, status: SeatStatus| Seat {
        id: id.to_string(),
        category,
        fare,
        status,
    };
    vec![
        seat("S1", SeatCategory::Seater, 40000, SeatStatus::Available),
        seat("S2", SeatCategory::Seater, 40000, SeatStatus::Available),
        seat("S3", SeatCategory::LowerBerth, 52000, SeatStatus::Available),
        seat("S4", SeatCategory::UpperBerth, 48000, SeatStatus::Available),
        seat("S5", SeatCategory::Sleeper, 55000, SeatStatus::Booked),
        seat("S6", SeatCategory::Sleeper, 55000, SeatStatus::HeldByOther),
    ]
}

pub fn demo_manifest(count: usize) -> Vec<Passenger> {
    (0..count)
        .map(|i| Passenger {
            name: format!("Passenger {}", i + 1),
            age: 30 + i as u8,
            category: PassengerCategory::Other,
            phone: Some("9000000000".to_string()),
            email: Some("passenger@example.com".to_string()),
        })
        .collect()
}

pub fn demo_user() -> UserContext {
    UserContext {
        name: "Asha Rao".to_string(),
        phone: "9000000001".to_string(),
        email: "asha@example.com".to_string(),
    }
}

pub fn demo_hold(seat_ids: &[&str], ttl: Duration) -> SeatHold {
    SeatHold {
        hold_id: format!("hold-{}", Uuid::new_v4().simple()),
        trip_id: "trip-101".to_string(),
        seat_ids: seat_ids.iter().map(|s| s.to_string()).collect(),
        manifest: demo_manifest(seat_ids.len()),
        expires_at: Utc::now() + ttl,
    }
}

// ============================================================================
// Collaborator mocks
// ============================================================================

pub struct MockInventorySearch {
    trips: Vec<TripOption>,
    fail_next: Mutex<Option<SearchError>>,
}

impl MockInventorySearch {
    pub fn new(trips: Vec<TripOption>) -> Self {
        Self {
            trips,
            fail_next: Mutex::new(None),
        }
    }

    pub fn push_failure(&self, err: SearchError) {
        *self.fail_next.lock().unwrap() = Some(err);
    }
}

#[async_trait]
impl InventorySearch for MockInventorySearch {
    async fn search(&self, _criteria: &SearchCriteria) -> Result<Vec<TripOption>, SearchError> {
        if let Some(err) = self.fail_next.lock().unwrap().take() {
            return Err(err);
        }
        Ok(self.trips.clone())
    }
}

pub struct MockSeatMapSource {
    seat_maps: Mutex<HashMap<String, Vec<Seat>>>,
}

impl MockSeatMapSource {
    pub fn new() -> Self {
        Self {
            seat_maps: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_seats(&self, trip_id: &str, seats: Vec<Seat>) {
        self.seat_maps
            .lock()
            .unwrap()
            .insert(trip_id.to_string(), seats);
    }
}

impl Default for MockSeatMapSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SeatMapSource for MockSeatMapSource {
    async fn fetch_seat_map(&self, trip_id: &str) -> Result<Vec<Seat>, SeatMapError> {
        self.seat_maps
            .lock()
            .unwrap()
            .get(trip_id)
            .cloned()
            .ok_or_else(|| SeatMapError::Unavailable(format!("no layout for trip {}", trip_id)))
    }
}

pub struct MockHoldService {
    ttl: Duration,
    scripted: Mutex<VecDeque<Result<SeatHold, HoldError>>>,
    counter: AtomicU64,
}

impl MockHoldService {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            scripted: Mutex::new(VecDeque::new()),
            counter: AtomicU64::new(0),
        }
    }

    pub fn push_response(&self, response: Result<SeatHold, HoldError>) {
        self.scripted.lock().unwrap().push_back(response);
    }

    /// Script the next response as a hold over exactly these seats,
    /// whatever the request asked for.
    pub fn push_hold_covering(&self, seat_ids: &[&str]) {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        self.push_response(Ok(SeatHold {
            hold_id: format!("hold-{}", n),
            trip_id: "trip-101".to_string(),
            seat_ids: seat_ids.iter().map(|s| s.to_string()).collect(),
            manifest: vec![],
            expires_at: Utc::now() + self.ttl,
        }));
    }
}

#[async_trait]
impl HoldService for MockHoldService {
    async fn request_hold(
        &self,
        trip_id: &str,
        seat_ids: &[String],
        manifest: &[Passenger],
    ) -> Result<SeatHold, HoldError> {
        if let Some(response) = self.scripted.lock().unwrap().pop_front() {
            return response;
        }

        // Default: echo the request back as a granted hold
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(SeatHold {
            hold_id: format!("hold-{}", n),
            trip_id: trip_id.to_string(),
            seat_ids: seat_ids.to_vec(),
            manifest: manifest.to_vec(),
            expires_at: Utc::now() + self.ttl,
        })
    }
}

pub struct MockPaymentOrders {
    counter: AtomicU64,
    fail_next: Mutex<Option<PaymentError>>,
}

impl MockPaymentOrders {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
            fail_next: Mutex::new(None),
        }
    }

    pub fn push_failure(&self, err: PaymentError) {
        *self.fail_next.lock().unwrap() = Some(err);
    }

    pub fn orders_created(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }
}

impl Default for MockPaymentOrders {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentOrders for MockPaymentOrders {
    async fn create_order(
        &self,
        _hold_id: &str,
        amount: i64,
        currency: &str,
    ) -> Result<PaymentOrder, PaymentError> {
        if let Some(err) = self.fail_next.lock().unwrap().take() {
            return Err(err);
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PaymentOrder {
            order_id: Uuid::new_v4(),
            gateway_order_ref: format!("gw_order_{}", n),
            amount,
            currency: currency.to_string(),
            created_at: Utc::now(),
        })
    }
}

#[derive(Debug)]
pub enum ScriptedSignal {
    Authorize,
    AuthorizeUncorrelated,
    Dismiss,
    Fail(String),
    /// Never report back; exercises the orchestrator's timeout/unsubscribe.
    Hang,
}

pub struct MockCheckoutGateway {
    script: Mutex<VecDeque<ScriptedSignal>>,
    payments: AtomicU64,
}

impl MockCheckoutGateway {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            payments: AtomicU64::new(0),
        }
    }

    pub fn push(&self, signal: ScriptedSignal) {
        self.script.lock().unwrap().push_back(signal);
    }
}

impl Default for MockCheckoutGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CheckoutGateway for MockCheckoutGateway {
    async fn drive(&self, request: CheckoutRequest) -> CheckoutSignal {
        let scripted = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ScriptedSignal::Authorize);

        match scripted {
            ScriptedSignal::Authorize => {
                let n = self.payments.fetch_add(1, Ordering::SeqCst) + 1;
                CheckoutSignal::Success {
                    payment_id: format!("pay_{}", n),
                    gateway_order_ref: request.gateway_order_ref,
                }
            }
            ScriptedSignal::AuthorizeUncorrelated => CheckoutSignal::Success {
                payment_id: "pay_stale".to_string(),
                gateway_order_ref: "gw_order_stale".to_string(),
            },
            ScriptedSignal::Dismiss => CheckoutSignal::Dismissed,
            ScriptedSignal::Fail(reason) => CheckoutSignal::Error(reason),
            ScriptedSignal::Hang => {
                tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                CheckoutSignal::Dismissed
            }
        }
    }
}

pub struct MockBookingConfirmer {
    records: Mutex<HashMap<(String, String), BookingRecord>>,
    failures: Mutex<VecDeque<ConfirmError>>,
    requests: Mutex<Vec<ConfirmationRequest>>,
    counter: AtomicU64,
}

impl MockBookingConfirmer {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            failures: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            counter: AtomicU64::new(0),
        }
    }

    pub fn push_failure(&self, err: ConfirmError) {
        self.failures.lock().unwrap().push_back(err);
    }

    pub fn requests_seen(&self) -> Vec<ConfirmationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn bookings_created(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

impl Default for MockBookingConfirmer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BookingConfirmer for MockBookingConfirmer {
    async fn confirm(&self, request: &ConfirmationRequest) -> Result<BookingRecord, ConfirmError> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }

        let key = (request.hold_id.clone(), request.payment_id.clone());
        let mut records = self.records.lock().unwrap();

        // Idempotent on the (hold_id, payment_id) pair
        if let Some(existing) = records.get(&key) {
            return Ok(existing.clone());
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let record = BookingRecord {
            confirmation_code: format!("PNR{:05}", n),
            hold_id: request.hold_id.clone(),
            payment_id: request.payment_id.clone(),
            gateway_order_ref: request.gateway_order_ref.clone(),
            amount_charged: request.amount,
            currency: request.currency.clone(),
            booked_at: Utc::now(),
        };
        records.insert(key, record.clone());
        Ok(record)
    }
}
