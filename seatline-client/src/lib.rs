pub mod checkout;
pub mod config;
pub mod confirm_client;
pub mod hold_client;
pub mod http;
pub mod payment_client;
pub mod search_client;
pub mod seatmap_client;

pub use checkout::PollingCheckoutGateway;
pub use self::config::Config;
pub use confirm_client::HttpBookingConfirmer;
pub use hold_client::HttpHoldService;
pub use http::RestClient;
pub use payment_client::HttpPaymentOrders;
pub use search_client::HttpInventorySearch;
pub use seatmap_client::HttpSeatMapSource;
