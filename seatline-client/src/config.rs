use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub endpoints: EndpointConfig,
    pub gateway: GatewayConfig,
    pub rules: WorkflowRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EndpointConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    /// Public key identifier handed to the hosted checkout page.
    pub key_id: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Tunables for the booking workflow itself.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkflowRules {
    pub max_seats_per_hold: usize,
    pub max_passengers: u32,
    pub checkout_timeout_secs: u64,
    pub confirm_retry_attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_retry_backoff_ms() -> u64 {
    400
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Add in the current environment file
            // Default to 'development' env
            // Note that this file is _optional_
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked in to git
            .add_source(config::File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of SEATLINE)
            // Eg.. `SEATLINE__ENDPOINTS__BASE_URL=...` would set `endpoints.base_url`
            .add_source(config::Environment::with_prefix("SEATLINE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
