use std::env;
use std::path::PathBuf;
use std::time::Duration;

use uuid::Uuid;

use crate::error::TripError;

#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: Option<String>,
    pub passenger_id: Option<Uuid>,
    pub data_dir: PathBuf,
    pub log_level: String,
    pub poll_interval: Duration,
    pub negotiation_timeout: Duration,
    pub sync_interval: Duration,
    pub retry_delay: Duration,
    pub max_retries: u32,
    pub max_failed_passes: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, TripError> {
        let _ = dotenvy::dotenv();

        let passenger_id = match env::var("PASSENGER_ID") {
            Ok(raw) => Some(
                Uuid::parse_str(&raw)
                    .map_err(|err| TripError::Internal(format!("invalid PASSENGER_ID: {err}")))?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            backend_url: env::var("BACKEND_URL").ok(),
            passenger_id,
            data_dir: PathBuf::from(
                env::var("DATA_DIR").unwrap_or_else(|_| ".trip-sync".to_string()),
            ),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            poll_interval: Duration::from_millis(parse_or_default("POLL_INTERVAL_MS", 3_000)?),
            negotiation_timeout: Duration::from_millis(parse_or_default(
                "NEGOTIATION_TIMEOUT_MS",
                120_000,
            )?),
            sync_interval: Duration::from_millis(parse_or_default("SYNC_INTERVAL_MS", 30_000)?),
            retry_delay: Duration::from_millis(parse_or_default("RETRY_DELAY_MS", 1_000)?),
            max_retries: parse_or_default("MAX_RETRIES", 3)?,
            max_failed_passes: parse_or_default("MAX_FAILED_PASSES", 5)?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: None,
            passenger_id: None,
            data_dir: PathBuf::from(".trip-sync"),
            log_level: "info".to_string(),
            poll_interval: Duration::from_secs(3),
            negotiation_timeout: Duration::from_secs(120),
            sync_interval: Duration::from_secs(30),
            retry_delay: Duration::from_secs(1),
            max_retries: 3,
            max_failed_passes: 5,
        }
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, TripError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| TripError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
