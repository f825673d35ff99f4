use crate::booking::BookingSite;
use crate::navigation::Pacing;
use std::{env, path::PathBuf, time::Duration};
use thiserror::Error;

pub const DEFAULT_PRICING_URL: &str =
    "https://flight-price-api-778371596602.asia-southeast1.run.app/average_price";
pub const DEFAULT_KLAVIYO_URL: &str = "https://a.klaviyo.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a number, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
    #[error("{name} must be \"marketing\" or \"app\", got {value:?}")]
    UnknownBookingSite { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub pricing_url: String,
    pub pricing_api_key: Option<String>,
    pub klaviyo_url: String,
    pub klaviyo_api_key: Option<String>,
    pub klaviyo_list_id: Option<String>,
    pub pacing: Pacing,
    pub http_timeout: Duration,
    pub imminent_booking: BookingSite,
    pub chart_booking: BookingSite,
    pub data_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|value| value.trim().to_string()).filter(|value| !value.is_empty());

        let number = |name: &'static str, default: u64| -> Result<u64, ConfigError> {
            match var(name) {
                Some(value) => value
                    .parse()
                    .map_err(|_| ConfigError::InvalidNumber { name, value }),
                None => Ok(default),
            }
        };
        let site = |name: &'static str, default: BookingSite| -> Result<BookingSite, ConfigError> {
            match var(name) {
                Some(value) => value
                    .parse()
                    .map_err(|_| ConfigError::UnknownBookingSite { name, value }),
                None => Ok(default),
            }
        };

        let port = number("PORT", 8080)?;
        let port = u16::try_from(port).map_err(|_| ConfigError::InvalidNumber {
            name: "PORT",
            value: port.to_string(),
        })?;

        Ok(Self {
            port,
            pricing_url: var("PRICING_API_URL").unwrap_or_else(|| DEFAULT_PRICING_URL.to_string()),
            pricing_api_key: var("API_KEY"),
            klaviyo_url: var("KLAVIYO_API_URL").unwrap_or_else(|| DEFAULT_KLAVIYO_URL.to_string()),
            klaviyo_api_key: var("KLAVIYO_API_KEY"),
            klaviyo_list_id: var("KLAVIYO_LIST_ID"),
            pacing: Pacing {
                animation: Duration::from_millis(number("ANIMATION_MS", 2_000)?),
                grace: Duration::from_millis(number("GRACE_MS", 2_000)?),
            },
            http_timeout: Duration::from_millis(number("HTTP_TIMEOUT_MS", 10_000)?),
            imminent_booking: site("IMMINENT_BOOKING_SITE", BookingSite::Marketing)?,
            chart_booking: site("CHART_BOOKING_SITE", BookingSite::App)?,
            data_path: var("APP_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/last_search.json")),
        })
    }
}
