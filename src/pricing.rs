use crate::models::{PricePoint, PriceSeries};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::future::Future;
use thiserror::Error;
use tracing::{debug, warn};

pub const API_KEY_HEADER: &str = "x-api-key";
const NUM_TRAVELERS: &str = "1";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoDataReason {
    #[error("destination or month is not valid")]
    InvalidRequest,
    #[error("upstream answered with status {0}")]
    Status(u16),
    #[error("upstream body is not valid JSON")]
    MalformedBody,
    #[error("upstream returned an empty payload")]
    Empty,
    #[error("upstream body has no analysis series")]
    MissingAnalysis,
    #[error("request to upstream failed: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("pricing API key is not configured")]
    MissingApiKey,
    #[error("no pricing data: {0}")]
    NoData(#[from] NoDataReason),
}

pub trait PriceSource {
    fn average_price(
        &self,
        destination: &str,
        month: u32,
    ) -> impl Future<Output = Result<PriceSeries, PricingError>> + Send;
}

#[derive(Clone)]
pub struct PricingClient {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl PricingClient {
    pub fn new(http: Client, endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            api_key,
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn fetch_average_price(&self, destination: &str, month: u32) -> Result<PriceSeries, PricingError> {
        let api_key = self.api_key.as_deref().ok_or(PricingError::MissingApiKey)?;
        if destination.trim().is_empty() || !(1..=12).contains(&month) {
            return Err(NoDataReason::InvalidRequest.into());
        }

        let month_param = month.to_string();
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("destination_iata", destination),
                ("departure_month", month_param.as_str()),
                ("num_travelers", NUM_TRAVELERS),
            ])
            .header(API_KEY_HEADER, api_key)
            .send()
            .await
            .map_err(|err| NoDataReason::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| NoDataReason::Transport(err.to_string()))?;

        let series = interpret_response(status, &body, destination, month)?;
        debug!(
            destination,
            month,
            points = series.analysis.len(),
            "pricing series received"
        );
        Ok(series)
    }
}

impl PriceSource for PricingClient {
    fn average_price(
        &self,
        destination: &str,
        month: u32,
    ) -> impl Future<Output = Result<PriceSeries, PricingError>> + Send {
        self.fetch_average_price(destination, month)
    }
}

/// Turns an upstream answer into a series; every unusable shape is "no data".
pub fn interpret_response(
    status: StatusCode,
    body: &[u8],
    destination: &str,
    month: u32,
) -> Result<PriceSeries, NoDataReason> {
    if !status.is_success() {
        warn!(
            status = status.as_u16(),
            body = %String::from_utf8_lossy(body),
            "pricing upstream returned an error status"
        );
        return Err(NoDataReason::Status(status.as_u16()));
    }

    let value: Value = serde_json::from_slice(body).map_err(|_| NoDataReason::MalformedBody)?;
    match &value {
        Value::Null => return Err(NoDataReason::Empty),
        Value::Array(items) if items.is_empty() => return Err(NoDataReason::Empty),
        _ => {}
    }

    let analysis = value
        .get("analysis")
        .filter(|analysis| !analysis.is_null())
        .ok_or(NoDataReason::MissingAnalysis)?;
    let points: Vec<PricePoint> =
        serde_json::from_value(analysis.clone()).map_err(|_| NoDataReason::MalformedBody)?;

    let series = PriceSeries::new(destination, month, points);
    if series.analysis.is_empty() {
        return Err(NoDataReason::Empty);
    }
    Ok(series)
}
