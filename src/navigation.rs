use crate::models::{Outcome, PriceSeries};
use crate::pricing::{PriceSource, PricingError};
use crate::search::SearchQuery;
use chrono::{Datelike, NaiveDate};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub animation: Duration,
    pub grace: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            animation: Duration::from_millis(2_000),
            grace: Duration::from_millis(2_000),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Imminent,
    Chart(PriceSeries),
    NoDataCapture,
}

impl Decision {
    pub fn outcome(&self) -> Outcome {
        match self {
            Decision::Imminent => Outcome::Imminent,
            Decision::Chart(_) => Outcome::Chart,
            Decision::NoDataCapture => Outcome::NoData,
        }
    }

    pub fn location(&self, query: &SearchQuery) -> String {
        match self {
            Decision::Imminent => query.page_url("/imminent"),
            Decision::Chart(_) => query.chart_url(),
            Decision::NoDataCapture => query.page_url("/no-data"),
        }
    }
}

pub async fn decide<S>(source: &S, query: &SearchQuery, today: NaiveDate, pacing: Pacing) -> Decision
where
    S: PriceSource + Clone + Send + Sync + 'static,
{
    if query.is_imminent(today) {
        info!(destination = %query.arrival_code, "departure is this month, skipping price lookup");
        return Decision::Imminent;
    }

    let Some(month) = query.departure_month() else {
        warn!(label = %query.date_range().label(), "could not resolve a departure month");
        return Decision::NoDataCapture;
    };

    // Spawned so the lookup settles on its own even if the requester goes away;
    // a late result is simply dropped.
    let lookup = {
        let source = source.clone();
        let destination = query.arrival_code.clone();
        tokio::spawn(async move { source.average_price(&destination, month).await })
    };

    let (settled, ()) = tokio::join!(timeout(pacing.animation + pacing.grace, lookup), sleep(pacing.animation));

    match settled {
        Ok(Ok(Ok(series))) => settle(series, today.month()),
        Ok(Ok(Err(PricingError::MissingApiKey))) => {
            error!("pricing API key is not configured, falling back to no-data page");
            Decision::NoDataCapture
        }
        Ok(Ok(Err(PricingError::NoData(reason)))) => {
            info!(destination = %query.arrival_code, month, %reason, "no pricing data");
            Decision::NoDataCapture
        }
        Ok(Err(join_err)) => {
            error!("pricing lookup task failed: {join_err}");
            Decision::NoDataCapture
        }
        Err(_) => {
            warn!(
                destination = %query.arrival_code,
                month,
                "pricing lookup did not settle within the grace period"
            );
            Decision::NoDataCapture
        }
    }
}

pub fn settle(series: PriceSeries, current_month: u32) -> Decision {
    match series.current_point(current_month) {
        Some(point) if point.adjusted_avg_price.is_some() => Decision::Chart(series),
        _ => Decision::NoDataCapture,
    }
}
