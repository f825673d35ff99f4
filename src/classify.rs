use crate::dates::month_abbr;
use crate::models::{PriceSeries, PriceStatus};
use serde::Serialize;

pub const LOW_CEILING: f64 = 25.0;
pub const AVERAGE_CEILING: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    pub position: f64,
    pub status: PriceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub month: u32,
    pub label: &'static str,
    pub price: f64,
    pub position: f64,
    pub status: PriceStatus,
}

impl PriceStatus {
    pub fn from_position(position: f64) -> Self {
        if position <= LOW_CEILING {
            PriceStatus::Low
        } else if position <= AVERAGE_CEILING {
            PriceStatus::Average
        } else {
            PriceStatus::High
        }
    }
}

pub fn position(min: f64, max: f64, price: f64) -> f64 {
    let span = max - min;
    if span <= 0.0 || !span.is_finite() {
        return 0.0;
    }
    let raw = (price - min) * 100.0 / span;
    if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 100.0) }
}

pub fn classify(series: &PriceSeries, current_price: f64) -> Classification {
    let (min, max) = series.price_range().unwrap_or((current_price, current_price));
    let position = position(min, max, current_price);
    Classification {
        position,
        status: PriceStatus::from_position(position),
    }
}

pub fn current_price(series: &PriceSeries, month: u32) -> Option<f64> {
    series.current_point(month)?.adjusted_avg_price
}

pub fn chart_points(series: &PriceSeries) -> Vec<ChartPoint> {
    series
        .analysis
        .iter()
        .filter_map(|point| {
            let price = point.adjusted_avg_price?;
            let Classification { position, status } = classify(series, price);
            Some(ChartPoint {
                month: point.booking_month,
                label: month_abbr(point.booking_month)?,
                price,
                position,
                status,
            })
        })
        .collect()
}
