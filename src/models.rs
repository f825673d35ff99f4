use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    #[serde(deserialize_with = "month_from_number_or_text")]
    pub booking_month: u32,
    #[serde(default)]
    pub adjusted_avg_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    pub destination_iata: String,
    pub departure_month: u32,
    pub analysis: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(destination_iata: impl Into<String>, departure_month: u32, mut points: Vec<PricePoint>) -> Self {
        points.retain(|point| (1..=12).contains(&point.booking_month));
        points.sort_by_key(|point| point.booking_month);
        Self {
            destination_iata: destination_iata.into(),
            departure_month,
            analysis: points,
        }
    }

    pub fn point_for_month(&self, month: u32) -> Option<&PricePoint> {
        self.analysis.iter().find(|point| point.booking_month == month)
    }

    /// The point for `month`, or the first point when that month is absent.
    pub fn current_point(&self, month: u32) -> Option<&PricePoint> {
        self.point_for_month(month).or_else(|| self.analysis.first())
    }

    pub fn price_range(&self) -> Option<(f64, f64)> {
        self.analysis
            .iter()
            .filter_map(|point| point.adjusted_avg_price)
            .fold(None, |range, price| match range {
                None => Some((price, price)),
                Some((min, max)) => Some((min.min(price), max.max(price))),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceStatus {
    Low,
    Average,
    High,
}

impl PriceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PriceStatus::Low => "low",
            PriceStatus::Average => "average",
            PriceStatus::High => "high",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub from: Option<String>,
    pub to: Option<String>,
    #[serde(rename = "departureIata")]
    pub departure_iata: Option<String>,
    #[serde(rename = "toIata")]
    pub to_iata: Option<String>,
    #[serde(rename = "departDate")]
    pub depart_date: Option<String>,
    #[serde(rename = "returnDate")]
    pub return_date: Option<String>,
    #[serde(rename = "generatedUrl")]
    pub generated_url: Option<String>,
    pub subscribed: Option<String>,
    pub subscribe_error: Option<String>,
    pub email: Option<String>,
}

impl PageParams {
    pub fn canonical_pairs(&self) -> Vec<(&'static str, String)> {
        [
            ("from", &self.from),
            ("to", &self.to),
            ("toIata", &self.to_iata),
            ("departDate", &self.depart_date),
            ("returnDate", &self.return_date),
            ("departureIata", &self.departure_iata),
            ("generatedUrl", &self.generated_url),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_ref().map(|value| (key, value.clone())))
        .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchForm {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(rename = "departDate", default)]
    pub depart_date: String,
    #[serde(rename = "returnDate", default)]
    pub return_date: String,
}

#[derive(Debug, Deserialize)]
pub struct PricesParams {
    pub destination_iata: Option<String>,
    pub departure_month: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PricesResponse {
    Series(PriceSeries),
    NoData {
        #[serde(rename = "noData")]
        no_data: bool,
    },
}

impl PricesResponse {
    pub fn no_data() -> Self {
        PricesResponse::NoData { no_data: true }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubscribeResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureSource {
    PriceAlert,
    CustomPrice,
    BookingReminder,
}

impl CaptureSource {
    pub fn as_str(self) -> &'static str {
        match self {
            CaptureSource::PriceAlert => "price_alert",
            CaptureSource::CustomPrice => "custom_price",
            CaptureSource::BookingReminder => "booking_reminder",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubscribeForm {
    #[serde(default)]
    pub email: String,
    pub source: CaptureSource,
    #[serde(default)]
    pub back: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Imminent,
    Chart,
    NoData,
}

#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    pub outcome: Outcome,
    pub location: String,
}

#[derive(Debug, Deserialize)]
pub struct DestinationParams {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DestinationOption {
    pub code: &'static str,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LastSearch {
    pub departure_city: String,
    pub arrival_city: String,
    pub depart_date: Option<String>,
    pub return_date: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MonthRepr {
    Number(i64),
    Text(String),
}

fn month_from_number_or_text<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let month = match MonthRepr::deserialize(deserializer)? {
        MonthRepr::Number(month) => month,
        MonthRepr::Text(text) => text.trim().parse::<i64>().map_err(serde::de::Error::custom)?,
    };
    // 0 is outside 1..=12, so PriceSeries::new drops the point.
    Ok(u32::try_from(month).unwrap_or(0))
}
