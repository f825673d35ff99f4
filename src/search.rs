use crate::airports::{extract_airport_code, origin_code};
use crate::dates::{same_month, DateRange};
use crate::errors::ValidationError;
use crate::models::{LastSearch, PageParams, SearchForm};
use chrono::NaiveDate;
use url::form_urlencoded;

pub const PRICES_PATH: &str = "/api/flight-prices";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub departure_city: String,
    pub arrival_city: String,
    pub departure_code: String,
    pub arrival_code: String,
    pub depart_date: NaiveDate,
    pub return_date: NaiveDate,
}

impl SearchQuery {
    pub fn from_form(form: &SearchForm) -> Result<Self, ValidationError> {
        Self::build(&form.from, &form.to, None, None, &form.depart_date, &form.return_date)
    }

    pub fn from_params(params: &PageParams) -> Result<Self, ValidationError> {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        Self::build(
            &text(&params.from),
            &text(&params.to),
            params.departure_iata.as_deref(),
            params.to_iata.as_deref(),
            &text(&params.depart_date),
            &text(&params.return_date),
        )
    }

    fn build(
        from: &str,
        to: &str,
        departure_code: Option<&str>,
        arrival_code: Option<&str>,
        depart: &str,
        ret: &str,
    ) -> Result<Self, ValidationError> {
        let range = DateRange::parse(depart, ret)?;
        let arrival_code = arrival_code
            .map(str::trim)
            .filter(|code| is_airport_code(code))
            .map(str::to_string)
            .or_else(|| extract_airport_code(to))
            .ok_or(ValidationError::UnknownDestination)?;
        let departure_code = departure_code
            .map(str::trim)
            .filter(|code| is_airport_code(code))
            .map(str::to_string)
            .unwrap_or_else(|| origin_code(from));

        Ok(Self {
            departure_city: from.trim().to_string(),
            arrival_city: to.trim().to_string(),
            departure_code,
            arrival_code,
            depart_date: range.depart,
            return_date: range.ret,
        })
    }

    pub fn date_range(&self) -> DateRange {
        DateRange {
            depart: self.depart_date,
            ret: self.return_date,
        }
    }

    pub fn departure_month(&self) -> Option<u32> {
        self.date_range().start_month()
    }

    pub fn is_imminent(&self, today: NaiveDate) -> bool {
        same_month(self.depart_date, today)
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("from", self.departure_city.clone()),
            ("to", self.arrival_city.clone()),
            ("toIata", self.arrival_code.clone()),
            ("departDate", self.depart_date.format("%Y-%m-%d").to_string()),
            ("returnDate", self.return_date.format("%Y-%m-%d").to_string()),
            ("departureIata", self.departure_code.clone()),
        ]
    }

    pub fn page_url(&self, path: &str) -> String {
        with_query(path, &self.query_pairs())
    }

    pub fn generated_url(&self) -> Option<String> {
        let month = self.departure_month()?;
        Some(
            PricingRequest {
                destination: self.arrival_code.clone(),
                month,
            }
            .url(),
        )
    }

    fn with_generated_url(&self, path: &str) -> String {
        let mut pairs = self.query_pairs();
        if let Some(generated) = self.generated_url() {
            pairs.push(("generatedUrl", generated));
        }
        with_query(path, &pairs)
    }

    /// The carried `generatedUrl` only counts when it addresses this search's destination.
    pub fn pricing_request(&self, generated: Option<&str>) -> Option<PricingRequest> {
        generated
            .and_then(PricingRequest::from_generated_url)
            .filter(|request| request.destination == self.arrival_code)
            .or_else(|| {
                self.departure_month().map(|month| PricingRequest {
                    destination: self.arrival_code.clone(),
                    month,
                })
            })
    }

    pub fn loading_url(&self) -> String {
        self.with_generated_url("/loading")
    }

    pub fn chart_url(&self) -> String {
        self.with_generated_url("/chart")
    }

    pub fn decision_url(&self) -> String {
        self.page_url("/api/decision")
    }
}

impl From<&SearchQuery> for LastSearch {
    fn from(query: &SearchQuery) -> Self {
        Self {
            departure_city: query.departure_city.clone(),
            arrival_city: query.arrival_city.clone(),
            depart_date: Some(query.depart_date.format("%Y-%m-%d").to_string()),
            return_date: Some(query.return_date.format("%Y-%m-%d").to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingRequest {
    pub destination: String,
    pub month: u32,
}

impl PricingRequest {
    pub fn url(&self) -> String {
        with_query(
            PRICES_PATH,
            &[
                ("destination_iata", self.destination.clone()),
                ("departure_month", self.month.to_string()),
                ("num_travelers", "1".to_string()),
            ],
        )
    }

    /// Reads back a URL produced by [`PricingRequest::url`]. Other paths are refused.
    pub fn from_generated_url(generated: &str) -> Option<Self> {
        let (path, query) = generated.split_once('?')?;
        if path != PRICES_PATH {
            return None;
        }
        let mut destination = None;
        let mut month = None;
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "destination_iata" => destination = Some(value.trim().to_string()),
                "departure_month" => month = value.trim().parse::<u32>().ok(),
                _ => {}
            }
        }
        let destination = destination.filter(|code| is_airport_code(code))?;
        let month = month.filter(|month| (1..=12).contains(month))?;
        Some(Self { destination, month })
    }
}

pub fn is_airport_code(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase())
}

pub fn with_query(path: &str, pairs: &[(&str, String)]) -> String {
    if pairs.is_empty() {
        return path.to_string();
    }
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{path}{separator}{}", serializer.finish())
}

pub fn safe_return_path(candidate: &str) -> Option<&str> {
    let candidate = candidate.trim();
    let same_site = candidate.starts_with('/') && !candidate.starts_with("//") && !candidate.contains('\\');
    same_site.then_some(candidate)
}
