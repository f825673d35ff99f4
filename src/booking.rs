use crate::search::SearchQuery;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingSite {
    Marketing,
    App,
}

impl BookingSite {
    pub fn base_url(self) -> &'static str {
        match self {
            BookingSite::Marketing => "https://www.paylatertravel.com.au",
            BookingSite::App => "https://app.paylatertravel.com.au",
        }
    }
}

impl FromStr for BookingSite {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "marketing" | "www" => Ok(BookingSite::Marketing),
            "app" => Ok(BookingSite::App),
            other => Err(other.to_string()),
        }
    }
}

pub fn booking_url(site: BookingSite, query: &SearchQuery) -> String {
    format!(
        "{}/flightssearch/s/{}/{}/{}/{}?adults=1&children=0&infants=0&cabinClass=Y",
        site.base_url(),
        query.departure_code,
        query.arrival_code,
        query.depart_date.format("%Y-%m-%d"),
        query.return_date.format("%Y-%m-%d"),
    )
}
