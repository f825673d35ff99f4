use once_cell::sync::Lazy;
use regex::Regex;

static CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([A-Z]{3})\)").expect("airport code pattern is valid"));

pub fn extract_airport_code(label: &str) -> Option<String> {
    CODE_PATTERN
        .captures(label)
        .and_then(|captures| captures.get(1))
        .map(|code| code.as_str().to_string())
}

pub const ORIGIN_CITIES: [&str; 6] = [
    "Sydney (SYD)",
    "Melbourne (MEL)",
    "Brisbane (BNE)",
    "Perth (PER)",
    "Adelaide (ADL)",
    "Gold Coast (OOL)",
];

pub const DEFAULT_ORIGIN: &str = ORIGIN_CITIES[0];

pub fn origin_code(label: &str) -> String {
    extract_airport_code(label)
        .or_else(|| extract_airport_code(DEFAULT_ORIGIN))
        .unwrap_or_else(|| "SYD".to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Destination {
    pub code: &'static str,
    pub name: &'static str,
}

impl Destination {
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.code)
    }
}

pub const DESTINATIONS: &[Destination] = &[
    Destination { code: "DPS", name: "Bali" },
    Destination { code: "AKL", name: "Auckland" },
    Destination { code: "NAN", name: "Nadi" },
    Destination { code: "APW", name: "Apia" },
    Destination { code: "PPT", name: "Tahiti" },
    Destination { code: "NOU", name: "Noumea" },
    Destination { code: "MNL", name: "Manila" },
    Destination { code: "BKK", name: "Bangkok" },
    Destination { code: "HKT", name: "Phuket" },
    Destination { code: "SIN", name: "Singapore" },
    Destination { code: "KUL", name: "Kuala Lumpur" },
    Destination { code: "SGN", name: "Ho Chi Minh City" },
    Destination { code: "CGK", name: "Jakarta" },
    Destination { code: "HKG", name: "Hong Kong" },
    Destination { code: "HND", name: "Tokyo" },
    Destination { code: "ICN", name: "Seoul" },
    Destination { code: "DEL", name: "Delhi" },
    Destination { code: "BOM", name: "Mumbai" },
    Destination { code: "LAX", name: "Los Angeles" },
    Destination { code: "HNL", name: "Honolulu" },
    Destination { code: "JFK", name: "New York" },
    Destination { code: "LAS", name: "Las Vegas" },
    Destination { code: "YVR", name: "Vancouver" },
    Destination { code: "LHR", name: "London" },
    Destination { code: "CDG", name: "Paris" },
    Destination { code: "FCO", name: "Rome" },
];

pub fn search_destinations(query: &str, limit: usize) -> Vec<Destination> {
    let needle = query.trim().to_lowercase();
    DESTINATIONS
        .iter()
        .filter(|dest| {
            needle.is_empty()
                || dest.code.to_lowercase().contains(&needle)
                || dest.name.to_lowercase().contains(&needle)
        })
        .take(limit)
        .copied()
        .collect()
}
