use crate::errors::ValidationError;
use chrono::{DateTime, Datelike, NaiveDate};

const MONTHS: [(&str, &str); 12] = [
    ("Jan", "January"),
    ("Feb", "February"),
    ("Mar", "March"),
    ("Apr", "April"),
    ("May", "May"),
    ("Jun", "June"),
    ("Jul", "July"),
    ("Aug", "August"),
    ("Sep", "September"),
    ("Oct", "October"),
    ("Nov", "November"),
    ("Dec", "December"),
];

pub fn month_number(token: &str) -> Option<u32> {
    let token = token.trim_end_matches([',', '.']);
    MONTHS
        .iter()
        .position(|(abbr, full)| token == *abbr || token == *full)
        .map(|index| index as u32 + 1)
}

pub fn month_abbr(month: u32) -> Option<&'static str> {
    let index = usize::try_from(month).ok()?.checked_sub(1)?;
    MONTHS.get(index).map(|(abbr, _)| *abbr)
}

pub fn first_month_number(range_label: &str) -> Option<u32> {
    let start = range_label.split('-').next()?.trim();
    let token = start.split_whitespace().next()?;
    month_number(token)
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (the date part in its own offset).
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
}

pub fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub depart: NaiveDate,
    pub ret: NaiveDate,
}

impl DateRange {
    /// An empty return date means a same-day return.
    pub fn parse(depart: &str, ret: &str) -> Result<Self, ValidationError> {
        let depart = parse_iso_date(depart).ok_or(ValidationError::MissingDate)?;
        let ret = if ret.trim().is_empty() {
            depart
        } else {
            parse_iso_date(ret).ok_or(ValidationError::MissingDate)?
        };
        if ret < depart {
            return Err(ValidationError::ReversedDates);
        }
        Ok(Self { depart, ret })
    }

    pub fn label(&self) -> String {
        format!("{} - {}", long_date(self.depart), long_date(self.ret))
    }

    pub fn start_month(&self) -> Option<u32> {
        first_month_number(&self.label())
    }

    pub fn short_label(&self) -> String {
        format!("{} - {}", short_date(self.depart), short_date(self.ret))
    }
}

pub fn long_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

pub fn short_date(date: NaiveDate) -> String {
    format!("{}{} {}", date.day(), ordinal_suffix(date.day()), date.format("%b"))
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}
