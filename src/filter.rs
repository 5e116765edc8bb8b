// Month/year period selection.
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};

use crate::error::{ReportError, Result};
use crate::util::parse_i32_safe;

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub month: u32,
    pub year: i32,
}

impl Period {
    pub fn new(month: u32, year: i32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(ReportError::InvalidPeriod(format!("{month}/{year}")));
        }
        Ok(Self { month, year })
    }

    /// Accepts "2025-11", "11/2025", "11-2025", "NOV 2025", "November-2025".
    pub fn parse(selector: &str) -> Result<Self> {
        let invalid = || ReportError::InvalidPeriod(selector.to_string());
        let parts: Vec<&str> = selector
            .split(|c: char| c == '-' || c == '/' || c == '.' || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .collect();
        let [a, b] = parts.as_slice() else {
            return Err(invalid());
        };
        let (month_part, year_part) = if a.len() == 4 && a.chars().all(|c| c.is_ascii_digit()) {
            (*b, *a)
        } else {
            (*a, *b)
        };
        if year_part.len() != 4 {
            return Err(invalid());
        }
        let year = parse_i32_safe(Some(year_part)).ok_or_else(invalid)?;
        let month = month_number(month_part).ok_or_else(invalid)?;
        Self::new(month, year)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.month() == self.month && date.year() == self.year
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// Three-letter month, e.g. "NOV".
    pub fn month_abbrev(&self) -> &'static str {
        MONTHS[(self.month - 1) as usize]
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.month_abbrev(), self.year)
    }
}

impl FromStr for Period {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn month_number(part: &str) -> Option<u32> {
    if part.chars().all(|c| c.is_ascii_digit()) {
        return part.parse::<u32>().ok().filter(|m| (1..=12).contains(m));
    }
    let upper = part.to_uppercase();
    if upper.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|m| upper.starts_with(m))
        .map(|i| i as u32 + 1)
}
