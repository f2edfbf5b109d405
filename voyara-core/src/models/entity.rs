use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Kind of inventory a provider sells.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Hotel,
    Flight,
    Transport,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hotel => "hotel",
            Self::Flight => "flight",
            Self::Transport => "transport",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hotel" => Ok(Self::Hotel),
            "flight" => Ok(Self::Flight),
            "transport" => Ok(Self::Transport),
            other => Err(format!("unknown provider type: {}", other)),
        }
    }
}

/// A bookable record (hotel, flight or transport) and the account that owns it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceEntity {
    pub id: Uuid,
    pub provider_type: ProviderType,
    pub provider_id: Uuid,
    pub name: String,
}

/// Inclusive `start`, exclusive `end`. A same-day range occupies the whole of `start`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days().max(0)
    }

    pub fn exclusive_end(&self) -> NaiveDate {
        if self.end > self.start {
            self.end
        } else {
            self.start + Duration::days(1)
        }
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start < other.exclusive_end() && other.start < self.exclusive_end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 11, d).unwrap()
    }

    #[test]
    fn test_range_overlap() {
        let stay = DateRange::new(date(10), date(13));
        assert!(stay.overlaps(&DateRange::new(date(12), date(15))));
        assert!(!stay.overlaps(&DateRange::new(date(13), date(15))));
        assert!(!stay.overlaps(&DateRange::new(date(1), date(10))));

        // Same-day ranges (flights) still occupy their day.
        let flight = DateRange::new(date(12), date(12));
        assert!(stay.overlaps(&flight));
        assert!(flight.overlaps(&DateRange::new(date(12), date(12))));
        assert_eq!(stay.nights(), 3);
        assert_eq!(flight.nights(), 0);
    }

    #[test]
    fn test_provider_type_parsing() {
        assert_eq!("Hotel".parse::<ProviderType>().unwrap(), ProviderType::Hotel);
        assert_eq!(" transport ".parse::<ProviderType>().unwrap(), ProviderType::Transport);
        assert!("cruise".parse::<ProviderType>().is_err());
    }
}
