//! Federal cabinets as commit authors.
//!
//! Every commit is authored by the cabinet in office on the publication date
//! of the change it records. The timeline is a closed table of consecutive
//! half-open intervals `[start, next start)`; the last one runs until today.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HistoryError;

const EMAIL_DOMAIN: &str = "bundesregierung.de";

/// A cabinet and the day it took office.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cabinet {
    pub name: &'static str,
    pub parties: &'static str,
    start: (i32, u32, u32),
}

impl Cabinet {
    const fn new(name: &'static str, start: (i32, u32, u32), parties: &'static str) -> Self {
        Self { name, parties, start }
    }

    pub fn start(&self) -> NaiveDate {
        let (y, m, d) = self.start;
        NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
    }

    /// `Adenauer@bundesregierung.de` for `Adenauer cabinet I`.
    pub fn email(&self) -> String {
        let head = self.name.split(' ').next().unwrap_or(self.name);
        format!("{head}@{EMAIL_DOMAIN}")
    }
}

pub const CABINETS: &[Cabinet] = &[
    Cabinet::new("Adenauer cabinet I", (1949, 9, 20), "CDU/CSU, FDP, DP"),
    Cabinet::new("Adenauer cabinet II", (1953, 10, 20), "CDU/CSU, FDP, GB/BHE, DP"),
    Cabinet::new("Adenauer cabinet III", (1957, 10, 29), "CDU/CSU, DP"),
    Cabinet::new("Adenauer cabinet IV", (1961, 11, 14), "CDU/CSU, FDP"),
    Cabinet::new("Adenauer cabinet V", (1962, 12, 14), "CDU/CSU, FDP"),
    Cabinet::new("Erhard cabinet I", (1963, 10, 17), "CDU/CSU, FDP"),
    Cabinet::new("Erhard cabinet II", (1965, 10, 26), "CDU/CSU, FDP"),
    Cabinet::new("Kiesinger cabinet", (1966, 12, 1), "CDU/CSU, SPD"),
    Cabinet::new("Brandt cabinet I", (1969, 10, 22), "SPD, FDP"),
    Cabinet::new("Brandt cabinet II", (1972, 12, 15), "SPD, FDP"),
    Cabinet::new("Schmidt cabinet I", (1974, 5, 17), "SPD, FDP"),
    Cabinet::new("Schmidt cabinet II", (1976, 12, 16), "SPD, FDP"),
    Cabinet::new("Schmidt cabinet III", (1980, 11, 5), "SPD, FDP"),
    Cabinet::new("Kohl cabinet I", (1982, 10, 4), "CDU/CSU, FDP"),
    Cabinet::new("Kohl cabinet II", (1983, 3, 30), "CDU/CSU, FDP"),
    Cabinet::new("Kohl cabinet III", (1987, 3, 12), "CDU/CSU, FDP"),
    Cabinet::new("Kohl cabinet IV", (1991, 1, 18), "CDU/CSU, FDP"),
    Cabinet::new("Kohl cabinet V", (1994, 11, 17), "CDU/CSU, FDP"),
    Cabinet::new("Schröder cabinet I", (1998, 10, 27), "SPD, Bündnis 90/Die Grünen"),
    Cabinet::new("Schröder cabinet II", (2002, 10, 22), "SPD, Bündnis 90/Die Grünen"),
    Cabinet::new("Merkel cabinet I", (2005, 11, 22), "CDU/CSU, SPD"),
    Cabinet::new("Merkel cabinet II", (2009, 10, 28), "CDU/CSU, FDP"),
    Cabinet::new("Merkel cabinet III", (2013, 12, 17), "CDU/CSU, SPD"),
    Cabinet::new("Merkel cabinet IV", (2018, 3, 14), "CDU/CSU, SPD"),
    Cabinet::new("Scholz cabinet", (2021, 12, 8), "SPD, Bündnis 90/Die Grünen, FDP"),
    Cabinet::new("Merz cabinet", (2025, 5, 6), "CDU/CSU, SPD"),
];

/// Name, email and timestamp of a commit author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSignature {
    pub name: String,
    pub email: String,
    pub timestamp: DateTime<Utc>,
}

/// Lookup of the cabinet in office on a date, bounded by `until`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CabinetTimeline {
    until: NaiveDate,
}

impl CabinetTimeline {
    /// Timeline whose last cabinet is open-ended until `until` (exclusive).
    pub fn until(until: NaiveDate) -> Self {
        Self { until }
    }

    /// Timeline covering every day up to and including today (UTC).
    pub fn current() -> Self {
        let today = Utc::now().date_naive();
        Self::until(today.succ_opt().unwrap_or(today))
    }

    pub fn cabinet_at(&self, date: NaiveDate) -> Result<&'static Cabinet, HistoryError> {
        if date >= self.until {
            return Err(HistoryError::NoCabinet(date));
        }
        let index = CABINETS.partition_point(|cabinet| cabinet.start() <= date);
        // partition_point is 0 when every cabinet starts after `date`
        index
            .checked_sub(1)
            .map(|i| &CABINETS[i])
            .ok_or(HistoryError::NoCabinet(date))
    }

    /// Signature of the cabinet in office on `date`, stamped at midnight UTC.
    pub fn signature_for(&self, date: NaiveDate) -> Result<AuthorSignature, HistoryError> {
        let cabinet = self.cabinet_at(date)?;
        Ok(AuthorSignature {
            name: cabinet.name.to_string(),
            email: cabinet.email(),
            timestamp: date.and_time(NaiveTime::MIN).and_utc(),
        })
    }
}
