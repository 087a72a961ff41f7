use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::gazette::Gazette;

/// Reference to where and when a law (or its latest amendment) was published.
///
/// A citation without `month`/`day` is partial: it names a page in a yearly
/// volume but cannot be ordered against other citations until a date lookup
/// has filled in the publication day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub gazette: Gazette,
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub page: Option<u32>,
    pub index: Option<String>,
}

impl Citation {
    /// Citation with a full publication date.
    pub fn dated(gazette: Gazette, date: NaiveDate, page: Option<u32>) -> Self {
        Self {
            gazette,
            year: date.year(),
            month: Some(date.month()),
            day: Some(date.day()),
            page,
            index: None,
        }
    }

    /// Citation addressing `page` of the `year` volume, without a day.
    pub fn partial(gazette: Gazette, year: i32, page: u32) -> Self {
        Self {
            gazette,
            year,
            month: None,
            day: None,
            page: Some(page),
            index: None,
        }
    }

    /// Publication date, when every component is present and valid.
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month?, self.day?)
    }

    pub fn is_partial(&self) -> bool {
        self.date().is_none()
    }

    /// Fill in the publication date reported by a date lookup.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.year = date.year();
        self.month = Some(date.month());
        self.day = Some(date.day());
        self
    }

    /// Promote to a [`DatedCitation`], handing the citation back if it is partial.
    pub fn into_dated(self) -> Result<DatedCitation, Citation> {
        match self.date() {
            Some(date) => Ok(DatedCitation {
                citation: self,
                date,
            }),
            None => Err(self),
        }
    }
}

impl fmt::Display for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.date() {
            Some(date) => write!(f, "{} v. {}", self.gazette, date.format("%d.%m.%Y"))?,
            None => write!(f, "{} {}", self.gazette, self.year)?,
        }
        if let Some(page) = self.page {
            write!(f, " S. {page}")?;
        }
        if let Some(index) = &self.index {
            write!(f, " {index}")?;
        }
        Ok(())
    }
}

/// A citation whose publication date is known. Only these take part in ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatedCitation {
    citation: Citation,
    date: NaiveDate,
}

impl DatedCitation {
    pub fn citation(&self) -> &Citation {
        &self.citation
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn gazette(&self) -> &Gazette {
        &self.citation.gazette
    }
}

impl fmt::Display for DatedCitation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.citation.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn partial_citation_has_no_date() {
        let cit = Citation::partial(Gazette::BgblI, 2019, 58);
        assert!(cit.is_partial());
        assert!(cit.clone().into_dated().is_err());
    }

    #[test]
    fn date_lookup_completes_partial_citation() {
        let cit = Citation::partial(Gazette::BgblI, 2019, 58).with_date(ymd(2019, 2, 5));
        let dated = cit.into_dated().expect("fully dated");
        assert_eq!(dated.date(), ymd(2019, 2, 5));
        assert_eq!(dated.citation().page, Some(58));
        assert_eq!(dated.gazette(), &Gazette::BgblI);
    }

    #[test]
    fn impossible_dates_stay_partial() {
        let cit = Citation {
            gazette: Gazette::BgblI,
            year: 2019,
            month: Some(2),
            day: Some(30),
            page: Some(1),
            index: None,
        };
        assert!(cit.is_partial());
    }

    #[test]
    fn display_formats() {
        let dated = Citation::dated(Gazette::BgblI, ymd(2017, 4, 27), Some(980));
        assert_eq!(dated.to_string(), "BGBl I v. 27.04.2017 S. 980");
        let partial = Citation::partial(Gazette::BgblII, 1998, 1666);
        assert_eq!(partial.to_string(), "BGBl II 1998 S. 1666");
    }
}
