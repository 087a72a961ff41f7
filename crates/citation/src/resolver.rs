//! As-of citation extraction.
//!
//! Two strategies, tried in order:
//!
//! 1. [`from_amendment_annotation`] reads the last `standangabe/standkommentar`
//!    note ("Zuletzt geändert durch Art. 1 V v. 27.4.2017 I 980") and keeps the
//!    citation with the latest date among all matches in it.
//! 2. [`from_origin_publication`] reads the first `fundstelle` block
//!    (`periodikum` + `zitstelle`) describing where the law was first
//!    published. For most series this yields a partial citation (year and page
//!    only).
//!
//! Each strategy reports [`Extraction::Found`] or [`Extraction::NotFound`];
//! [`resolve`] takes the first hit.

use canonical::{LawDocument, XmlElement};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::citation::Citation;
use crate::error::CitationError;
use crate::gazette::Gazette;

static AMENDMENT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\w\.\s(\d{1,2})\.\s?(\d{1,2})\.(\d{4})\s(\w+)\s(\d+)")
        .expect("amendment pattern compiles")
});

static BANZ_AT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^AT (\d{1,2})\.(\d{1,2})\.(\d{4}) (\S+)").expect("BAnz AT pattern compiles")
});

static YEAR_PAGE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4}), (\d+)").expect("year/page pattern compiles"));

/// Outcome of a single extraction strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Found(Citation),
    NotFound,
}

impl Extraction {
    /// Keep a hit, otherwise evaluate the next strategy.
    pub fn or_else(self, next: impl FnOnce() -> Extraction) -> Extraction {
        match self {
            Extraction::Found(_) => self,
            Extraction::NotFound => next(),
        }
    }

    pub fn found(self) -> Option<Citation> {
        match self {
            Extraction::Found(citation) => Some(citation),
            Extraction::NotFound => None,
        }
    }
}

impl From<Option<Citation>> for Extraction {
    fn from(value: Option<Citation>) -> Self {
        value.map_or(Extraction::NotFound, Extraction::Found)
    }
}

/// Resolve the as-of citation of `doc`, trying the amendment annotation first.
pub fn resolve(doc: &LawDocument) -> Result<Citation, CitationError> {
    from_amendment_annotation(doc)
        .or_else(|| from_origin_publication(doc))
        .found()
        .ok_or(CitationError::NoCitation)
}

/// Alias of [`resolve`].
pub fn from_any(doc: &LawDocument) -> Result<Citation, CitationError> {
    resolve(doc)
}

/// Citation of the most recent amendment named in the last status annotation.
pub fn from_amendment_annotation(doc: &LawDocument) -> Extraction {
    let Some(note) = doc
        .root()
        .descendants("standangabe")
        .filter_map(|status| status.child("standkommentar"))
        .last()
    else {
        debug!("amendment_annotation_missing");
        return Extraction::NotFound;
    };
    parse_amendment_note(&note.text()).into()
}

/// Newest citation found in a free-text amendment note.
///
/// Matches whose date does not exist in the calendar are skipped. When two
/// matches share the newest date the later one wins.
pub fn parse_amendment_note(note: &str) -> Option<Citation> {
    AMENDMENT_PATTERN
        .captures_iter(note)
        .filter_map(|cap| {
            let day = cap[1].parse().ok()?;
            let month = cap[2].parse().ok()?;
            let year = cap[3].parse().ok()?;
            let date = NaiveDate::from_ymd_opt(year, month, day)?;
            let gazette = match &cap[4] {
                "I" => Gazette::BgblI,
                "II" => Gazette::BgblII,
                other => Gazette::parse(other),
            };
            let page = cap[5].parse().ok()?;
            Some(Citation::dated(gazette, date, Some(page)))
        })
        .max_by_key(|citation| citation.date())
}

/// Citation of the original publication, from the first `fundstelle` block.
pub fn from_origin_publication(doc: &LawDocument) -> Extraction {
    let Some(origin) = doc.root().descendants("fundstelle").next() else {
        debug!("origin_publication_missing");
        return Extraction::NotFound;
    };
    let (Some(periodical), Some(reference)) =
        (child_text(origin, "periodikum"), child_text(origin, "zitstelle"))
    else {
        return Extraction::NotFound;
    };
    parse_origin_reference(Gazette::parse(&periodical), &reference).into()
}

/// Parse a `zitstelle` reference string under the rules of its series.
pub fn parse_origin_reference(gazette: Gazette, reference: &str) -> Option<Citation> {
    if gazette == Gazette::BAnzAt {
        let cap = BANZ_AT_PATTERN.captures(reference)?;
        let day = cap[1].parse().ok()?;
        let month = cap[2].parse().ok()?;
        let year = cap[3].parse().ok()?;
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let mut citation = Citation::dated(gazette, date, None);
        citation.index = Some(cap[4].to_string());
        return Some(citation);
    }

    let cap = YEAR_PAGE_PATTERN.captures(reference)?;
    let year = cap[1].parse().ok()?;
    let page = cap[2].parse().ok()?;
    Some(Citation::partial(gazette, year, page))
}

fn child_text(el: &XmlElement, name: &str) -> Option<String> {
    el.child(name)
        .map(|child| child.text().trim().to_string())
        .filter(|text| !text.is_empty())
}
