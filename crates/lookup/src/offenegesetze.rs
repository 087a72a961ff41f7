//! Publication dates of Bundesgesetzblatt pages via the offenegesetze.de API.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use citation::Gazette;
use reqwest::Client;
use serde::Deserialize;

use crate::error::LookupError;
use crate::lookup::DateLookup;

pub const DEFAULT_API_URL: &str = "https://api.offenegesetze.de/v1/veroeffentlichung/";

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Deserialize)]
struct Listing {
    results: Vec<Publication>,
}

#[derive(Debug, Deserialize)]
struct Publication {
    date: String,
}

#[derive(Debug, Clone)]
pub struct OffeneGesetzeClient {
    client: Client,
    api_url: String,
}

impl OffeneGesetzeClient {
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self, LookupError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.to_string(),
        })
    }
}

#[async_trait]
impl DateLookup for OffeneGesetzeClient {
    async fn resolve_date(&self, gazette: &Gazette, year: i32, page: u32) -> Result<NaiveDate, LookupError> {
        let part = gazette
            .bgbl_part()
            .ok_or_else(|| LookupError::Unsupported(gazette.to_string()))?;
        let body = self
            .client
            .get(&self.api_url)
            .query(&[
                ("year", year.to_string()),
                ("kind", format!("bgbl{part}")),
                ("page", page.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_listing(&body).map_err(|err| match err {
            LookupError::NotFound(_) => LookupError::NotFound(format!("{gazette} {year} S. {page}")),
            other => other,
        })
    }
}

/// Date of the first publication in an API listing.
pub fn parse_listing(body: &str) -> Result<NaiveDate, LookupError> {
    let listing: Listing = serde_json::from_str(body).map_err(|err| LookupError::Decode(err.to_string()))?;
    let first = listing
        .results
        .first()
        .ok_or_else(|| LookupError::NotFound("empty listing".to_string()))?;
    NaiveDateTime::parse_from_str(&first.date, DATE_FORMAT)
        .map(|stamp| stamp.date())
        .map_err(|err| LookupError::Decode(format!("{}: {err}", first.date)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_result_date_is_used() {
        let body = r#"{"count": 2, "results": [
            {"id": 1, "date": "2019-02-05T00:00:00Z", "kind": "bgbl1", "year": 2019, "page": 54},
            {"id": 2, "date": "2019-02-12T00:00:00Z", "kind": "bgbl1", "year": 2019, "page": 98}
        ]}"#;
        assert_eq!(parse_listing(body).unwrap(), NaiveDate::from_ymd_opt(2019, 2, 5).unwrap());
    }

    #[test]
    fn empty_results_are_not_found() {
        assert!(matches!(
            parse_listing(r#"{"count": 0, "results": []}"#),
            Err(LookupError::NotFound(_))
        ));
    }

    #[test]
    fn malformed_bodies_fail_to_decode() {
        assert!(matches!(parse_listing("<html>"), Err(LookupError::Decode(_))));
        assert!(matches!(
            parse_listing(r#"{"results": [{"date": "05.02.2019"}]}"#),
            Err(LookupError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn non_bgbl_gazettes_are_rejected_before_any_request() {
        let client = OffeneGesetzeClient::new("http://127.0.0.1:9/", Duration::from_millis(50)).unwrap();
        let err = client.resolve_date(&Gazette::VkBl, 1960, 1).await.unwrap_err();
        assert!(matches!(err, LookupError::Unsupported(_)));
    }
}
