//! Procedure search on the Bundestag documentation system (DIP).
//!
//! The search form only answers requests carrying the session cookies handed
//! out by the landing page, so [`DipClient::connect`] visits it once with a
//! cookie-storing client. Every search posts the full advanced-search form;
//! the server rejects requests that omit the unused fields.

use std::time::Duration;

use async_trait::async_trait;
use citation::Gazette;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use tracing::debug;

use crate::error::LookupError;
use crate::lookup::{ProcedureLookup, ProcedureOutcome, ProcedureRecord};

pub const DEFAULT_LANDING_URL: &str = "http://dipbt.bundestag.de/dip21.web/bt";
pub const DEFAULT_SEARCH_URL: &str =
    "http://dipbt.bundestag.de/dip21.web/searchProcedures/advanced_search_list.do";

static RESULT_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<table[^>]*class="[^"]*tabelle[^"]*"[^>]*>.*?</table>"#).expect("result table pattern compiles")
});

static RESULT_CELL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<td[\s>]").expect("result cell pattern compiles"));

/// Form fields the search expects besides gazette, volume and page.
const FIXED_FIELDS: &[(&str, &str)] = &[
    ("drsId", ""),
    ("plprId", ""),
    ("aeDrsId", ""),
    ("aePlprId", ""),
    ("vorgangId", ""),
    ("procedureContext", ""),
    ("vpId", ""),
    ("formChanged", "false"),
    ("promptUser", "false"),
    ("overrideChanged", "true"),
    ("javascriptActive", "yes"),
    ("personId", ""),
    ("personNachname", ""),
    ("prompt", "no"),
    ("anchor", ""),
    ("wahlperiodeaktualisiert", "false"),
    ("wahlperiode", ""),
    ("startDatum", ""),
    ("endDatum", ""),
    ("includeVorgangstyp", "UND"),
    ("nummer", ""),
    ("suchwort", ""),
    ("suchwortUndSchlagwort", "ODER"),
    ("schlagwort1", ""),
    ("linkSchlagwort2", "UND"),
    ("schlagwort2", ""),
    ("linkSchlagwort3", "UND"),
    ("schlagwort3", ""),
    ("unterbegriffsTiefe", "0"),
    ("sachgebiet", ""),
    ("includeKu", "UND"),
    ("ressort", ""),
    ("nachname", ""),
    ("vorname", ""),
    ("heftnummer", ""),
    ("verkuendungStartDatum", ""),
    ("verkuendungEndDatum", ""),
    ("btBrBeteiligung", "alle"),
    ("gestaOrdnungsnummer", ""),
    ("beratungsstand", ""),
    ("signaturParlamentsarchiv", ""),
    ("method", "Suchen"),
];

#[derive(Debug, Clone)]
pub struct DipClient {
    client: Client,
    search_url: String,
}

impl DipClient {
    /// Build a cookie-storing client and pick up a session from `landing_url`.
    pub async fn connect(landing_url: &str, search_url: &str, timeout: Duration) -> Result<Self, LookupError> {
        let client = Client::builder().cookie_store(true).timeout(timeout).build()?;
        client.get(landing_url).send().await?.error_for_status()?;
        debug!(landing_url, "dip_session_ready");
        Ok(Self {
            client,
            search_url: search_url.to_string(),
        })
    }
}

#[async_trait]
impl ProcedureLookup for DipClient {
    async fn search(&self, gazette: &Gazette, year: i32, page: u32) -> Result<ProcedureOutcome, LookupError> {
        let form = search_form(gazette, year, page)?;
        let html = self
            .client
            .post(&self.search_url)
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(match crop_result_list(&html) {
            Some(markup) => ProcedureOutcome::Found(ProcedureRecord::new(markup)),
            None => ProcedureOutcome::NotFound,
        })
    }
}

/// Form body for an advanced search by publication reference.
pub fn search_form(gazette: &Gazette, year: i32, page: u32) -> Result<Vec<(&'static str, String)>, LookupError> {
    if gazette.bgbl_part().is_none() {
        return Err(LookupError::Unsupported(gazette.to_string()));
    }
    let mut form = vec![
        ("verkuendungsblatt", gazette.to_string()),
        ("jahrgang", year.to_string()),
        ("seite", page.to_string()),
    ];
    form.extend(FIXED_FIELDS.iter().map(|(key, value)| (*key, value.to_string())));
    Ok(form)
}

/// The result table of a search page, or `None` when it lists nothing.
pub fn crop_result_list(html: &str) -> Option<String> {
    let table = RESULT_TABLE.find(html)?.as_str();
    RESULT_CELL.is_match(table).then(|| table.to_string())
}
