#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use lawgit::{
    ArchiveError, DateLookup, DocumentLocation, Gazette, LookupError, ProcedureLookup, SnapshotSource,
};
use lookup::ProcedureOutcome;
use zip::write::SimpleFileOptions;

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn zipped(xml: &str) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    writer.start_file("BJNR001950896.xml", SimpleFileOptions::default()).unwrap();
    writer.write_all(xml.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

/// A law export whose last amendment note reads `note`.
pub fn law(builddate: &str, title: &str, note: &str, text: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<dokumente builddate="{builddate}" doknr="BJNR001950896">
  <norm builddate="{builddate}" doknr="BJNR001950896BJNE000000000">
    <metadaten>
      <jurabk>{title}</jurabk>
      <langue>{title}</langue>
      <standangabe checked="ja"><standtyp>Stand</standtyp><standkommentar>{note}</standkommentar></standangabe>
    </metadaten>
  </norm>
  <norm builddate="{builddate}" doknr="BJNR001950896BJNE000100000">
    <metadaten><enbez>§ 1</enbez></metadaten>
    <textdaten><text format="XML"><Content><P>{text}</P></Content></text></textdaten>
  </norm>
</dokumente>"#
    )
}

/// A law export that only carries its original publication.
pub fn original_law(title: &str, periodical: &str, reference: &str) -> String {
    format!(
        r#"<dokumente builddate="20190101000000">
  <norm><metadaten><jurabk>{title}</jurabk>
    <fundstelle typ="amtlich"><periodikum>{periodical}</periodikum><zitstelle>{reference}</zitstelle></fundstelle>
  </metadaten></norm>
</dokumente>"#
    )
}

/// Remote exports keyed by location, with a request log.
#[derive(Default)]
pub struct StubSource {
    documents: Mutex<HashMap<String, (String, Vec<u8>)>>,
    pub requests: Mutex<Vec<(String, Option<String>)>>,
}

impl StubSource {
    pub fn publish(&self, document_id: &str, token: &str, xml: &str) {
        self.documents
            .lock()
            .unwrap()
            .insert(location(document_id), (token.to_string(), zipped(xml)));
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

pub fn location(document_id: &str) -> String {
    format!("http://www.gesetze-im-internet.de/{document_id}/xml.zip")
}

#[async_trait]
impl SnapshotSource for StubSource {
    async fn list_documents(&self) -> Result<Vec<DocumentLocation>, ArchiveError> {
        let mut ids: Vec<String> = self
            .documents
            .lock()
            .unwrap()
            .keys()
            .filter_map(|loc| archive::document_id_from_url(loc).map(str::to_string))
            .collect();
        ids.sort();
        Ok(ids.into_iter().map(|id| DocumentLocation::new(id.clone(), location(&id))).collect())
    }

    async fn fetch(&self, location: &str, if_not_version: Option<&str>) -> Result<archive::FetchResponse, ArchiveError> {
        self.requests
            .lock()
            .unwrap()
            .push((location.to_string(), if_not_version.map(str::to_string)));
        let documents = self.documents.lock().unwrap();
        let (token, bytes) = documents
            .get(location)
            .ok_or_else(|| ArchiveError::Status {
                url: location.to_string(),
                status: 404,
            })?;
        if if_not_version == Some(token.as_str()) {
            return Ok(archive::FetchResponse::NotModified);
        }
        Ok(archive::FetchResponse::Modified {
            bytes: bytes.clone(),
            version_token: token.clone(),
        })
    }
}

/// Procedure lookup that never finds anything.
pub struct NoProcedures;

#[async_trait]
impl ProcedureLookup for NoProcedures {
    async fn search(&self, _: &Gazette, _: i32, _: u32) -> Result<ProcedureOutcome, LookupError> {
        Ok(ProcedureOutcome::NotFound)
    }
}

/// Date lookup answering from a fixed table of (year, page).
pub struct TableDates(pub HashMap<(i32, u32), NaiveDate>);

#[async_trait]
impl DateLookup for TableDates {
    async fn resolve_date(&self, gazette: &Gazette, year: i32, page: u32) -> Result<NaiveDate, LookupError> {
        self.0
            .get(&(year, page))
            .copied()
            .ok_or_else(|| LookupError::NotFound(format!("{gazette} {year} S. {page}")))
    }
}
