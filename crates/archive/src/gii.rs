//! Snapshot source backed by gesetze-im-internet.de.
//!
//! The table of contents lists one `<link>` per law pointing at its zipped XML
//! export (`http://www.gesetze-im-internet.de/bgb/xml.zip`). The directory
//! name in front of `xml.zip` is the document id. Freshness is negotiated with
//! `ETag` / `If-None-Match`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ETAG, IF_NONE_MATCH};
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::error::ArchiveError;
use crate::source::{sanitize_version_token, DocumentLocation, FetchResponse, SnapshotSource};

pub const DEFAULT_GII_ROOT: &str = "http://www.gesetze-im-internet.de/";
pub const DEFAULT_TOC_PATH: &str = "gii-toc.xml";

#[derive(Debug, Clone)]
pub struct GiiSource {
    client: Client,
    toc_url: String,
}

impl GiiSource {
    pub fn new(root: &str, toc_path: &str, timeout: Duration) -> Result<Self, ArchiveError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, root, toc_path))
    }

    pub fn with_client(client: Client, root: &str, toc_path: &str) -> Self {
        let toc_url = format!(
            "{}/{}",
            root.trim_end_matches('/'),
            toc_path.trim_start_matches('/')
        );
        Self { client, toc_url }
    }

    pub fn toc_url(&self) -> &str {
        &self.toc_url
    }
}

#[async_trait]
impl SnapshotSource for GiiSource {
    async fn list_documents(&self) -> Result<Vec<DocumentLocation>, ArchiveError> {
        let body = self
            .client
            .get(&self.toc_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let documents = parse_toc(&body)?;
        debug!(toc = %self.toc_url, documents = documents.len(), "toc_loaded");
        Ok(documents)
    }

    async fn fetch(
        &self,
        location: &str,
        if_not_version: Option<&str>,
    ) -> Result<FetchResponse, ArchiveError> {
        let mut request = self.client.get(location);
        if let Some(token) = if_not_version {
            request = request.header(IF_NONE_MATCH, format!("\"{token}\""));
        }
        let response = request.send().await?;
        if response.status() == StatusCode::NOT_MODIFIED {
            return Ok(FetchResponse::NotModified);
        }
        let response = response.error_for_status()?;
        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ArchiveError::MissingVersionToken(location.to_string()))?;
        let version_token = token_from_etag(etag)?;
        let bytes = response.bytes().await?.to_vec();
        Ok(FetchResponse::Modified {
            bytes,
            version_token,
        })
    }
}

/// Document locations listed in a `gii-toc.xml` body.
pub fn parse_toc(xml: &str) -> Result<Vec<DocumentLocation>, ArchiveError> {
    let doc = roxmltree::Document::parse(xml).map_err(|err| ArchiveError::InvalidListing(err.to_string()))?;
    Ok(doc
        .descendants()
        .filter(|node| node.has_tag_name("link"))
        .filter_map(|node| node.text())
        .map(str::trim)
        .filter_map(|link| {
            document_id_from_url(link).map(|id| DocumentLocation::new(id, link))
        })
        .collect())
}

/// Name of the directory holding the export, e.g. `bgb` for `.../bgb/xml.zip`.
pub fn document_id_from_url(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next()?;
    let path = path.split_once("://").map_or(path, |(_, rest)| rest);
    let segments: Vec<&str> = path.split('/').collect();
    // host, directory, file name
    if segments.len() < 3 {
        return None;
    }
    // the id becomes a cache directory name
    match segments[segments.len() - 2] {
        "" | "." | ".." => None,
        dir => Some(dir),
    }
}

/// Version token carried by an `ETag` header: quotes and the weak marker removed.
pub fn token_from_etag(etag: &str) -> Result<String, ArchiveError> {
    let etag = etag.trim();
    let etag = etag.strip_prefix("W/").unwrap_or(etag);
    sanitize_version_token(etag.trim_matches('"'))
}
