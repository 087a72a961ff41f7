use std::fmt;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use canonical::LawDocument;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ArchiveError;

/// File extension of stored snapshots.
pub const SNAPSHOT_EXTENSION: &str = "zip";

/// Upper bound for the XML member of a snapshot archive.
pub const MAX_DOCUMENT_BYTES: u64 = 512 * 1024 * 1024;

/// One stored copy of a document, located at
/// `{root}/{fetch_date}/{document_id}/{version_token}.zip`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Snapshot {
    pub document_id: String,
    pub fetch_date: NaiveDate,
    pub version_token: String,
    pub path: PathBuf,
}

impl Snapshot {
    /// Recover the descriptor from a path inside the archive rooted at `root`.
    ///
    /// Returns `None` for anything that does not follow the archive layout.
    pub fn from_path(root: &Path, path: &Path) -> Option<Snapshot> {
        if path.extension()?.to_str()? != SNAPSHOT_EXTENSION {
            return None;
        }
        let relative = path.strip_prefix(root).ok()?;
        let parts: Vec<&str> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<_>>()?;
        if parts.len() < 3 {
            return None;
        }
        let fetch_date = NaiveDate::parse_from_str(parts[0], "%Y-%m-%d").ok()?;
        let document_id = parts[1..parts.len() - 1].join("/");
        let version_token = path.file_stem()?.to_str()?.to_string();
        Some(Snapshot {
            document_id,
            fetch_date,
            version_token,
            path: path.to_path_buf(),
        })
    }

    pub fn read_bytes(&self) -> Result<Vec<u8>, ArchiveError> {
        std::fs::read(&self.path).map_err(|err| ArchiveError::io(&self.path, err))
    }

    /// Unpack and parse the document contained in this snapshot.
    pub fn read_document(&self) -> Result<LawDocument, ArchiveError> {
        let xml = extract_xml(&self.read_bytes()?)?;
        Ok(LawDocument::parse(&xml)?)
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}/{}", self.document_id, self.fetch_date, self.version_token)
    }
}

/// Text of the single `*.xml` member of a snapshot archive.
pub fn extract_xml(bytes: &[u8]) -> Result<String, ArchiveError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut xml_members = Vec::new();
    for i in 0..archive.len() {
        if archive.by_index(i)?.name().to_ascii_lowercase().ends_with(".xml") {
            xml_members.push(i);
        }
    }
    let [index] = xml_members.as_slice() else {
        return Err(ArchiveError::MalformedArchive(format!(
            "expected exactly one xml member, found {}",
            xml_members.len()
        )));
    };

    let mut member = archive.by_index(*index)?;
    if member.size() > MAX_DOCUMENT_BYTES {
        return Err(ArchiveError::MalformedArchive(format!(
            "xml member {} exceeds {} bytes",
            member.name(),
            MAX_DOCUMENT_BYTES
        )));
    }
    let mut xml = String::new();
    member
        .read_to_string(&mut xml)
        .map_err(|err| ArchiveError::MalformedArchive(err.to_string()))?;
    Ok(xml)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Write;

    use super::*;

    pub(crate) fn zip_with(members: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in members {
            writer
                .start_file(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn parses_archive_layout() {
        let root = Path::new("/data/laws");
        let snap = Snapshot::from_path(root, Path::new("/data/laws/2019-05-02/bgb/abc123.zip")).unwrap();
        assert_eq!(snap.document_id, "bgb");
        assert_eq!(snap.fetch_date, NaiveDate::from_ymd_opt(2019, 5, 2).unwrap());
        assert_eq!(snap.version_token, "abc123");
    }

    #[test]
    fn rejects_foreign_paths() {
        let root = Path::new("/data/laws");
        assert!(Snapshot::from_path(root, Path::new("/data/laws/2019-05-02/bgb/notes.txt")).is_none());
        assert!(Snapshot::from_path(root, Path::new("/data/laws/latest/bgb/a.zip")).is_none());
        assert!(Snapshot::from_path(root, Path::new("/data/laws/bgb.zip")).is_none());
        assert!(Snapshot::from_path(root, Path::new("/elsewhere/2019-05-02/bgb/a.zip")).is_none());
    }

    #[test]
    fn extracts_single_xml_member() {
        let bytes = zip_with(&[("BJNR001950896.xml", "<dokumente/>"), ("readme.txt", "x")]);
        assert_eq!(extract_xml(&bytes).unwrap(), "<dokumente/>");
    }

    #[test]
    fn multiple_or_missing_xml_is_malformed() {
        let none = zip_with(&[("readme.txt", "x")]);
        assert!(matches!(extract_xml(&none), Err(ArchiveError::MalformedArchive(_))));
        let two = zip_with(&[("a.xml", "<a/>"), ("b.xml", "<b/>")]);
        assert!(matches!(extract_xml(&two), Err(ArchiveError::MalformedArchive(_))));
        assert!(matches!(extract_xml(b"not a zip"), Err(ArchiveError::MalformedArchive(_))));
    }
}
