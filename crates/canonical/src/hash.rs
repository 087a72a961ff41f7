//! Canonical fingerprints for parsed law documents.
//!
//! # Algorithm
//!
//! ```text
//! SHA-256(version.to_be_bytes() || 0x00 || canonical_tree_bytes)
//! ```
//!
//! `canonical_tree_bytes` is a length-prefixed pre-order encoding of the tree
//! after every volatile attribute has been erased:
//!
//! ```text
//! element := 0x45 'E' || str(name) || u32(attr_count) || (str(key) || str(value))* || u32(child_count) || node*
//! text    := 0x54 'T' || str(text)
//! str(s)  := u32(len) || utf8 bytes
//! ```
//!
//! Attributes are sorted by name before encoding, so the attribute order
//! chosen by the exporter never influences the digest. Everything else
//! (element names, attribute values, text content, child order) does.
//!
//! # Examples
//!
//! ```rust
//! use canonical::{fingerprint, FingerprintConfig, LawDocument};
//!
//! let a = LawDocument::parse(r#"<norm builddate="1">x</norm>"#).unwrap();
//! let b = LawDocument::parse(r#"<norm builddate="2">x</norm>"#).unwrap();
//! let cfg = FingerprintConfig::default();
//!
//! assert_eq!(fingerprint(&a, &cfg).unwrap(), fingerprint(&b, &cfg).unwrap());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::FingerprintConfig;
use crate::document::{LawDocument, XmlElement, XmlNode};
use crate::error::CanonicalError;

/// Fixed-width content digest of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Compute the canonical fingerprint of `doc` under `cfg`.
pub fn fingerprint(doc: &LawDocument, cfg: &FingerprintConfig) -> Result<Fingerprint, CanonicalError> {
    cfg.validate()?;

    let mut stripped = doc.root().clone();
    for name in &cfg.volatile_attributes {
        stripped = stripped.without_attribute(name);
    }

    let mut bytes = Vec::new();
    encode_element(&stripped, &mut bytes);
    Ok(hash_canonical_bytes(cfg.version, &bytes))
}

/// Hash already-encoded canonical bytes under a serialization version.
pub fn hash_canonical_bytes(canonical_version: u32, canonical_bytes: &[u8]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(canonical_version.to_be_bytes());
    hasher.update([0]);
    hasher.update(canonical_bytes);
    Fingerprint(hasher.finalize().into())
}

fn encode_element(el: &XmlElement, out: &mut Vec<u8>) {
    out.push(b'E');
    encode_str(&el.name, out);

    let mut attributes: Vec<&(String, String)> = el.attributes.iter().collect();
    attributes.sort();
    encode_len(attributes.len(), out);
    for (key, value) in attributes {
        encode_str(key, out);
        encode_str(value, out);
    }

    encode_len(el.children.len(), out);
    for child in &el.children {
        match child {
            XmlNode::Element(child) => encode_element(child, out),
            XmlNode::Text(text) => {
                out.push(b'T');
                encode_str(text, out);
            }
        }
    }
}

fn encode_str(s: &str, out: &mut Vec<u8>) {
    encode_len(s.len(), out);
    out.extend_from_slice(s.as_bytes());
}

fn encode_len(len: usize, out: &mut Vec<u8>) {
    // Documents beyond 4 GiB never reach this point; the archive reader caps them.
    out.extend_from_slice(&(len as u32).to_be_bytes());
}
