//! Configuration for canonical fingerprints.
//!
//! # Versioning
//!
//! The `version` field is part of every digest. Any change to the canonical
//! serialization (even bug fixes) must be accompanied by a version bump so
//! that fingerprints from different versions never compare equal by accident.
//!
//! # Examples
//!
//! ```rust
//! use canonical::FingerprintConfig;
//!
//! let config = FingerprintConfig::default();
//! assert_eq!(config.version, 1);
//! assert_eq!(config.volatile_attributes, vec!["builddate".to_string()]);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::CanonicalError;

/// Attribute stamped on every export by the publisher's build process.
pub const BUILD_TIMESTAMP_ATTRIBUTE: &str = "builddate";

/// Configuration for [`fingerprint`](crate::fingerprint).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FingerprintConfig {
    /// Version of the canonical serialization. Must be >= 1.
    pub version: u32,

    /// Attribute names erased everywhere in the tree before hashing.
    pub volatile_attributes: Vec<String>,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            version: 1,
            volatile_attributes: vec![BUILD_TIMESTAMP_ATTRIBUTE.to_string()],
        }
    }
}

impl FingerprintConfig {
    /// Reject configurations that would produce ambiguous digests.
    pub fn validate(&self) -> Result<(), CanonicalError> {
        if self.version == 0 {
            return Err(CanonicalError::InvalidConfig(
                "config version must be >= 1".into(),
            ));
        }
        if self.volatile_attributes.iter().any(|name| name.trim().is_empty()) {
            return Err(CanonicalError::InvalidConfig(
                "volatile attribute names must be non-empty".into(),
            ));
        }
        Ok(())
    }
}
