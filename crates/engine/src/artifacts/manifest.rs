//! Optional bundle manifest: version string and per-file checksums

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Contents of `manifest.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// File name to lowercase hex SHA256
    #[serde(default)]
    pub checksums: BTreeMap<String, String>,
}

impl Manifest {
    /// Verify `bytes` against the checksum recorded for `file`, if any
    pub fn verify(&self, file: &str, bytes: &[u8]) -> Result<(), String> {
        let Some(expected) = self.checksums.get(file) else {
            return Ok(());
        };
        let computed = compute_checksum(bytes);
        if computed.eq_ignore_ascii_case(expected.trim()) {
            Ok(())
        } else {
            Err(format!(
                "checksum mismatch: manifest records {}, file hashes to {}",
                expected, computed
            ))
        }
    }
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
