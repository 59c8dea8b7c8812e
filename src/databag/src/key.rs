//! Secret key loading and derivation.

use std::fmt;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::SecretError;

/// Minimum bytes of raw key material; anything shorter is treated as a
/// truncated or corrupt key file rather than a weak-but-usable key.
const MIN_MATERIAL_LEN: usize = 16;

/// Opaque decryption key, derived once from the key file and held in memory
/// for a single run.
#[derive(Clone)]
pub struct SecretKey {
    bytes: [u8; 32],
}

impl SecretKey {
    /// Derive a key from raw file material: surrounding whitespace is
    /// ignored, the 256-bit key is the SHA-256 digest of what remains.
    pub fn from_material(material: &[u8]) -> Result<Self, SecretError> {
        let trimmed = trim_ascii_whitespace(material);
        if trimmed.len() < MIN_MATERIAL_LEN {
            return Err(SecretError::KeyMalformed(format!(
                "key material too short ({} bytes)",
                trimmed.len()
            )));
        }
        let digest = Sha256::digest(trimmed);
        Ok(Self {
            bytes: digest.into(),
        })
    }

    pub(crate) fn bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

// Key material never appears in logs or debug output.
impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(redacted)")
    }
}

fn trim_ascii_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map(|i| i + 1)
        .unwrap_or(start);
    &bytes[start..end]
}

/// Load the decryption key from a local file.
pub fn load_key(path: &Path) -> Result<SecretKey, SecretError> {
    let material = std::fs::read(path).map_err(|e| {
        tracing::debug!("[SecretKey] Cannot read {}: {}", path.display(), e);
        SecretError::KeyNotFound(path.to_path_buf())
    })?;
    let key = SecretKey::from_material(&material)?;
    tracing::debug!("[SecretKey] Loaded key material from {}", path.display());
    Ok(key)
}
