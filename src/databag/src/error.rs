//! Secret store error types.
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretError {
    /// The key file is absent or unreadable.
    #[error("secret key not found at {0}")]
    KeyNotFound(PathBuf),
    /// The key file exists but its contents cannot serve as key material.
    #[error("secret key is malformed: {0}")]
    KeyMalformed(String),
    /// No encrypted item exists at the expected bag location.
    #[error("no encrypted record for {bag}/{item}")]
    RecordNotFound { bag: String, item: String },
    /// The record envelope cannot be parsed.
    #[error("encrypted record {bag}/{item} is malformed: {detail}")]
    RecordMalformed {
        bag: String,
        item: String,
        detail: String,
    },
    /// The key does not validate against the record's authentication tag.
    #[error("decryption failed for {bag}/{item}: key does not authenticate the record")]
    DecryptionFailed { bag: String, item: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
