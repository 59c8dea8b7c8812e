//! Bag/item lookup and authenticated encryption of records.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::SecretError;
use crate::key::SecretKey;

const ENVELOPE_VERSION: u32 = 1;
const ENVELOPE_CIPHER: &str = "aes-256-gcm";
const NONCE_LEN: usize = 12;

/// On-disk envelope for one encrypted item.
#[derive(Debug, Serialize, Deserialize)]
struct EncryptedItem {
    id: String,
    version: u32,
    cipher: String,
    nonce: String,
    ciphertext: String,
}

/// Decrypted field mapping for one item. Owned by the caller that requested
/// decryption; the store keeps no copy.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretRecord {
    pub name: String,
    pub version: u32,
    fields: BTreeMap<String, String>,
}

impl SecretRecord {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn into_fields(self) -> BTreeMap<String, String> {
        self.fields
    }
}

// Field values are plaintext secrets; keep them out of debug output.
impl fmt::Debug for SecretRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretRecord")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("fields", &format!("<{} redacted>", self.fields.len()))
            .finish()
    }
}

/// Filesystem-backed store of encrypted items: `<root>/<bag>/<item>.json`.
pub struct DataBagStore {
    root: PathBuf,
}

impl DataBagStore {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn item_path(&self, bag: &str, item: &str) -> PathBuf {
        self.root.join(bag).join(format!("{}.json", item))
    }

    /// Associated data binds the ciphertext to its bag location, so a record
    /// copied to another bag/item no longer authenticates.
    fn associated_data(bag: &str, item: &str) -> Vec<u8> {
        format!("databag::{}/{}", bag, item).into_bytes()
    }

    /// Decrypt the named item. The GCM tag is verified before any field value
    /// is produced; a wrong key yields `DecryptionFailed` and no partial data.
    pub fn decrypt(
        &self,
        key: &SecretKey,
        bag: &str,
        item: &str,
    ) -> Result<SecretRecord, SecretError> {
        let path = self.item_path(bag, item);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            tracing::debug!("[DataBagStore] Cannot read {}: {}", path.display(), e);
            SecretError::RecordNotFound {
                bag: bag.to_string(),
                item: item.to_string(),
            }
        })?;

        let envelope: EncryptedItem =
            serde_json::from_str(&content).map_err(|e| SecretError::RecordMalformed {
                bag: bag.to_string(),
                item: item.to_string(),
                detail: e.to_string(),
            })?;

        if envelope.version != ENVELOPE_VERSION || envelope.cipher != ENVELOPE_CIPHER {
            return Err(SecretError::RecordMalformed {
                bag: bag.to_string(),
                item: item.to_string(),
                detail: format!(
                    "unsupported envelope (version {}, cipher {})",
                    envelope.version, envelope.cipher
                ),
            });
        }

        let nonce_bytes = BASE64.decode(&envelope.nonce).map_err(|e| {
            SecretError::RecordMalformed {
                bag: bag.to_string(),
                item: item.to_string(),
                detail: format!("nonce: {}", e),
            }
        })?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(SecretError::RecordMalformed {
                bag: bag.to_string(),
                item: item.to_string(),
                detail: format!("nonce is {} bytes, expected {}", nonce_bytes.len(), NONCE_LEN),
            });
        }
        let ciphertext = BASE64.decode(&envelope.ciphertext).map_err(|e| {
            SecretError::RecordMalformed {
                bag: bag.to_string(),
                item: item.to_string(),
                detail: format!("ciphertext: {}", e),
            }
        })?;

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.bytes()));
        let aad = Self::associated_data(bag, item);
        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(&nonce_bytes),
                Payload {
                    msg: &ciphertext,
                    aad: &aad,
                },
            )
            .map_err(|_| SecretError::DecryptionFailed {
                bag: bag.to_string(),
                item: item.to_string(),
            })?;

        let fields: BTreeMap<String, String> =
            serde_json::from_slice(&plaintext).map_err(|e| SecretError::RecordMalformed {
                bag: bag.to_string(),
                item: item.to_string(),
                detail: format!("plaintext payload: {}", e),
            })?;

        tracing::debug!(
            "[DataBagStore] Decrypted {}/{} ({} fields)",
            bag,
            item,
            fields.len()
        );
        Ok(SecretRecord {
            name: envelope.id,
            version: envelope.version,
            fields,
        })
    }

    /// Seal a field mapping into the named item, creating bag directories as
    /// needed. Used by operator tooling and tests.
    pub fn encrypt(
        &self,
        key: &SecretKey,
        bag: &str,
        item: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<(), SecretError> {
        let plaintext = serde_json::to_vec(fields).map_err(|e| SecretError::RecordMalformed {
            bag: bag.to_string(),
            item: item.to_string(),
            detail: format!("serialize fields: {}", e),
        })?;

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.bytes()));
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let aad = Self::associated_data(bag, item);
        let ciphertext = cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: &plaintext,
                    aad: &aad,
                },
            )
            .map_err(|e| SecretError::RecordMalformed {
                bag: bag.to_string(),
                item: item.to_string(),
                detail: format!("encrypt: {}", e),
            })?;

        let envelope = EncryptedItem {
            id: item.to_string(),
            version: ENVELOPE_VERSION,
            cipher: ENVELOPE_CIPHER.to_string(),
            nonce: BASE64.encode(nonce),
            ciphertext: BASE64.encode(ciphertext),
        };

        let path = self.item_path(bag, item);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&envelope).map_err(|e| {
            SecretError::RecordMalformed {
                bag: bag.to_string(),
                item: item.to_string(),
                detail: format!("serialize envelope: {}", e),
            }
        })?;
        std::fs::write(&path, content)?;

        tracing::info!("[DataBagStore] Sealed {}/{}", bag, item);
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
