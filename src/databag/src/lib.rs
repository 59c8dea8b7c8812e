//! Encrypted data-bag store.
//!
//! Secrets live as named items inside named bags, encrypted with AES-256-GCM
//! under a key derived from a locally held key file. Key and ciphertext are
//! stored separately on purpose: compromising the bag store alone does not
//! disclose plaintext.

mod error;
mod key;
mod store;

pub use error::SecretError;
pub use key::{load_key, SecretKey};
pub use store::{DataBagStore, SecretRecord};
