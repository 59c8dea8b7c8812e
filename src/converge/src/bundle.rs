//! Named, reusable declaration bundles.
//!
//! An external-bundle resource references a declaration sequence by name;
//! the engine resolves and expands it in place at run time.

use std::collections::HashMap;

use crate::error::ConvergeError;
use crate::resource::ResourceDeclaration;

/// Resolves a bundle name to its declaration sequence.
pub trait BundleResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Result<Vec<ResourceDeclaration>, ConvergeError>;
}

/// In-memory bundle registry.
#[derive(Default)]
pub struct BundleRegistry {
    bundles: HashMap<String, Vec<ResourceDeclaration>>,
}

impl BundleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, declarations: Vec<ResourceDeclaration>) {
        self.bundles.insert(name.into(), declarations);
    }
}

impl BundleResolver for BundleRegistry {
    fn resolve(&self, name: &str) -> Result<Vec<ResourceDeclaration>, ConvergeError> {
        self.bundles
            .get(name)
            .cloned()
            .ok_or_else(|| ConvergeError::BundleUnresolved(name.to_string()))
    }
}
