//! Reporting sink for intentional secret disclosure.
//!
//! Disclosure resources reveal a decrypted value on purpose. The sink is a
//! separate seam from diagnostic logging so operators can route, filter, or
//! silence revealed values independently of everything else the run logs.

/// Receives human-readable disclosure messages.
pub trait Reporter: Send + Sync {
    fn disclose(&self, message: &str);
}

/// Emits disclosures as warnings under the dedicated `disclosure` target.
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn disclose(&self, message: &str) {
        tracing::warn!(target: "disclosure", "{}", message);
    }
}
