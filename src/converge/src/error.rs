//! Engine and executor error types.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvergeError {
    /// A resource's current-state check could not be evaluated.
    #[error("state check failed for '{resource}': {detail}")]
    TestFailed { resource: String, detail: String },
    /// A resource's apply action failed.
    #[error("apply failed for '{resource}': {detail}")]
    ApplyFailed { resource: String, detail: String },
    /// An external call exceeded the configured deadline.
    #[error("'{resource}' timed out after {seconds}s")]
    Timeout { resource: String, seconds: u64 },
    /// An external command could not be spawned or exited non-zero.
    #[error("command failed: {0}")]
    Command(String),
    /// Template lookup or rendering failed.
    #[error("template error: {0}")]
    Template(String),
    /// A named bundle has no registered declaration sequence.
    #[error("bundle not found: {0}")]
    BundleUnresolved(String),
    /// Bundle includes nested deeper than the engine allows.
    #[error("bundle '{0}' exceeds maximum include depth")]
    BundleDepthExceeded(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("state file error: {0}")]
    State(String),
}
