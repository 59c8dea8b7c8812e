//! Resource executors — one per resource kind.
//!
//! Each executor knows how to test current state (side-effect-free) and how
//! to apply desired state. The engine calls `apply` only when the guard and
//! `test` report the resource out of its desired state.

mod disclosure;
mod file;
mod package;
mod periodic;
mod script;
mod service;

pub use disclosure::DisclosureExecutor;
pub use file::FileExecutor;
pub use package::PackageExecutor;
pub use periodic::PeriodicExecutor;
pub use script::ScriptExecutor;
pub use service::ServiceExecutor;

use async_trait::async_trait;

use crate::error::ConvergeError;
use crate::resource::ResourceDeclaration;

/// Common contract for all resource kinds.
#[async_trait]
pub trait ResourceExecutor: Send + Sync {
    /// Whether the resource is already in its desired state. Must be
    /// side-effect-free.
    async fn test(&self, decl: &ResourceDeclaration) -> Result<bool, ConvergeError>;

    /// Bring the resource into its desired state.
    async fn apply(&self, decl: &ResourceDeclaration) -> Result<(), ConvergeError>;
}
