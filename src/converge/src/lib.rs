//! Single-host convergence engine.
//!
//! A recipe is an ordered sequence of [`ResourceDeclaration`]s — declarative
//! units of desired host state. The [`ConvergenceEngine`] walks the sequence,
//! skips declarations whose platform predicate excludes the detected
//! [`Platform`], checks each resource's current-state guard, and applies only
//! what is missing. Repeated runs against an already-converged host produce
//! no redundant side effects.

pub mod bundle;
pub mod engine;
pub mod error;
pub mod executor;
pub mod host;
pub mod platform;
pub mod reporter;
pub mod resource;
pub mod template;

pub use bundle::{BundleRegistry, BundleResolver};
pub use engine::{ConvergenceEngine, ExecutorSet, Outcome, ResourceResult, RunOptions, RunReport};
pub use error::ConvergeError;
pub use executor::ResourceExecutor;
pub use host::{PackageManager, ServiceManager, TaskRunner};
pub use platform::{Platform, PlatformPredicate};
pub use reporter::{Reporter, TracingReporter};
pub use resource::{Check, Guard, ResourceDeclaration, ResourceKind};
pub use template::{TemplateRenderer, TeraRenderer};
