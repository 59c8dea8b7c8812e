//! The convergence engine: ordered, guarded, platform-filtered resource runs.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::bundle::BundleResolver;
use crate::error::ConvergeError;
use crate::executor::{
    DisclosureExecutor, FileExecutor, PackageExecutor, PeriodicExecutor, ResourceExecutor,
    ScriptExecutor, ServiceExecutor,
};
use crate::host::{PackageManager, ServiceManager, TaskRunner};
use crate::platform::Platform;
use crate::reporter::Reporter;
use crate::resource::{Check, Guard, ResourceDeclaration, ResourceKind};
use crate::template::TemplateRenderer;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Bundle includes nested deeper than this are treated as a declaration bug.
const MAX_BUNDLE_DEPTH: u32 = 8;

/// Per-resource outcome of a convergence run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The resource was out of desired state and its action ran.
    Applied,
    /// The guard or state check found the resource already converged.
    SkippedGuardSatisfied,
    /// The declaration's platform predicate excluded the detected platform.
    SkippedPlatformMismatch,
    /// The state check or action failed; the detail is the executor's error.
    Failed { error: String },
}

impl Outcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(
            self,
            Outcome::SkippedGuardSatisfied | Outcome::SkippedPlatformMismatch
        )
    }
}

/// One entry in the run's durable result record.
#[derive(Debug, Clone)]
pub struct ResourceResult {
    /// Declaration name; bundle-expanded resources carry a `bundle::` prefix.
    pub name: String,
    pub kind: &'static str,
    pub outcome: Outcome,
    pub duration_ms: u64,
}

/// Ordered record of what a run attempted and what happened, one entry per
/// declaration (plus entries for bundle-expanded declarations).
#[derive(Debug)]
pub struct RunReport {
    pub platform: Platform,
    pub results: Vec<ResourceResult>,
}

impl RunReport {
    /// True when no resource failed. Skips are not failures.
    pub fn succeeded(&self) -> bool {
        !self.results.iter().any(|r| r.outcome.is_failed())
    }

    pub fn failures(&self) -> Vec<&ResourceResult> {
        self.results
            .iter()
            .filter(|r| r.outcome.is_failed())
            .collect()
    }

    /// Names of resources whose action actually ran, in declaration order.
    pub fn applied_names(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| r.outcome == Outcome::Applied)
            .map(|r| r.name.as_str())
            .collect()
    }
}

/// Engine knobs.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Stop at the first failed resource instead of recording and continuing.
    pub fail_fast: bool,
    /// Deadline for a single state check, guard command, or apply action.
    pub timeout: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            fail_fast: false,
            timeout: Duration::from_secs(60),
        }
    }
}

/// One executor per resource kind. Fields are public so tests can install
/// spies for individual kinds.
pub struct ExecutorSet {
    pub disclosure: Arc<dyn ResourceExecutor>,
    pub script: Arc<dyn ResourceExecutor>,
    pub package: Arc<dyn ResourceExecutor>,
    pub service: Arc<dyn ResourceExecutor>,
    pub file: Arc<dyn ResourceExecutor>,
    pub periodic: Arc<dyn ResourceExecutor>,
}

impl ExecutorSet {
    /// Wire the standard executors over the given collaborators.
    pub fn standard(
        packages: Arc<dyn PackageManager>,
        services: Arc<dyn ServiceManager>,
        tasks: Arc<dyn TaskRunner>,
        renderer: Arc<dyn TemplateRenderer>,
        reporter: Arc<dyn Reporter>,
        state_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            disclosure: Arc::new(DisclosureExecutor::new(reporter)),
            script: Arc::new(ScriptExecutor::new(tasks.clone())),
            package: Arc::new(PackageExecutor::new(packages)),
            service: Arc::new(ServiceExecutor::new(services)),
            file: Arc::new(FileExecutor::new(renderer)),
            periodic: Arc::new(PeriodicExecutor::new(tasks, state_dir)),
        }
    }

    /// The executor for a kind; external bundles are expanded by the engine
    /// itself and have none.
    fn for_kind(&self, kind: &ResourceKind) -> Option<&Arc<dyn ResourceExecutor>> {
        match kind {
            ResourceKind::Disclosure { .. } => Some(&self.disclosure),
            ResourceKind::Script { .. } => Some(&self.script),
            ResourceKind::Package { .. } => Some(&self.package),
            ResourceKind::Service { .. } => Some(&self.service),
            ResourceKind::File { .. } => Some(&self.file),
            ResourceKind::PeriodicTask { .. } => Some(&self.periodic),
            ResourceKind::ExternalBundle { .. } => None,
        }
    }
}

/// Applies an ordered declaration sequence to the host.
///
/// Declarations run strictly in author order; the engine does no dependency
/// resolution and never rolls back earlier successes when a later resource
/// fails. The result sequence is the durable record of the run.
pub struct ConvergenceEngine {
    executors: ExecutorSet,
    bundles: Arc<dyn BundleResolver>,
    options: RunOptions,
}

impl ConvergenceEngine {
    pub fn new(executors: ExecutorSet, bundles: Arc<dyn BundleResolver>) -> Self {
        Self {
            executors,
            bundles,
            options: RunOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Converge the host: walk the declarations in order and record one
    /// outcome per declaration whose handling was attempted.
    pub async fn run(
        &self,
        platform: Platform,
        declarations: &[ResourceDeclaration],
    ) -> RunReport {
        tracing::info!(
            "[ConvergenceEngine] Starting run on {} with {} declarations",
            platform,
            declarations.len()
        );

        let mut results = Vec::new();
        self.run_sequence(platform, declarations, None, 0, &mut results)
            .await;

        let report = RunReport { platform, results };
        if report.succeeded() {
            tracing::info!(
                "[ConvergenceEngine] Run complete: {} resources, all converged",
                report.results.len()
            );
        } else {
            tracing::warn!(
                "[ConvergenceEngine] Run complete with {} failure(s)",
                report.failures().len()
            );
        }
        report
    }

    /// Walk one declaration sequence. Returns false when a fail-fast stop was
    /// requested by the options.
    fn run_sequence<'a>(
        &'a self,
        platform: Platform,
        declarations: &'a [ResourceDeclaration],
        prefix: Option<String>,
        depth: u32,
        results: &'a mut Vec<ResourceResult>,
    ) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            for decl in declarations {
                let display_name = match &prefix {
                    Some(p) => format!("{}::{}", p, decl.name),
                    None => decl.name.clone(),
                };

                if !decl.platforms.matches(platform) {
                    tracing::debug!(
                        "[ConvergenceEngine] {} does not apply on {}",
                        display_name,
                        platform
                    );
                    results.push(ResourceResult {
                        name: display_name,
                        kind: decl.kind.label(),
                        outcome: Outcome::SkippedPlatformMismatch,
                        duration_ms: 0,
                    });
                    continue;
                }

                if let ResourceKind::ExternalBundle { bundle } = &decl.kind {
                    let proceed = self
                        .expand_bundle(platform, decl, bundle, &display_name, &prefix, depth, results)
                        .await;
                    if !proceed {
                        return false;
                    }
                    continue;
                }

                let start = Instant::now();
                let outcome = self.converge_one(decl, &display_name).await;
                let failed = outcome.is_failed();
                results.push(ResourceResult {
                    name: display_name,
                    kind: decl.kind.label(),
                    outcome,
                    duration_ms: start.elapsed().as_millis() as u64,
                });

                if failed && self.options.fail_fast {
                    tracing::warn!("[ConvergenceEngine] Stopping run (fail-fast)");
                    return false;
                }
            }
            true
        })
    }

    /// Resolve a named bundle and apply its declarations in place, as if
    /// inlined. Expanded resources carry the bundle identifier in their
    /// result names so failures inside the bundle stay traceable.
    #[allow(clippy::too_many_arguments)]
    async fn expand_bundle(
        &self,
        platform: Platform,
        decl: &ResourceDeclaration,
        bundle: &str,
        display_name: &str,
        prefix: &Option<String>,
        depth: u32,
        results: &mut Vec<ResourceResult>,
    ) -> bool {
        let start = Instant::now();

        if depth >= MAX_BUNDLE_DEPTH {
            let error = ConvergeError::BundleDepthExceeded(bundle.to_string()).to_string();
            tracing::error!("[ConvergenceEngine] {}", error);
            results.push(ResourceResult {
                name: display_name.to_string(),
                kind: decl.kind.label(),
                outcome: Outcome::Failed { error },
                duration_ms: start.elapsed().as_millis() as u64,
            });
            return !self.options.fail_fast;
        }

        let expanded = match self.bundles.resolve(bundle) {
            Ok(expanded) => expanded,
            Err(e) => {
                tracing::error!("[ConvergenceEngine] {}: {}", display_name, e);
                results.push(ResourceResult {
                    name: display_name.to_string(),
                    kind: decl.kind.label(),
                    outcome: Outcome::Failed {
                        error: e.to_string(),
                    },
                    duration_ms: start.elapsed().as_millis() as u64,
                });
                return !self.options.fail_fast;
            }
        };

        tracing::info!(
            "[ConvergenceEngine] Including bundle '{}' ({} declarations)",
            bundle,
            expanded.len()
        );
        results.push(ResourceResult {
            name: display_name.to_string(),
            kind: decl.kind.label(),
            outcome: Outcome::Applied,
            duration_ms: start.elapsed().as_millis() as u64,
        });

        let child_prefix = match prefix {
            Some(p) => format!("{}::{}", p, bundle),
            None => bundle.to_string(),
        };
        self.run_sequence(platform, &expanded, Some(child_prefix), depth + 1, results)
            .await
    }

    /// Guard check, state check, then apply, each bounded by the timeout.
    async fn converge_one(&self, decl: &ResourceDeclaration, display_name: &str) -> Outcome {
        if let Some(guard) = &decl.guard {
            match self.guard_satisfied(guard, display_name).await {
                Ok(true) => {
                    tracing::debug!("[ConvergenceEngine] {} guard satisfied", display_name);
                    return Outcome::SkippedGuardSatisfied;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::error!("[ConvergenceEngine] {} guard check failed: {}", display_name, e);
                    return Outcome::Failed {
                        error: e.to_string(),
                    };
                }
            }
        }

        let executor = match self.executors.for_kind(&decl.kind) {
            Some(executor) => executor,
            None => {
                return Outcome::Failed {
                    error: format!("no executor for {} resource", decl.kind.label()),
                }
            }
        };

        match tokio::time::timeout(self.options.timeout, executor.test(decl)).await {
            Ok(Ok(true)) => {
                tracing::debug!("[ConvergenceEngine] {} already in desired state", display_name);
                return Outcome::SkippedGuardSatisfied;
            }
            Ok(Ok(false)) => {}
            Ok(Err(e)) => {
                let error = ConvergeError::TestFailed {
                    resource: display_name.to_string(),
                    detail: e.to_string(),
                };
                tracing::error!("[ConvergenceEngine] {}", error);
                return Outcome::Failed {
                    error: error.to_string(),
                };
            }
            Err(_) => {
                return self.timeout_outcome(display_name);
            }
        }

        match tokio::time::timeout(self.options.timeout, executor.apply(decl)).await {
            Ok(Ok(())) => {
                tracing::info!("[ConvergenceEngine] Applied {}", display_name);
                Outcome::Applied
            }
            Ok(Err(e)) => {
                let error = ConvergeError::ApplyFailed {
                    resource: display_name.to_string(),
                    detail: e.to_string(),
                };
                tracing::error!("[ConvergenceEngine] {}", error);
                Outcome::Failed {
                    error: error.to_string(),
                }
            }
            Err(_) => self.timeout_outcome(display_name),
        }
    }

    fn timeout_outcome(&self, display_name: &str) -> Outcome {
        let error = ConvergeError::Timeout {
            resource: display_name.to_string(),
            seconds: self.options.timeout.as_secs(),
        };
        tracing::error!("[ConvergenceEngine] {}", error);
        Outcome::Failed {
            error: error.to_string(),
        }
    }

    /// Evaluate an explicit declaration guard against current host state.
    async fn guard_satisfied(
        &self,
        guard: &Guard,
        display_name: &str,
    ) -> Result<bool, ConvergeError> {
        let (check, invert) = match guard {
            // not_if: skip when the check passes.
            Guard::NotIf(check) => (check, false),
            // only_if: skip when the check does not pass.
            Guard::OnlyIf(check) => (check, true),
        };

        let passed = match check {
            Check::PathExists(path) => path.exists(),
            Check::CommandSucceeds(argv) => {
                let (program, args) = argv.split_first().ok_or_else(|| {
                    ConvergeError::Command(format!("empty guard command for '{}'", display_name))
                })?;
                let status = tokio::time::timeout(
                    self.options.timeout,
                    tokio::process::Command::new(program).args(args).status(),
                )
                .await
                .map_err(|_| ConvergeError::Timeout {
                    resource: display_name.to_string(),
                    seconds: self.options.timeout.as_secs(),
                })?
                .map_err(|e| ConvergeError::Command(format!("guard spawn {}: {}", program, e)))?;
                status.success()
            }
        };

        Ok(if invert { !passed } else { passed })
    }
}
