//! Wires secrets, collaborators, and the engine into one converge run.

use std::sync::Arc;
use std::time::Duration;

use converge::host::{
    AptPackageManager, ChocoPackageManager, ShellTaskRunner, SystemdServiceManager,
    WindowsServiceManager,
};
use converge::{
    BundleResolver, ConvergenceEngine, ExecutorSet, PackageManager, Platform, Reporter,
    RunOptions, RunReport, ServiceManager, TaskRunner, TemplateRenderer, TeraRenderer,
    TracingReporter,
};
use databag::{load_key, DataBagStore, SecretError};
use thiserror::Error;

use crate::config::RunnerConfig;
use crate::recipe::{standard_bundles, webserver_recipe, RecipeParams};
use crate::templates;

#[derive(Debug, Error)]
pub enum RunError {
    /// Secret retrieval failed; the run is aborted before any resource.
    #[error(transparent)]
    Secret(#[from] SecretError),
    /// The decrypted record is missing a field the recipe needs.
    #[error("secret record has no '{0}' field")]
    MissingSecretField(String),
    #[error("{0}")]
    Setup(String),
}

/// External collaborators for one run. Tests inject fakes here.
pub struct Collaborators {
    pub packages: Arc<dyn PackageManager>,
    pub services: Arc<dyn ServiceManager>,
    pub tasks: Arc<dyn TaskRunner>,
    pub renderer: Arc<dyn TemplateRenderer>,
    pub reporter: Arc<dyn Reporter>,
    pub bundles: Arc<dyn BundleResolver>,
}

impl Collaborators {
    /// Real host backends for the platform. Unclassified hosts get the
    /// linux-family backends; the recipe's predicates keep them idle there.
    pub fn for_platform(platform: Platform) -> Result<Self, RunError> {
        let (packages, services): (Arc<dyn PackageManager>, Arc<dyn ServiceManager>) =
            match platform {
                Platform::WindowsFamily => {
                    (Arc::new(ChocoPackageManager), Arc::new(WindowsServiceManager))
                }
                _ => (Arc::new(AptPackageManager), Arc::new(SystemdServiceManager)),
            };

        let renderer = TeraRenderer::from_embedded(templates::ALL_TEMPLATES)
            .map_err(|e| RunError::Setup(format!("failed to load embedded templates: {}", e)))?;

        Ok(Self {
            packages,
            services,
            tasks: Arc::new(ShellTaskRunner),
            renderer: Arc::new(renderer),
            reporter: Arc::new(TracingReporter),
            bundles: Arc::new(standard_bundles()),
        })
    }
}

/// Converge the host with real backends.
pub async fn converge_host(
    config: &RunnerConfig,
    platform: Platform,
) -> Result<RunReport, RunError> {
    let collaborators = Collaborators::for_platform(platform)?;
    converge_with(config, platform, collaborators).await
}

/// Converge with caller-supplied collaborators.
///
/// Secret retrieval runs first and any failure aborts the run before a
/// single executor is invoked: a run that cannot produce its credential must
/// not install software against an unverified configuration.
pub async fn converge_with(
    config: &RunnerConfig,
    platform: Platform,
    collaborators: Collaborators,
) -> Result<RunReport, RunError> {
    let key = load_key(&config.key_path(platform))?;
    let store = DataBagStore::open(config.bag_dir(platform));
    let record = store.decrypt(&key, &config.secrets.bag, &config.secrets.item)?;
    let password = record
        .get("password")
        .ok_or_else(|| RunError::MissingSecretField("password".to_string()))?
        .to_string();

    // The recipe deliberately reveals the credential through the disclosure
    // sink. Surface that up front so operators reviewing logs know the
    // reveal is declared behavior, not a leak.
    tracing::warn!(
        "recipe contains an explicit secret-disclosure step for {}/{}",
        config.secrets.bag,
        config.secrets.item
    );

    let mut params = RecipeParams::new(password);
    if let Some(doc_root) = &config.paths.linux_doc_root {
        params.linux_doc_root = doc_root.clone();
    }
    if let Some(doc_root) = &config.paths.windows_doc_root {
        params.windows_doc_root = doc_root.clone();
    }
    let declarations = webserver_recipe(&params);

    let executors = ExecutorSet::standard(
        collaborators.packages,
        collaborators.services,
        collaborators.tasks,
        collaborators.renderer,
        collaborators.reporter,
        config.state_dir(),
    );
    let engine = ConvergenceEngine::new(executors, collaborators.bundles).with_options(RunOptions {
        fail_fast: config.run.fail_fast,
        timeout: Duration::from_secs(config.run.timeout_secs),
    });

    Ok(engine.run(platform, &declarations).await)
}
