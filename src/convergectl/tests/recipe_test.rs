//! End-to-end recipe tests over fake host backends: per-platform sequences,
//! idempotent re-runs, failure isolation, and secret fail-fast.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use converge::{
    ConvergeError, Outcome, PackageManager, Platform, Reporter, ServiceManager, TaskRunner,
    TeraRenderer,
};
use convergectl::config::{PathsConfig, SecretsConfig};
use convergectl::{converge_with, standard_bundles, Collaborators, RunError, RunnerConfig};
use databag::{DataBagStore, SecretError, SecretKey};

// ---------------------------------------------------------------------------
// Fake host backends
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakePackages {
    installed: Mutex<HashSet<String>>,
    install_calls: Mutex<Vec<String>>,
}

#[async_trait]
impl PackageManager for FakePackages {
    async fn is_installed(&self, name: &str) -> Result<bool, ConvergeError> {
        Ok(self.installed.lock().unwrap().contains(name))
    }

    async fn install(&self, name: &str) -> Result<(), ConvergeError> {
        self.install_calls.lock().unwrap().push(name.to_string());
        self.installed.lock().unwrap().insert(name.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct FakeServices {
    enabled: Mutex<HashSet<String>>,
    running: Mutex<HashSet<String>>,
    fail_start: bool,
}

#[async_trait]
impl ServiceManager for FakeServices {
    async fn is_enabled(&self, name: &str) -> Result<bool, ConvergeError> {
        Ok(self.enabled.lock().unwrap().contains(name))
    }

    async fn is_running(&self, name: &str) -> Result<bool, ConvergeError> {
        Ok(self.running.lock().unwrap().contains(name))
    }

    async fn enable(&self, name: &str) -> Result<(), ConvergeError> {
        self.enabled.lock().unwrap().insert(name.to_string());
        Ok(())
    }

    async fn start(&self, name: &str) -> Result<(), ConvergeError> {
        if self.fail_start {
            return Err(ConvergeError::Command(format!(
                "service manager refused to start {}",
                name
            )));
        }
        self.running.lock().unwrap().insert(name.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct FakeTasks {
    runs: Mutex<Vec<String>>,
}

#[async_trait]
impl TaskRunner for FakeTasks {
    async fn run(&self, name: &str, _command: &[String]) -> Result<(), ConvergeError> {
        self.runs.lock().unwrap().push(name.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct CollectingReporter {
    messages: Mutex<Vec<String>>,
}

impl Reporter for CollectingReporter {
    fn disclose(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    _dir: tempfile::TempDir,
    config: RunnerConfig,
    packages: Arc<FakePackages>,
    services: Arc<FakeServices>,
    tasks: Arc<FakeTasks>,
    reporter: Arc<CollectingReporter>,
}

impl Harness {
    /// Sealed bag + key file + tempdir-relative paths for everything the
    /// recipe touches.
    fn new() -> Self {
        Self::with_services(FakeServices::default())
    }

    fn with_services(services: FakeServices) -> Self {
        let dir = tempfile::tempdir().unwrap();

        let key_path = dir.path().join("secret_key");
        std::fs::write(&key_path, "host key material for the tests\n").unwrap();
        let key = SecretKey::from_material(b"host key material for the tests").unwrap();

        let bag_dir = dir.path().join("data_bags");
        let store = DataBagStore::open(&bag_dir);
        let mut fields = BTreeMap::new();
        fields.insert("password".to_string(), "secret123".to_string());
        store.encrypt(&key, "my_secrets", "db_config", &fields).unwrap();

        let config = RunnerConfig {
            secrets: SecretsConfig {
                key_path: Some(key_path),
                bag_dir: Some(bag_dir),
                bag: "my_secrets".to_string(),
                item: "db_config".to_string(),
            },
            run: Default::default(),
            paths: PathsConfig {
                state_dir: Some(dir.path().join("state")),
                linux_doc_root: Some(dir.path().join("www")),
                windows_doc_root: Some(dir.path().join("htdocs")),
            },
        };

        Self {
            _dir: dir,
            config,
            packages: Arc::new(FakePackages::default()),
            services: Arc::new(services),
            tasks: Arc::new(FakeTasks::default()),
            reporter: Arc::new(CollectingReporter::default()),
        }
    }

    fn collaborators(&self) -> Collaborators {
        let renderer =
            TeraRenderer::from_embedded(convergectl::templates::ALL_TEMPLATES).unwrap();
        Collaborators {
            packages: self.packages.clone(),
            services: self.services.clone(),
            tasks: self.tasks.clone(),
            renderer: Arc::new(renderer),
            reporter: self.reporter.clone(),
            bundles: Arc::new(standard_bundles()),
        }
    }

    async fn run(&self, platform: Platform) -> Result<converge::RunReport, RunError> {
        converge_with(&self.config, platform, self.collaborators()).await
    }
}

// ---------------------------------------------------------------------------
// Per-platform sequences
// ---------------------------------------------------------------------------

#[tokio::test]
async fn windows_run_applies_the_five_step_sequence_in_order() {
    let harness = Harness::new();
    let report = harness.run(Platform::WindowsFamily).await.unwrap();

    assert!(report.succeeded());
    assert_eq!(
        report.applied_names(),
        vec![
            "reveal db_config",
            "bootstrap chocolatey",
            "install apache-httpd",
            "enable and start apache",
            "render homepage",
        ]
    );

    let messages = harness.reporter.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(
        messages[0],
        "WINDOWS SUCCESS! The decrypted password is: secret123"
    );
}

#[tokio::test]
async fn linux_run_substitutes_update_and_include_steps() {
    let harness = Harness::new();
    let report = harness.run(Platform::LinuxFamily).await.unwrap();

    assert!(report.succeeded());
    assert_eq!(
        report.applied_names(),
        vec![
            "reveal db_config",
            "periodic apt update",
            "include git",
            "git::install git",
            "install apache2",
            "enable and start apache2",
            "render homepage",
        ]
    );

    // The bundle's package install went through the same package manager.
    let installs = harness.packages.install_calls.lock().unwrap();
    let installs: Vec<&str> = installs.iter().map(String::as_str).collect();
    assert_eq!(installs, vec!["git", "apache2"]);

    // The homepage landed with the declared content.
    let homepage = harness
        .config
        .paths
        .linux_doc_root
        .as_ref()
        .unwrap()
        .join("index.html");
    let content = std::fs::read_to_string(homepage).unwrap();
    assert!(content.contains("linux"));
}

// ---------------------------------------------------------------------------
// Idempotence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_linux_run_produces_no_redundant_side_effects() {
    let harness = Harness::new();
    harness.run(Platform::LinuxFamily).await.unwrap();
    let second = harness.run(Platform::LinuxFamily).await.unwrap();

    assert!(second.succeeded());
    // Only the disclosure step and the bundle expansion re-run; every host
    // mutation is guarded off.
    assert_eq!(second.applied_names(), vec!["reveal db_config", "include git"]);

    let installs = harness.packages.install_calls.lock().unwrap();
    assert_eq!(installs.len(), 2, "no package installed twice");
    let tasks = harness.tasks.runs.lock().unwrap();
    assert_eq!(
        tasks.len(),
        1,
        "apt update stays inside its daily frequency window"
    );
}

// ---------------------------------------------------------------------------
// Failure isolation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn service_failure_does_not_abort_the_file_step() {
    let harness = Harness::with_services(FakeServices {
        fail_start: true,
        ..FakeServices::default()
    });
    let report = harness.run(Platform::LinuxFamily).await.unwrap();

    assert!(!report.succeeded());
    let failed: Vec<&str> = report.failures().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(failed, vec!["enable and start apache2"]);

    // The file step after the failed service still got a result and applied.
    let homepage_result = report
        .results
        .iter()
        .find(|r| r.name == "render homepage" && r.outcome == Outcome::Applied);
    assert!(homepage_result.is_some(), "file step ran despite service failure");
}

// ---------------------------------------------------------------------------
// Secret fail-fast
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_key_aborts_before_any_executor_invocation() {
    let mut harness = Harness::new();
    harness.config.secrets.key_path = Some(PathBuf::from("/no/such/secret_key"));

    let err = harness.run(Platform::LinuxFamily).await.unwrap_err();
    assert!(matches!(err, RunError::Secret(SecretError::KeyNotFound(_))));

    assert!(harness.packages.install_calls.lock().unwrap().is_empty());
    assert!(harness.tasks.runs.lock().unwrap().is_empty());
    assert!(harness.reporter.messages.lock().unwrap().is_empty());
}

#[tokio::test]
async fn wrong_key_aborts_with_decryption_failed() {
    let harness = Harness::new();
    let key_path = harness.config.secrets.key_path.clone().unwrap();
    std::fs::write(&key_path, "a different key than the one that sealed\n").unwrap();

    let err = harness.run(Platform::LinuxFamily).await.unwrap_err();
    assert!(matches!(
        err,
        RunError::Secret(SecretError::DecryptionFailed { .. })
    ));
    assert!(harness.packages.install_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unclassified_platform_skips_every_recipe_resource() {
    let harness = Harness::new();
    let report = harness.run(Platform::Other).await.unwrap();

    assert!(report.succeeded());
    assert!(report.applied_names().is_empty());
    assert!(report
        .results
        .iter()
        .all(|r| r.outcome == Outcome::SkippedPlatformMismatch));
}
