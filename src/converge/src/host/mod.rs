//! External collaborator seams: package manager, service manager, task runner.
//!
//! The engine only depends on the traits; the concrete backends here shell
//! out to the host's own tooling (`apt-get`/`dpkg-query`, `choco`,
//! `systemctl`, `sc`). Tests substitute in-memory fakes.

mod package;
mod service;
mod task;

pub use package::{AptPackageManager, ChocoPackageManager};
pub use service::{SystemdServiceManager, WindowsServiceManager};
pub use task::ShellTaskRunner;

use async_trait::async_trait;
use std::process::Output;

use crate::error::ConvergeError;

/// Platform package manager invocation.
#[async_trait]
pub trait PackageManager: Send + Sync {
    /// Whether the named package is already present. Side-effect-free.
    async fn is_installed(&self, name: &str) -> Result<bool, ConvergeError>;
    /// Install the named package.
    async fn install(&self, name: &str) -> Result<(), ConvergeError>;
}

/// Service manager invocation.
#[async_trait]
pub trait ServiceManager: Send + Sync {
    async fn is_enabled(&self, name: &str) -> Result<bool, ConvergeError>;
    async fn is_running(&self, name: &str) -> Result<bool, ConvergeError>;
    async fn enable(&self, name: &str) -> Result<(), ConvergeError>;
    async fn start(&self, name: &str) -> Result<(), ConvergeError>;
}

/// Runs a named command on the host (scripts, periodic tasks).
#[async_trait]
pub trait TaskRunner: Send + Sync {
    async fn run(&self, name: &str, command: &[String]) -> Result<(), ConvergeError>;
}

/// Spawn a command and capture its output. Spawn failures map to
/// [`ConvergeError::Command`]; exit status is left for the caller to judge.
pub(crate) async fn run_command(argv: &[String]) -> Result<Output, ConvergeError> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| ConvergeError::Command("empty command".to_string()))?;

    tokio::process::Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| ConvergeError::Command(format!("failed to spawn {}: {}", program, e)))
}

/// Last stderr line of a failed command, for compact error detail.
pub(crate) fn last_stderr_line(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr)
        .lines()
        .last()
        .unwrap_or("no output available")
        .to_string()
}
