//! Package manager backends (apt, chocolatey).

use async_trait::async_trait;

use super::{last_stderr_line, run_command, PackageManager};
use crate::error::ConvergeError;

/// Debian-family backend: queries with `dpkg-query`, installs with `apt-get`.
pub struct AptPackageManager;

#[async_trait]
impl PackageManager for AptPackageManager {
    async fn is_installed(&self, name: &str) -> Result<bool, ConvergeError> {
        let argv: Vec<String> = vec![
            "dpkg-query".into(),
            "-W".into(),
            "-f=${Status}".into(),
            name.into(),
        ];
        let output = run_command(&argv).await?;
        // dpkg-query exits non-zero for unknown packages; that just means
        // "not installed", not an error.
        if !output.status.success() {
            return Ok(false);
        }
        let status = String::from_utf8_lossy(&output.stdout);
        Ok(status.contains("install ok installed"))
    }

    async fn install(&self, name: &str) -> Result<(), ConvergeError> {
        tracing::info!("[AptPackageManager] Installing {}", name);
        let argv: Vec<String> = vec![
            "apt-get".into(),
            "install".into(),
            "-y".into(),
            "--no-install-recommends".into(),
            name.into(),
        ];
        let output = run_command(&argv).await?;
        if !output.status.success() {
            return Err(ConvergeError::Command(format!(
                "apt-get install {} failed (exit {:?}): {}",
                name,
                output.status.code(),
                last_stderr_line(&output),
            )));
        }
        Ok(())
    }
}

/// Windows backend: queries and installs through `choco`.
pub struct ChocoPackageManager;

#[async_trait]
impl PackageManager for ChocoPackageManager {
    async fn is_installed(&self, name: &str) -> Result<bool, ConvergeError> {
        let argv: Vec<String> = vec![
            "choco".into(),
            "list".into(),
            "--local-only".into(),
            "--exact".into(),
            "--limit-output".into(),
            name.into(),
        ];
        let output = run_command(&argv).await?;
        if !output.status.success() {
            return Err(ConvergeError::Command(format!(
                "choco list {} failed (exit {:?}): {}",
                name,
                output.status.code(),
                last_stderr_line(&output),
            )));
        }
        // --limit-output prints one "name|version" line per hit.
        Ok(!String::from_utf8_lossy(&output.stdout).trim().is_empty())
    }

    async fn install(&self, name: &str) -> Result<(), ConvergeError> {
        tracing::info!("[ChocoPackageManager] Installing {}", name);
        let argv: Vec<String> = vec!["choco".into(), "install".into(), "-y".into(), name.into()];
        let output = run_command(&argv).await?;
        if !output.status.success() {
            return Err(ConvergeError::Command(format!(
                "choco install {} failed (exit {:?}): {}",
                name,
                output.status.code(),
                last_stderr_line(&output),
            )));
        }
        Ok(())
    }
}
