//! Service manager backends (systemd, Windows SCM).

use async_trait::async_trait;

use super::{last_stderr_line, run_command, ServiceManager};
use crate::error::ConvergeError;

/// Linux backend over `systemctl`.
pub struct SystemdServiceManager;

impl SystemdServiceManager {
    async fn systemctl(&self, args: &[&str]) -> Result<std::process::Output, ConvergeError> {
        let mut argv: Vec<String> = vec!["systemctl".into()];
        argv.extend(args.iter().map(|s| s.to_string()));
        run_command(&argv).await
    }
}

#[async_trait]
impl ServiceManager for SystemdServiceManager {
    async fn is_enabled(&self, name: &str) -> Result<bool, ConvergeError> {
        // `is-enabled` exits non-zero for disabled units; only the output
        // distinguishes "disabled" from a real failure, so treat any clean
        // answer as a state report.
        let output = self.systemctl(&["is-enabled", name]).await?;
        let state = String::from_utf8_lossy(&output.stdout);
        Ok(state.trim() == "enabled")
    }

    async fn is_running(&self, name: &str) -> Result<bool, ConvergeError> {
        let output = self.systemctl(&["is-active", name]).await?;
        let state = String::from_utf8_lossy(&output.stdout);
        Ok(state.trim() == "active")
    }

    async fn enable(&self, name: &str) -> Result<(), ConvergeError> {
        tracing::info!("[SystemdServiceManager] Enabling {}", name);
        let output = self.systemctl(&["enable", name]).await?;
        if !output.status.success() {
            return Err(ConvergeError::Command(format!(
                "systemctl enable {} failed: {}",
                name,
                last_stderr_line(&output),
            )));
        }
        Ok(())
    }

    async fn start(&self, name: &str) -> Result<(), ConvergeError> {
        tracing::info!("[SystemdServiceManager] Starting {}", name);
        let output = self.systemctl(&["start", name]).await?;
        if !output.status.success() {
            return Err(ConvergeError::Command(format!(
                "systemctl start {} failed: {}",
                name,
                last_stderr_line(&output),
            )));
        }
        Ok(())
    }
}

/// Windows backend over `sc.exe`.
pub struct WindowsServiceManager;

impl WindowsServiceManager {
    async fn sc(&self, args: &[&str]) -> Result<std::process::Output, ConvergeError> {
        let mut argv: Vec<String> = vec!["sc.exe".into()];
        argv.extend(args.iter().map(|s| s.to_string()));
        run_command(&argv).await
    }
}

#[async_trait]
impl ServiceManager for WindowsServiceManager {
    async fn is_enabled(&self, name: &str) -> Result<bool, ConvergeError> {
        let output = self.sc(&["qc", name]).await?;
        if !output.status.success() {
            return Err(ConvergeError::Command(format!(
                "sc qc {} failed: {}",
                name,
                last_stderr_line(&output),
            )));
        }
        let config = String::from_utf8_lossy(&output.stdout);
        Ok(config.contains("AUTO_START"))
    }

    async fn is_running(&self, name: &str) -> Result<bool, ConvergeError> {
        let output = self.sc(&["query", name]).await?;
        if !output.status.success() {
            return Err(ConvergeError::Command(format!(
                "sc query {} failed: {}",
                name,
                last_stderr_line(&output),
            )));
        }
        let state = String::from_utf8_lossy(&output.stdout);
        Ok(state.contains("RUNNING"))
    }

    async fn enable(&self, name: &str) -> Result<(), ConvergeError> {
        tracing::info!("[WindowsServiceManager] Enabling {}", name);
        let output = self.sc(&["config", name, "start=", "auto"]).await?;
        if !output.status.success() {
            return Err(ConvergeError::Command(format!(
                "sc config {} failed: {}",
                name,
                last_stderr_line(&output),
            )));
        }
        Ok(())
    }

    async fn start(&self, name: &str) -> Result<(), ConvergeError> {
        tracing::info!("[WindowsServiceManager] Starting {}", name);
        let output = self.sc(&["start", name]).await?;
        if !output.status.success() {
            return Err(ConvergeError::Command(format!(
                "sc start {} failed: {}",
                name,
                last_stderr_line(&output),
            )));
        }
        Ok(())
    }
}
