//! Shell task runner for script and periodic-task resources.

use async_trait::async_trait;

use super::{last_stderr_line, run_command, TaskRunner};
use crate::error::ConvergeError;

/// Runs a command directly on the host and judges it by exit status.
pub struct ShellTaskRunner;

#[async_trait]
impl TaskRunner for ShellTaskRunner {
    async fn run(&self, name: &str, command: &[String]) -> Result<(), ConvergeError> {
        tracing::info!("[ShellTaskRunner] Running task '{}'", name);
        let start = std::time::Instant::now();

        let output = run_command(command).await?;

        if !output.status.success() {
            tracing::warn!(
                "[ShellTaskRunner] Task '{}' failed after {}ms",
                name,
                start.elapsed().as_millis()
            );
            return Err(ConvergeError::Command(format!(
                "task '{}' failed (exit {:?}): {}",
                name,
                output.status.code(),
                last_stderr_line(&output),
            )));
        }

        tracing::info!(
            "[ShellTaskRunner] Task '{}' completed in {}ms",
            name,
            start.elapsed().as_millis()
        );
        Ok(())
    }
}
