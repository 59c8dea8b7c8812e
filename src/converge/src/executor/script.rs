//! Script executor — guarded shell steps.

use std::sync::Arc;

use async_trait::async_trait;

use super::ResourceExecutor;
use crate::error::ConvergeError;
use crate::host::TaskRunner;
use crate::resource::{ResourceDeclaration, ResourceKind};

/// Runs a declared command through the [`TaskRunner`]. A script has no
/// intrinsic state check; idempotence comes from the declaration guard.
pub struct ScriptExecutor {
    runner: Arc<dyn TaskRunner>,
}

impl ScriptExecutor {
    pub fn new(runner: Arc<dyn TaskRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ResourceExecutor for ScriptExecutor {
    async fn test(&self, _decl: &ResourceDeclaration) -> Result<bool, ConvergeError> {
        Ok(false)
    }

    async fn apply(&self, decl: &ResourceDeclaration) -> Result<(), ConvergeError> {
        match &decl.kind {
            ResourceKind::Script { command } => self.runner.run(&decl.name, command).await,
            other => Err(ConvergeError::ApplyFailed {
                resource: decl.name.clone(),
                detail: format!("script executor got {} resource", other.label()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingRunner {
        runs: Mutex<Vec<(String, Vec<String>)>>,
    }

    #[async_trait]
    impl TaskRunner for RecordingRunner {
        async fn run(&self, name: &str, command: &[String]) -> Result<(), ConvergeError> {
            self.runs
                .lock()
                .unwrap()
                .push((name.to_string(), command.to_vec()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn apply_delegates_to_runner() {
        let runner = Arc::new(RecordingRunner {
            runs: Mutex::new(vec![]),
        });
        let executor = ScriptExecutor::new(runner.clone());
        let decl =
            ResourceDeclaration::script("bootstrap", vec!["echo".to_string(), "hi".to_string()]);

        executor.apply(&decl).await.unwrap();

        let runs = runner.runs.lock().unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].0, "bootstrap");
        assert_eq!(runs[0].1, vec!["echo".to_string(), "hi".to_string()]);
    }
}
