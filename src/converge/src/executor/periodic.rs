//! Periodic task executor — run a command at most once per frequency window.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ResourceExecutor;
use crate::error::ConvergeError;
use crate::host::TaskRunner;
use crate::resource::{ResourceDeclaration, ResourceKind};

/// Persisted record of a task's last successful run.
#[derive(Debug, Serialize, Deserialize)]
struct PeriodicState {
    task: String,
    last_run: DateTime<Utc>,
}

/// Checks elapsed time since the last successful run against the declared
/// frequency; records a new timestamp only after the task succeeds, so a
/// failed run is retried on the next converge.
pub struct PeriodicExecutor {
    runner: Arc<dyn TaskRunner>,
    state_dir: PathBuf,
}

impl PeriodicExecutor {
    pub fn new(runner: Arc<dyn TaskRunner>, state_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            state_dir: state_dir.into(),
        }
    }

    fn state_path(&self, task: &str) -> PathBuf {
        let file_name = task.trim().replace(['/', ' '], "_");
        self.state_dir.join("periodic").join(format!("{}.json", file_name))
    }

    fn load_state(path: &Path) -> Result<Option<PeriodicState>, ConvergeError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        let state = serde_json::from_str(&content)
            .map_err(|e| ConvergeError::State(format!("parse {}: {}", path.display(), e)))?;
        Ok(Some(state))
    }

    fn store_state(path: &Path, state: &PeriodicState) -> Result<(), ConvergeError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(state)
            .map_err(|e| ConvergeError::State(format!("serialize {}: {}", path.display(), e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[async_trait]
impl ResourceExecutor for PeriodicExecutor {
    async fn test(&self, decl: &ResourceDeclaration) -> Result<bool, ConvergeError> {
        let (task, frequency) = match &decl.kind {
            ResourceKind::PeriodicTask { task, frequency, .. } => (task, *frequency),
            other => {
                return Err(ConvergeError::TestFailed {
                    resource: decl.name.clone(),
                    detail: format!("periodic executor got {} resource", other.label()),
                })
            }
        };

        let state = match Self::load_state(&self.state_path(task))? {
            Some(state) => state,
            None => return Ok(false),
        };

        let elapsed = Utc::now().signed_duration_since(state.last_run);
        let window = chrono::Duration::from_std(frequency)
            .map_err(|e| ConvergeError::State(format!("frequency out of range: {}", e)))?;
        Ok(elapsed < window)
    }

    async fn apply(&self, decl: &ResourceDeclaration) -> Result<(), ConvergeError> {
        let (task, command) = match &decl.kind {
            ResourceKind::PeriodicTask { task, command, .. } => (task, command),
            other => {
                return Err(ConvergeError::ApplyFailed {
                    resource: decl.name.clone(),
                    detail: format!("periodic executor got {} resource", other.label()),
                })
            }
        };

        self.runner.run(task, command).await?;

        let state = PeriodicState {
            task: task.clone(),
            last_run: Utc::now(),
        };
        Self::store_state(&self.state_path(task), &state)?;
        Ok(())
    }
}
