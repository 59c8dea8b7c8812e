//! Service executor — enable at boot, then start.

use std::sync::Arc;

use async_trait::async_trait;

use super::ResourceExecutor;
use crate::error::ConvergeError;
use crate::host::ServiceManager;
use crate::resource::{ResourceDeclaration, ResourceKind};

/// Desired state is the ordered pair {enable, start}. `apply` performs only
/// the missing sub-actions, so a running-but-disabled service is enabled
/// without being restarted.
pub struct ServiceExecutor {
    manager: Arc<dyn ServiceManager>,
}

impl ServiceExecutor {
    pub fn new(manager: Arc<dyn ServiceManager>) -> Self {
        Self { manager }
    }

    fn service_name<'a>(&self, decl: &'a ResourceDeclaration) -> Result<&'a str, ConvergeError> {
        match &decl.kind {
            ResourceKind::Service { service } => Ok(service),
            other => Err(ConvergeError::ApplyFailed {
                resource: decl.name.clone(),
                detail: format!("service executor got {} resource", other.label()),
            }),
        }
    }
}

#[async_trait]
impl ResourceExecutor for ServiceExecutor {
    async fn test(&self, decl: &ResourceDeclaration) -> Result<bool, ConvergeError> {
        let service = self.service_name(decl)?;
        Ok(self.manager.is_enabled(service).await? && self.manager.is_running(service).await?)
    }

    async fn apply(&self, decl: &ResourceDeclaration) -> Result<(), ConvergeError> {
        let service = self.service_name(decl)?;

        if !self.manager.is_enabled(service).await? {
            self.manager.enable(service).await?;
        }
        if !self.manager.is_running(service).await? {
            self.manager.start(service).await?;
        }
        Ok(())
    }
}
