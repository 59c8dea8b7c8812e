//! Package executor — install through the platform package manager.

use std::sync::Arc;

use async_trait::async_trait;

use super::ResourceExecutor;
use crate::error::ConvergeError;
use crate::host::PackageManager;
use crate::resource::{ResourceDeclaration, ResourceKind};

pub struct PackageExecutor {
    manager: Arc<dyn PackageManager>,
}

impl PackageExecutor {
    pub fn new(manager: Arc<dyn PackageManager>) -> Self {
        Self { manager }
    }

    fn package_name<'a>(&self, decl: &'a ResourceDeclaration) -> Result<&'a str, ConvergeError> {
        match &decl.kind {
            ResourceKind::Package { package } => Ok(package),
            other => Err(ConvergeError::ApplyFailed {
                resource: decl.name.clone(),
                detail: format!("package executor got {} resource", other.label()),
            }),
        }
    }
}

#[async_trait]
impl ResourceExecutor for PackageExecutor {
    async fn test(&self, decl: &ResourceDeclaration) -> Result<bool, ConvergeError> {
        let package = self.package_name(decl)?;
        self.manager.is_installed(package).await
    }

    async fn apply(&self, decl: &ResourceDeclaration) -> Result<(), ConvergeError> {
        let package = self.package_name(decl)?;
        self.manager.install(package).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    struct FakePackages {
        installed: Mutex<HashSet<String>>,
    }

    #[async_trait]
    impl PackageManager for FakePackages {
        async fn is_installed(&self, name: &str) -> Result<bool, ConvergeError> {
            Ok(self.installed.lock().unwrap().contains(name))
        }

        async fn install(&self, name: &str) -> Result<(), ConvergeError> {
            self.installed.lock().unwrap().insert(name.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn apply_then_test_reports_converged() {
        let manager = Arc::new(FakePackages {
            installed: Mutex::new(HashSet::new()),
        });
        let executor = PackageExecutor::new(manager);
        let decl = ResourceDeclaration::package("install apache2", "apache2");

        assert!(!executor.test(&decl).await.unwrap());
        executor.apply(&decl).await.unwrap();
        assert!(executor.test(&decl).await.unwrap());
    }
}
