//! Disclosure executor — reveal a value to the reporting sink.

use std::sync::Arc;

use async_trait::async_trait;

use super::ResourceExecutor;
use crate::error::ConvergeError;
use crate::reporter::Reporter;
use crate::resource::{ResourceDeclaration, ResourceKind};

/// Hands the declared message to the [`Reporter`]. Reporting re-runs on
/// every converge, so `test` never reports the step as satisfied.
pub struct DisclosureExecutor {
    reporter: Arc<dyn Reporter>,
}

impl DisclosureExecutor {
    pub fn new(reporter: Arc<dyn Reporter>) -> Self {
        Self { reporter }
    }
}

#[async_trait]
impl ResourceExecutor for DisclosureExecutor {
    async fn test(&self, _decl: &ResourceDeclaration) -> Result<bool, ConvergeError> {
        Ok(false)
    }

    async fn apply(&self, decl: &ResourceDeclaration) -> Result<(), ConvergeError> {
        match &decl.kind {
            ResourceKind::Disclosure { message } => {
                self.reporter.disclose(message);
                Ok(())
            }
            other => Err(ConvergeError::ApplyFailed {
                resource: decl.name.clone(),
                detail: format!("disclosure executor got {} resource", other.label()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct CollectingReporter {
        messages: Mutex<Vec<String>>,
    }

    impl Reporter for CollectingReporter {
        fn disclose(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }

    #[tokio::test]
    async fn apply_routes_message_to_reporter() {
        let reporter = Arc::new(CollectingReporter {
            messages: Mutex::new(vec![]),
        });
        let executor = DisclosureExecutor::new(reporter.clone());
        let decl = ResourceDeclaration::disclosure("reveal", "the password is hunter2");

        assert!(!executor.test(&decl).await.unwrap());
        executor.apply(&decl).await.unwrap();

        let messages = reporter.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0], "the password is hunter2");
    }
}
