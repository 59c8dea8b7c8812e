//! File executor — render a template to its destination.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use super::ResourceExecutor;
use crate::error::ConvergeError;
use crate::resource::{ResourceDeclaration, ResourceKind};
use crate::template::TemplateRenderer;

/// Renders the declared template and reconciles the destination file.
///
/// Content is compared before writing so an unchanged file is not rewritten;
/// permission bits are part of desired state and are reconciled even when the
/// content already matches.
pub struct FileExecutor {
    renderer: Arc<dyn TemplateRenderer>,
}

struct FileParams<'a> {
    template: &'a str,
    path: &'a Path,
    mode: Option<u32>,
    vars: &'a BTreeMap<String, String>,
}

impl FileExecutor {
    pub fn new(renderer: Arc<dyn TemplateRenderer>) -> Self {
        Self { renderer }
    }

    fn params<'a>(&self, decl: &'a ResourceDeclaration) -> Result<FileParams<'a>, ConvergeError> {
        match &decl.kind {
            ResourceKind::File {
                template,
                path,
                mode,
                vars,
            } => Ok(FileParams {
                template,
                path,
                mode: *mode,
                vars,
            }),
            other => Err(ConvergeError::ApplyFailed {
                resource: decl.name.clone(),
                detail: format!("file executor got {} resource", other.label()),
            }),
        }
    }

    fn content_matches(path: &Path, rendered: &str) -> Result<bool, ConvergeError> {
        if !path.exists() {
            return Ok(false);
        }
        let existing = std::fs::read_to_string(path)?;
        Ok(existing == rendered)
    }

    #[cfg(unix)]
    fn mode_matches(path: &Path, mode: u32) -> Result<bool, ConvergeError> {
        use std::os::unix::fs::PermissionsExt;
        let metadata = std::fs::metadata(path)?;
        Ok(metadata.permissions().mode() & 0o7777 == mode)
    }

    #[cfg(not(unix))]
    fn mode_matches(_path: &Path, _mode: u32) -> Result<bool, ConvergeError> {
        // No permission-bit model to reconcile against.
        Ok(true)
    }

    #[cfg(unix)]
    fn set_mode(path: &Path, mode: u32) -> Result<(), ConvergeError> {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn set_mode(path: &Path, mode: u32) -> Result<(), ConvergeError> {
        tracing::debug!(
            "[FileExecutor] Ignoring mode {:o} for {} on this platform",
            mode,
            path.display()
        );
        Ok(())
    }

    /// Write through a sibling temp file and rename, so readers never observe
    /// a half-written destination.
    fn write_atomic(path: &Path, content: &str) -> Result<(), ConvergeError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("converge-tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[async_trait]
impl ResourceExecutor for FileExecutor {
    async fn test(&self, decl: &ResourceDeclaration) -> Result<bool, ConvergeError> {
        let params = self.params(decl)?;
        let rendered = self.renderer.render(params.template, params.vars)?;

        if !Self::content_matches(params.path, &rendered)? {
            return Ok(false);
        }
        if let Some(mode) = params.mode {
            if !Self::mode_matches(params.path, mode)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn apply(&self, decl: &ResourceDeclaration) -> Result<(), ConvergeError> {
        let params = self.params(decl)?;
        let rendered = self.renderer.render(params.template, params.vars)?;

        if Self::content_matches(params.path, &rendered)? {
            tracing::debug!(
                "[FileExecutor] Content unchanged for {}, reconciling mode only",
                params.path.display()
            );
        } else {
            Self::write_atomic(params.path, &rendered)?;
            tracing::info!("[FileExecutor] Wrote {}", params.path.display());
        }

        if let Some(mode) = params.mode {
            if !Self::mode_matches(params.path, mode)? {
                Self::set_mode(params.path, mode)?;
            }
        }
        Ok(())
    }
}
