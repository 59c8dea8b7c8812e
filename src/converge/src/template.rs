//! Template rendering for file resources, backed by Tera.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tera::{Context, Tera};

use crate::error::ConvergeError;

/// Renders a named template with string variables.
pub trait TemplateRenderer: Send + Sync {
    fn render(
        &self,
        template: &str,
        vars: &BTreeMap<String, String>,
    ) -> Result<String, ConvergeError>;
}

/// Simple recursive directory walker
fn walkdir(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut results = Vec::new();
    if dir.is_dir() {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                results.extend(walkdir(&path)?);
            } else {
                results.push(path);
            }
        }
    }
    Ok(results)
}

/// Tera-backed renderer loaded from embedded templates or a directory.
pub struct TeraRenderer {
    tera: Tera,
}

impl TeraRenderer {
    /// Build a renderer from templates compiled into the binary. Use this for
    /// production so the tool works when only the binary is available.
    pub fn from_embedded(templates: &[(&str, &str)]) -> Result<Self, ConvergeError> {
        let mut tera = Tera::default();
        for (name, content) in templates {
            tera.add_raw_template(name, content)
                .map_err(|e| ConvergeError::Template(format!("embedded template {}: {}", name, e)))?;
        }
        tracing::debug!("[TeraRenderer] Loaded {} embedded templates", templates.len());
        Ok(Self { tera })
    }

    /// Build a renderer from a template directory (local development, tests).
    pub fn from_dir(templates_dir: &Path) -> Result<Self, ConvergeError> {
        let mut tera = Tera::default();
        let mut template_count = 0;

        for path in walkdir(templates_dir)? {
            if !path.is_file() {
                continue;
            }
            let rel_path = match path.strip_prefix(templates_dir) {
                Ok(p) => p,
                Err(_) => continue,
            };
            let template_name = rel_path.to_string_lossy().replace('\\', "/");
            let content = std::fs::read_to_string(&path)?;
            if let Err(e) = tera.add_raw_template(&template_name, &content) {
                tracing::warn!(
                    "[TeraRenderer] Failed to add template {}: {}",
                    template_name,
                    e
                );
            } else {
                template_count += 1;
            }
        }

        tracing::info!(
            "[TeraRenderer] Loaded {} templates from {}",
            template_count,
            templates_dir.display()
        );
        Ok(Self { tera })
    }
}

impl TemplateRenderer for TeraRenderer {
    fn render(
        &self,
        template: &str,
        vars: &BTreeMap<String, String>,
    ) -> Result<String, ConvergeError> {
        let mut context = Context::new();
        for (key, value) in vars {
            context.insert(key, value);
        }
        self.tera
            .render(template, &context)
            .map_err(|e| ConvergeError::Template(format!("render {}: {}", template, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_embedded_template_with_vars() {
        let renderer =
            TeraRenderer::from_embedded(&[("greeting.html", "<p>Hello {{ name }}!</p>")]).unwrap();
        let mut vars = BTreeMap::new();
        vars.insert("name".to_string(), "operator".to_string());
        let out = renderer.render("greeting.html", &vars).unwrap();
        assert_eq!(out, "<p>Hello operator!</p>");
    }

    #[test]
    fn unknown_template_is_an_error() {
        let renderer = TeraRenderer::from_embedded(&[]).unwrap();
        let err = renderer.render("missing.html", &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, ConvergeError::Template(_)));
    }

    #[test]
    fn loads_templates_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "v={{ v }}").unwrap();
        let renderer = TeraRenderer::from_dir(dir.path()).unwrap();
        let mut vars = BTreeMap::new();
        vars.insert("v".to_string(), "1".to_string());
        assert_eq!(renderer.render("index.html", &vars).unwrap(), "v=1");
    }
}
