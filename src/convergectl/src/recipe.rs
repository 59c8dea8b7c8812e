//! The sample webserver recipe.
//!
//! One declaration sequence covers both platform branches: each resource
//! carries its own platform predicate, so the engine skips what does not
//! apply instead of the recipe duplicating itself per platform.

use std::path::PathBuf;
use std::time::Duration;

use converge::{BundleRegistry, Check, Platform, ResourceDeclaration};

/// Chocolatey's install location; its presence guards the bootstrap script.
const CHOCO_BINARY: &str = r"C:\ProgramData\chocolatey\bin\choco.exe";

/// One-liner that installs Chocolatey from the community feed.
const CHOCO_BOOTSTRAP: &str = "Set-ExecutionPolicy Bypass -Scope Process -Force; \
     [System.Net.ServicePointManager]::SecurityProtocol = \
     [System.Net.ServicePointManager]::SecurityProtocol -bor 3072; \
     iex ((New-Object System.Net.WebClient).DownloadString('https://community.chocolatey.org/install.ps1'))";

/// Inputs the recipe interpolates into its declarations.
#[derive(Debug, Clone)]
pub struct RecipeParams {
    /// Decrypted database password, revealed by the disclosure step.
    pub password: String,
    /// Homepage destination on linux hosts.
    pub linux_doc_root: PathBuf,
    /// Homepage destination on windows hosts.
    pub windows_doc_root: PathBuf,
}

impl RecipeParams {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
            linux_doc_root: PathBuf::from("/var/www/html"),
            windows_doc_root: PathBuf::from(r"C:\Apache24\htdocs"),
        }
    }
}

/// Build the webserver declaration sequence.
///
/// Order is load-bearing: the package must be installed before its service
/// is started, and the service before the homepage is meaningful.
pub fn webserver_recipe(params: &RecipeParams) -> Vec<ResourceDeclaration> {
    let linux = [Platform::LinuxFamily];
    let windows = [Platform::WindowsFamily];

    vec![
        // 1. Reveal the decrypted credential through the disclosure sink.
        ResourceDeclaration::disclosure(
            "reveal db_config",
            format!(
                "WINDOWS SUCCESS! The decrypted password is: {}",
                params.password
            ),
        )
        .only_on(&windows),
        ResourceDeclaration::disclosure(
            "reveal db_config",
            format!(
                "LINUX SUCCESS! The decrypted password is: {}",
                params.password
            ),
        )
        .only_on(&linux),
        // 2. Package-manager bootstrap (windows) / periodic index refresh (linux).
        ResourceDeclaration::script(
            "bootstrap chocolatey",
            vec![
                "powershell.exe".to_string(),
                "-NoProfile".to_string(),
                "-Command".to_string(),
                CHOCO_BOOTSTRAP.to_string(),
            ],
        )
        .only_on(&windows)
        .not_if(Check::PathExists(PathBuf::from(CHOCO_BINARY))),
        ResourceDeclaration::periodic(
            "periodic apt update",
            "apt-update",
            vec!["apt-get".to_string(), "update".to_string()],
            Duration::from_secs(86_400),
        )
        .only_on(&linux),
        // 3. Community bundle for the VCS tooling.
        ResourceDeclaration::bundle("include git", "git").only_on(&linux),
        // 4. Install the web server.
        ResourceDeclaration::package("install apache-httpd", "apache-httpd").only_on(&windows),
        ResourceDeclaration::package("install apache2", "apache2").only_on(&linux),
        // 5. Enable at boot and start.
        ResourceDeclaration::service("enable and start apache", "Apache").only_on(&windows),
        ResourceDeclaration::service("enable and start apache2", "apache2").only_on(&linux),
        // 6. Render the homepage.
        ResourceDeclaration::template_file(
            "render homepage",
            "index.html",
            params.windows_doc_root.join("index.html"),
        )
        .with_var("title", "Converged")
        .with_var("platform", "windows")
        .only_on(&windows),
        ResourceDeclaration::template_file(
            "render homepage",
            "index.html",
            params.linux_doc_root.join("index.html"),
        )
        .with_mode(0o755)
        .with_var("title", "Converged")
        .with_var("platform", "linux")
        .only_on(&linux),
    ]
}

/// Bundles the recipe can include. The `git` bundle mirrors the community
/// recipe: it just installs the package on whatever platform it runs on.
pub fn standard_bundles() -> BundleRegistry {
    let mut registry = BundleRegistry::new();
    registry.register(
        "git",
        vec![ResourceDeclaration::package("install git", "git")],
    );
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use converge::ResourceKind;

    #[test]
    fn every_resource_carries_a_platform_predicate() {
        let decls = webserver_recipe(&RecipeParams::new("pw"));
        for decl in &decls {
            assert!(
                !decl.platforms.matches(Platform::Other),
                "'{}' should not apply on unclassified hosts",
                decl.name
            );
        }
    }

    #[test]
    fn disclosure_interpolates_the_password() {
        let decls = webserver_recipe(&RecipeParams::new("secret123"));
        let messages: Vec<&str> = decls
            .iter()
            .filter_map(|d| match &d.kind {
                ResourceKind::Disclosure { message } => Some(message.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|m| m.contains("secret123")));
    }

    #[test]
    fn linux_homepage_carries_permission_bits() {
        let decls = webserver_recipe(&RecipeParams::new("pw"));
        let linux_file = decls
            .iter()
            .find(|d| {
                matches!(d.kind, ResourceKind::File { .. })
                    && d.platforms.matches(Platform::LinuxFamily)
            })
            .unwrap();
        match &linux_file.kind {
            ResourceKind::File { mode, path, .. } => {
                assert_eq!(*mode, Some(0o755));
                assert_eq!(path, &PathBuf::from("/var/www/html/index.html"));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn bootstrap_is_guarded_by_the_choco_binary() {
        let decls = webserver_recipe(&RecipeParams::new("pw"));
        let bootstrap = decls
            .iter()
            .find(|d| d.name == "bootstrap chocolatey")
            .unwrap();
        assert!(bootstrap.guard.is_some());
        assert!(!bootstrap.platforms.matches(Platform::LinuxFamily));
    }
}
