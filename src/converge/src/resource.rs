//! Resource declarations — the unit of desired host state.
//!
//! A declaration is data, not code: a kind tag with kind-specific parameters,
//! a platform predicate, and an optional current-state guard. Declarations
//! are immutable once handed to the engine; the ordered sequence of
//! declarations is what a convergence run consumes.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::platform::{Platform, PlatformPredicate};

/// A condition evaluated against current host state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    /// Satisfied when the path exists.
    PathExists(PathBuf),
    /// Satisfied when the command exits zero.
    CommandSucceeds(Vec<String>),
}

/// Explicit current-state guard on a declaration.
///
/// Evaluated before the executor's own state check. `NotIf` skips the action
/// when the check is satisfied; `OnlyIf` skips it when the check is not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    NotIf(Check),
    OnlyIf(Check),
}

/// Kind tag plus kind-specific parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceKind {
    /// Intentional reveal of a secret value to the reporting sink. This is an
    /// explicit disclosure step, kept apart from diagnostic logging.
    Disclosure { message: String },
    /// Guarded shell step. Idempotence comes from the declaration guard.
    Script { command: Vec<String> },
    /// Install a package through the platform package manager.
    Package { package: String },
    /// Ensure a service is enabled at boot and currently running.
    Service { service: String },
    /// Render a template to a destination path with optional permission bits.
    File {
        template: String,
        path: PathBuf,
        mode: Option<u32>,
        vars: BTreeMap<String, String>,
    },
    /// Run a command at most once per frequency window.
    PeriodicTask {
        task: String,
        command: Vec<String>,
        frequency: Duration,
    },
    /// Include a named, externally resolved declaration sequence in place.
    ExternalBundle { bundle: String },
}

impl ResourceKind {
    /// Short label used in run results and log lines.
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Disclosure { .. } => "disclosure",
            ResourceKind::Script { .. } => "script",
            ResourceKind::Package { .. } => "package",
            ResourceKind::Service { .. } => "service",
            ResourceKind::File { .. } => "file",
            ResourceKind::PeriodicTask { .. } => "periodic-task",
            ResourceKind::ExternalBundle { .. } => "external-bundle",
        }
    }
}

/// A declared unit of desired host state.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDeclaration {
    pub name: String,
    pub kind: ResourceKind,
    pub platforms: PlatformPredicate,
    pub guard: Option<Guard>,
}

impl ResourceDeclaration {
    fn new(name: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            platforms: PlatformPredicate::Any,
            guard: None,
        }
    }

    pub fn disclosure(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            name,
            ResourceKind::Disclosure {
                message: message.into(),
            },
        )
    }

    pub fn script(name: impl Into<String>, command: Vec<String>) -> Self {
        Self::new(name, ResourceKind::Script { command })
    }

    pub fn package(name: impl Into<String>, package: impl Into<String>) -> Self {
        Self::new(
            name,
            ResourceKind::Package {
                package: package.into(),
            },
        )
    }

    pub fn service(name: impl Into<String>, service: impl Into<String>) -> Self {
        Self::new(
            name,
            ResourceKind::Service {
                service: service.into(),
            },
        )
    }

    pub fn template_file(
        name: impl Into<String>,
        template: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self::new(
            name,
            ResourceKind::File {
                template: template.into(),
                path: path.into(),
                mode: None,
                vars: BTreeMap::new(),
            },
        )
    }

    pub fn periodic(
        name: impl Into<String>,
        task: impl Into<String>,
        command: Vec<String>,
        frequency: Duration,
    ) -> Self {
        Self::new(
            name,
            ResourceKind::PeriodicTask {
                task: task.into(),
                command,
                frequency,
            },
        )
    }

    pub fn bundle(name: impl Into<String>, bundle: impl Into<String>) -> Self {
        Self::new(
            name,
            ResourceKind::ExternalBundle {
                bundle: bundle.into(),
            },
        )
    }

    /// Restrict the declaration to the listed platforms.
    pub fn only_on(mut self, platforms: &[Platform]) -> Self {
        self.platforms = PlatformPredicate::Only(platforms.to_vec());
        self
    }

    /// Exclude the declaration from the listed platforms.
    pub fn except_on(mut self, platforms: &[Platform]) -> Self {
        self.platforms = PlatformPredicate::Except(platforms.to_vec());
        self
    }

    /// Skip the action when the check is satisfied.
    pub fn not_if(mut self, check: Check) -> Self {
        self.guard = Some(Guard::NotIf(check));
        self
    }

    /// Skip the action unless the check is satisfied.
    pub fn only_if(mut self, check: Check) -> Self {
        self.guard = Some(Guard::OnlyIf(check));
        self
    }

    /// Set permission bits on a file declaration. No effect on other kinds.
    pub fn with_mode(mut self, bits: u32) -> Self {
        if let ResourceKind::File { ref mut mode, .. } = self.kind {
            *mode = Some(bits);
        }
        self
    }

    /// Add a template variable to a file declaration. No effect on other kinds.
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let ResourceKind::File { ref mut vars, .. } = self.kind {
            vars.insert(key.into(), value.into());
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_set_kind_and_defaults() {
        let decl = ResourceDeclaration::package("install apache2", "apache2");
        assert_eq!(decl.name, "install apache2");
        assert_eq!(decl.platforms, PlatformPredicate::Any);
        assert!(decl.guard.is_none());
        assert_eq!(decl.kind.label(), "package");
    }

    #[test]
    fn only_on_restricts_platforms() {
        let decl = ResourceDeclaration::service("start apache", "apache2")
            .only_on(&[Platform::LinuxFamily]);
        assert!(decl.platforms.matches(Platform::LinuxFamily));
        assert!(!decl.platforms.matches(Platform::WindowsFamily));
    }

    #[test]
    fn not_if_attaches_guard() {
        let decl = ResourceDeclaration::script(
            "bootstrap chocolatey",
            vec!["powershell".into(), "-Command".into(), "iex …".into()],
        )
        .not_if(Check::PathExists(PathBuf::from(
            r"C:\ProgramData\chocolatey\bin\choco.exe",
        )));
        assert!(matches!(decl.guard, Some(Guard::NotIf(Check::PathExists(_)))));
    }

    #[test]
    fn with_mode_and_var_only_touch_file_kind() {
        let file = ResourceDeclaration::template_file("homepage", "index.html", "/tmp/index.html")
            .with_mode(0o755)
            .with_var("greeting", "hello");
        match file.kind {
            ResourceKind::File { mode, ref vars, .. } => {
                assert_eq!(mode, Some(0o755));
                assert_eq!(vars.get("greeting").map(String::as_str), Some("hello"));
            }
            _ => panic!("expected file kind"),
        }

        let pkg = ResourceDeclaration::package("p", "p").with_mode(0o755);
        assert!(matches!(pkg.kind, ResourceKind::Package { .. }));
    }
}
