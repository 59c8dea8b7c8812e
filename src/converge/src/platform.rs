//! Host platform classification and per-resource applicability predicates.

use std::fmt;
use std::str::FromStr;

/// Platform tag for the running host, derived once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    LinuxFamily,
    WindowsFamily,
    Other,
}

impl Platform {
    /// Classify the running host. Pure query against the compiled-in OS
    /// family; unrecognized hosts map to `Other` rather than erroring, so the
    /// caller always receives a usable tag.
    pub fn detect() -> Platform {
        match std::env::consts::OS {
            "linux" | "android" => Platform::LinuxFamily,
            "windows" => Platform::WindowsFamily,
            _ => Platform::Other,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Platform::LinuxFamily => "linux-family",
            Platform::WindowsFamily => "windows-family",
            Platform::Other => "other",
        };
        f.write_str(s)
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linux" | "linux-family" => Ok(Platform::LinuxFamily),
            "windows" | "windows-family" => Ok(Platform::WindowsFamily),
            "other" => Ok(Platform::Other),
            _ => Err(format!("unknown platform: {}", s)),
        }
    }
}

/// Restricts a resource declaration to specific host platforms.
///
/// A declaration whose predicate does not match the detected platform is
/// recorded as skipped and its executor is never invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformPredicate {
    /// Applies on every platform.
    Any,
    /// Applies only on the listed platforms.
    Only(Vec<Platform>),
    /// Applies everywhere except the listed platforms.
    Except(Vec<Platform>),
}

impl PlatformPredicate {
    pub fn matches(&self, platform: Platform) -> bool {
        match self {
            PlatformPredicate::Any => true,
            PlatformPredicate::Only(list) => list.contains(&platform),
            PlatformPredicate::Except(list) => !list.contains(&platform),
        }
    }
}

impl Default for PlatformPredicate {
    fn default() -> Self {
        PlatformPredicate::Any
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_never_fails() {
        // Whatever the build host is, detection yields a usable tag.
        let platform = Platform::detect();
        assert!(matches!(
            platform,
            Platform::LinuxFamily | Platform::WindowsFamily | Platform::Other
        ));
    }

    #[test]
    fn predicate_any_matches_everything() {
        assert!(PlatformPredicate::Any.matches(Platform::LinuxFamily));
        assert!(PlatformPredicate::Any.matches(Platform::WindowsFamily));
        assert!(PlatformPredicate::Any.matches(Platform::Other));
    }

    #[test]
    fn predicate_only() {
        let p = PlatformPredicate::Only(vec![Platform::LinuxFamily]);
        assert!(p.matches(Platform::LinuxFamily));
        assert!(!p.matches(Platform::WindowsFamily));
        assert!(!p.matches(Platform::Other));
    }

    #[test]
    fn predicate_except() {
        let p = PlatformPredicate::Except(vec![Platform::WindowsFamily]);
        assert!(p.matches(Platform::LinuxFamily));
        assert!(!p.matches(Platform::WindowsFamily));
        assert!(p.matches(Platform::Other));
    }

    #[test]
    fn parse_and_display_round_trip() {
        for p in [Platform::LinuxFamily, Platform::WindowsFamily, Platform::Other] {
            let parsed: Platform = p.to_string().parse().unwrap();
            assert_eq!(parsed, p);
        }
        assert!("beos".parse::<Platform>().is_err());
    }
}
