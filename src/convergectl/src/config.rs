//! Runner configuration
//! Loaded from convergectl.toml

use std::path::{Path, PathBuf};

use converge::Platform;
use serde::{Deserialize, Serialize};

/// Runner configuration
/// Loaded from convergectl.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunnerConfig {
    /// Secret key and bag store locations
    #[serde(default)]
    pub secrets: SecretsConfig,

    /// Run behavior
    #[serde(default)]
    pub run: RunConfig,

    /// Filesystem locations
    #[serde(default)]
    pub paths: PathsConfig,
}

impl RunnerConfig {
    /// Load configuration from file. Tries the explicit path first, then
    /// `convergectl.toml` next to the working directory, falling back to
    /// defaults when nothing is found.
    pub fn load(explicit: Option<&Path>) -> Result<Self, String> {
        let mut config_paths: Vec<PathBuf> = Vec::new();
        if let Some(path) = explicit {
            config_paths.push(path.to_path_buf());
        }
        config_paths.push(PathBuf::from("convergectl.toml"));

        for path in &config_paths {
            if path.exists() {
                let content = std::fs::read_to_string(path)
                    .map_err(|e| format!("Failed to read config file {:?}: {}", path, e))?;
                let config: RunnerConfig = toml::from_str(&content)
                    .map_err(|e| format!("Failed to parse config file {:?}: {}", path, e))?;
                tracing::info!("Loaded runner config from {:?}", path);
                return Ok(config);
            }
        }

        if let Some(path) = explicit {
            return Err(format!("Config file not found: {:?}", path));
        }

        tracing::debug!("No convergectl.toml found, using defaults");
        Ok(Self::default())
    }

    /// Key file path: configured override, or the platform's fixed location
    /// under the system configuration root.
    pub fn key_path(&self, platform: Platform) -> PathBuf {
        if let Some(path) = &self.secrets.key_path {
            return path.clone();
        }
        match platform {
            Platform::WindowsFamily => PathBuf::from(r"C:\ProgramData\converge\secret_key"),
            _ => PathBuf::from("/etc/converge/secret_key"),
        }
    }

    /// Root directory of the encrypted bag store.
    pub fn bag_dir(&self, platform: Platform) -> PathBuf {
        if let Some(dir) = &self.secrets.bag_dir {
            return dir.clone();
        }
        match platform {
            Platform::WindowsFamily => PathBuf::from(r"C:\ProgramData\converge\data_bags"),
            _ => PathBuf::from("/var/lib/converge/data_bags"),
        }
    }

    /// Where periodic-task timestamps live.
    pub fn state_dir(&self) -> PathBuf {
        if let Some(dir) = &self.paths.state_dir {
            return dir.clone();
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".converge")
    }
}

/// Secret key and bag store locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretsConfig {
    /// Key file override (default: platform-specific system path)
    pub key_path: Option<PathBuf>,

    /// Bag store root override
    pub bag_dir: Option<PathBuf>,

    /// Bag holding the webserver credentials
    #[serde(default = "default_bag")]
    pub bag: String,

    /// Item inside the bag
    #[serde(default = "default_item")]
    pub item: String,
}

fn default_bag() -> String {
    "my_secrets".to_string()
}

fn default_item() -> String {
    "db_config".to_string()
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            key_path: None,
            bag_dir: None,
            bag: default_bag(),
            item: default_item(),
        }
    }
}

/// Run behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Stop at the first failed resource
    #[serde(default)]
    pub fail_fast: bool,

    /// Deadline in seconds for a single package/service/template call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Filesystem locations
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathsConfig {
    /// State directory override (default: ~/.converge)
    pub state_dir: Option<PathBuf>,

    /// Homepage destination on linux hosts (default: /var/www/html)
    pub linux_doc_root: Option<PathBuf>,

    /// Homepage destination on windows hosts (default: C:\Apache24\htdocs)
    pub windows_doc_root: Option<PathBuf>,
}
