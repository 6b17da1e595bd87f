use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::layout::LayoutId;

/// Options recognized by the typing engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Forward Backspace and allow corrections
    pub allow_backspace: bool,
    /// Compare typed and expected characters without case folding
    pub case_sensitive: bool,
    /// Layout the practice text is written for; enables mismatch detection
    pub expected_layout: Option<LayoutId>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            allow_backspace: false,
            case_sensitive: false,
            expected_layout: None,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> EngineConfig;
    fn save(&self, cfg: &EngineConfig) -> Result<(), ConfigError>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "keypace") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("keypace_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> EngineConfig {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(_) => return EngineConfig::default(),
        };
        match serde_json::from_slice::<EngineConfig>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::warn!(
                    "ignoring unreadable config at {}: {e}",
                    self.path.display()
                );
                EngineConfig::default()
            }
        }
    }

    fn save(&self, cfg: &EngineConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        log::debug!("saved config to {}", self.path.display());
        Ok(())
    }
}
