use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use proxim_core::{ProximError, Result};

use crate::schema::ProximConfig;

/// Loads the Proxim configuration and hands out snapshots.
pub struct ConfigLoader {
    config: Arc<RwLock<ProximConfig>>,
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Resolve the config path: explicit path > PROXIM_CONFIG env > ~/.proxim/proxim.toml
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("PROXIM_CONFIG") {
            return PathBuf::from(p);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".proxim")
            .join("proxim.toml")
    }

    /// Load the config from disk, falling back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = Self::resolve_path(path);
        let config = if config_path.exists() {
            info!(?config_path, "loading configuration");
            let raw = std::fs::read_to_string(&config_path)?;
            toml::from_str::<ProximConfig>(&raw).map_err(|e| {
                ProximError::Config(format!("failed to parse {}: {}", config_path.display(), e))
            })?
        } else {
            warn!(?config_path, "config file not found, using defaults");
            ProximConfig::default()
        };

        // Apply environment variable overrides
        let config = Self::apply_env_overrides(config);

        // Validate config — log warnings, fail on errors
        match config.validate() {
            Ok(warnings) => {
                for w in &warnings {
                    warn!("{}", w);
                }
            }
            Err(e) => {
                return Err(ProximError::Config(e));
            }
        }

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
        })
    }

    /// Environment variables take precedence over the file.
    fn apply_env_overrides(mut config: ProximConfig) -> ProximConfig {
        if let Ok(id) = std::env::var("PROXIM_DEVICE_ID")
            && !id.is_empty()
        {
            config.device.device_id = Some(id);
        }
        if let Ok(port) = std::env::var("PROXIM_PORT") {
            match port.parse::<u16>() {
                Ok(p) => config.mesh.port = p,
                Err(_) => warn!(value = %port, "ignoring unparseable PROXIM_PORT"),
            }
        }
        if let Ok(level) = std::env::var("PROXIM_LOG_LEVEL")
            && !level.is_empty()
        {
            config.logging.level = level;
        }
        config
    }

    /// Get a read snapshot of the current config.
    pub fn get(&self) -> ProximConfig {
        self.config.read().clone()
    }

    /// Get a shared reference for subscription.
    pub fn shared(&self) -> Arc<RwLock<ProximConfig>> {
        Arc::clone(&self.config)
    }

    /// Path the config was loaded from (or would be written to).
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}
