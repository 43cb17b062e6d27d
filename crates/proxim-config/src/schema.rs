use serde::{Deserialize, Serialize};

/// Root configuration — maps to `proxim.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximConfig {
    pub device: DeviceConfig,
    pub mesh: MeshConfig,
    pub registry: RegistryConfig,
    pub reporting: ReportingConfig,
    pub logging: LoggingConfig,
}

// ── Device ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Stable device identifier shared with peers. Generated (UUID v4) and
    /// logged on startup when absent.
    pub device_id: Option<String>,
}

// ── Mesh transport ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    /// Port the hub listens on and spokes dial.
    pub port: u16,
    /// Upper bound on a spoke's connect attempt, in milliseconds.
    pub connect_timeout_ms: u64,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            port: 8888,
            connect_timeout_ms: 5_000,
        }
    }
}

// ── Registry ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// A device with no report for this long is evicted.
    pub device_timeout_ms: u64,
    /// Cadence of the liveness sweep.
    pub sweep_interval_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            device_timeout_ms: 10_000,
            sweep_interval_ms: 5_000,
        }
    }
}

// ── Reporting ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    /// Cadence of the local report broadcast.
    pub share_interval_ms: u64,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            share_interval_ms: 1_000,
        }
    }
}

// ── Logging ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level when RUST_LOG is unset ("trace" … "error").
    pub level: String,
    /// "pretty" or "json".
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

// ── Validation ─────────────────────────────────────────────────

/// A non-fatal configuration problem, logged at startup.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "config warning: {}: {}", self.field, self.message)
    }
}

impl ProximConfig {
    /// Validate the config. Hard errors make startup fail; warnings are
    /// returned for the caller to log.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, String> {
        let mut warnings = Vec::new();

        if self.mesh.port == 0 {
            return Err("mesh.port must be non-zero".into());
        }
        if self.mesh.connect_timeout_ms == 0 {
            return Err("mesh.connect_timeout_ms must be non-zero".into());
        }
        if self.registry.device_timeout_ms == 0 {
            return Err("registry.device_timeout_ms must be non-zero".into());
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(format!(
                "logging.format must be \"pretty\" or \"json\", got {:?}",
                self.logging.format
            ));
        }

        if self.registry.sweep_interval_ms > self.registry.device_timeout_ms {
            warnings.push(ConfigWarning {
                field: "registry.sweep_interval_ms".into(),
                message: format!(
                    "sweep interval ({} ms) exceeds the device timeout ({} ms); \
                     stale devices will linger between sweeps",
                    self.registry.sweep_interval_ms, self.registry.device_timeout_ms
                ),
            });
        }
        if self.reporting.share_interval_ms < 100 {
            warnings.push(ConfigWarning {
                field: "reporting.share_interval_ms".into(),
                message: format!(
                    "share interval of {} ms will flood the link",
                    self.reporting.share_interval_ms
                ),
            });
        }

        Ok(warnings)
    }
}
