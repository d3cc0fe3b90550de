use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{HfpError, HfpResult};

/// File name of the diagnostic log written under the temp directory.
pub const DEFAULT_LOG_FILE: &str = "hfp_thumbnail_debug.log";

/// Top-level configuration (loaded from hfp.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HfpConfig {
    pub log: LogConfig,
    pub cloud: CloudConfig,
    pub thumbnail: ThumbnailConfig,
}

impl HfpConfig {
    /// Load configuration from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> HfpResult<Self> {
        if !path.exists() {
            tracing::warn!("config file not found: {}  (using defaults)", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| HfpError::Config(format!("reading config {}: {e}", path.display())))?;
        Self::from_toml(&content)
            .map_err(|e| HfpError::Config(format!("parsing config {}: {e}", path.display())))
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Write the diagnostic log (default: true)
    pub enabled: bool,
    /// Diagnostic log file (default: <temp>/hfp_thumbnail_debug.log)
    pub path: Option<PathBuf>,
    /// Log level filter (default: info)
    pub level: String,
}

impl LogConfig {
    /// Effective log path: the configured one, or the well-known temp file.
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_LOG_FILE))
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            level: "info".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// Additional cloud roots, merged after the discovered ones
    pub extra_roots: Vec<PathBuf>,
    /// Number of secondary business account slots to enumerate
    pub business_slots: u32,
    /// Bytes read from a placeholder to trigger materialization
    pub probe_bytes: usize,
    /// Delay after the triggering read before re-checking, in milliseconds
    pub settle_delay_ms: u64,
    /// Match well-known cloud folder names when no root matches
    pub heuristics: bool,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            extra_roots: Vec::new(),
            business_slots: 5,
            probe_bytes: 1024,
            settle_delay_ms: 100,
            heuristics: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// Envelope field holding the encoded image
    pub field: String,
    /// Side length used when the host does not ask for one
    pub default_size: u32,
    /// Largest side length served; larger requests are clamped
    pub max_size: u32,
    /// Upper bound on bytes read from a source
    pub max_envelope_bytes: u64,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            field: "thumbnail".into(),
            default_size: 256,
            max_size: 2560,
            max_envelope_bytes: 64 * 1024 * 1024,
        }
    }
}
