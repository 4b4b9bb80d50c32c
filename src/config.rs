//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - built-in defaults
//! - `codegraph.toml` (project configuration)
//! - `codegraph.local.toml` (git-ignored local overrides)
//! - Environment variables (`CODEGRAPH_*` prefix)
//!
//! ## Example
//!
//! ```toml
//! # codegraph.toml
//! [scan]
//! max_file_size = 1048576
//! workers = 0
//!
//! [dead_code]
//! min_confidence = 0.5
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! CODEGRAPH_SCAN__WORKERS=4
//! CODEGRAPH_DEAD_CODE__MIN_CONFIDENCE=0.7
//! ```

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Root configuration struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub header: HeaderConfig,
    #[serde(default)]
    pub dead_code: DeadCodeConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Scanner defaults, mirrored 1:1 against `spec.md` §4.D's named options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    pub max_file_size: u64,
    pub follow_symlinks: bool,
    pub ignore_files: Vec<String>,
    pub use_defaults: bool,
    pub concurrent: bool,
    pub workers: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            max_file_size: 1024 * 1024,
            follow_symlinks: false,
            ignore_files: vec![".gitignore".to_string(), ".codegraphignore".to_string()],
            use_defaults: true,
            concurrent: true,
            workers: 0,
        }
    }
}

/// Header extractor scan window, §4.A.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderConfig {
    pub scan_window_bytes: usize,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        HeaderConfig {
            scan_window_bytes: 64 * 1024,
        }
    }
}

/// Dead-code heuristic defaults, §4.H.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadCodeConfig {
    pub min_confidence: f64,
    pub aggressive: bool,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

impl Default for DeadCodeConfig {
    fn default() -> Self {
        DeadCodeConfig {
            min_confidence: 0.5,
            aggressive: false,
            exclude_globs: Vec::new(),
        }
    }
}

/// Security-zone keyword overrides, §4.I. Empty vectors mean "use the
/// built-in keyword set for this zone".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub extra_public_keywords: Vec<String>,
    #[serde(default)]
    pub extra_admin_keywords: Vec<String>,
    #[serde(default)]
    pub extra_data_keywords: Vec<String>,
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            filter: "info".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            scan: ScanConfig::default(),
            header: HeaderConfig::default(),
            dead_code: DeadCodeConfig::default(),
            security: SecurityConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the layered sources. Missing files are not
    /// errors; only a malformed present file or an invalid env override is.
    pub fn load() -> Result<Self, figment::Error> {
        Figment::from(figment::providers::Serialized::defaults(Config::default()))
            .merge(Toml::file("codegraph.toml"))
            .merge(Toml::file("codegraph.local.toml"))
            .merge(Env::prefixed("CODEGRAPH_").split("__"))
            .extract()
    }
}
