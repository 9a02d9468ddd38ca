//! Server configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use herodex_core::{Error, Result};

/// Configuration for the herodex API server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server port.
    pub http_port: u16,

    /// Enable debug mode.
    ///
    /// When enabled:
    /// - logs are pretty-printed instead of JSON
    /// - `*` is accepted as a CORS origin
    /// - curated lists may live in memory (no `lists_dir`)
    pub debug: bool,

    /// Catalog dataset configuration.
    #[serde(default)]
    pub data: DataConfig,

    /// Directory holding the curated list documents.
    ///
    /// `None` keeps lists in memory, which is only allowed in debug mode.
    #[serde(default)]
    pub lists_dir: Option<PathBuf>,

    /// CORS configuration.
    #[serde(default)]
    pub cors: CorsConfig,

    /// Per-request timeout in seconds; `None` disables the timeout.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Maximum number of in-flight requests; `None` means unlimited.
    #[serde(default)]
    pub concurrency_limit: Option<usize>,

    /// Load the catalog at startup instead of on the first request.
    #[serde(default)]
    pub preload_catalog: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            debug: false,
            data: DataConfig::default(),
            lists_dir: None,
            cors: CorsConfig::default(),
            request_timeout_secs: None,
            concurrency_limit: None,
            preload_catalog: false,
        }
    }
}

/// Location of the two catalog datasets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory containing the dataset files.
    pub dir: PathBuf,
    /// File name of the entity (info) dataset.
    pub info_file: String,
    /// File name of the attribute (powers) dataset.
    pub powers_file: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("json"),
            info_file: "superhero_info.json".to_string(),
            powers_file: "superhero_powers.json".to_string(),
        }
    }
}

impl DataConfig {
    /// Full path of the entity dataset.
    #[must_use]
    pub fn info_path(&self) -> PathBuf {
        self.dir.join(&self.info_file)
    }

    /// Full path of the attribute dataset.
    #[must_use]
    pub fn powers_path(&self) -> PathBuf {
        self.dir.join(&self.powers_file)
    }
}

/// CORS configuration for browser-based access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins. Use `["*"]` to allow all origins (development only).
    /// Empty list disables CORS entirely.
    pub allowed_origins: Vec<String>,

    /// Max age for preflight cache (seconds).
    pub max_age_seconds: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            max_age_seconds: 3600,
        }
    }
}

impl Config {
    /// Loads configuration from `HERODEX_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if any environment variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(port) = env_u16("HERODEX_HTTP_PORT")? {
            config.http_port = port;
        }
        if let Some(debug) = env_bool("HERODEX_DEBUG")? {
            config.debug = debug;
        }

        if let Some(dir) = env_string("HERODEX_DATA_DIR") {
            config.data.dir = PathBuf::from(dir);
        }
        if let Some(file) = env_string("HERODEX_INFO_FILE") {
            config.data.info_file = file;
        }
        if let Some(file) = env_string("HERODEX_POWERS_FILE") {
            config.data.powers_file = file;
        }
        config.lists_dir = env_string("HERODEX_LISTS_DIR").map(PathBuf::from);

        if let Some(origins) = env_string("HERODEX_CORS_ALLOWED_ORIGINS") {
            config.cors.allowed_origins = parse_cors_allowed_origins(&origins);
        }
        if let Some(max_age) = env_u64("HERODEX_CORS_MAX_AGE_SECONDS")? {
            config.cors.max_age_seconds = max_age;
        }

        config.request_timeout_secs = env_u64("HERODEX_REQUEST_TIMEOUT_SECS")?;
        config.concurrency_limit = env_usize("HERODEX_CONCURRENCY_LIMIT")?;
        if let Some(preload) = env_bool("HERODEX_PRELOAD_CATALOG")? {
            config.preload_catalog = preload;
        }

        Ok(config)
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn env_u16(name: &str) -> Result<Option<u16>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<u16>()
        .map(Some)
        .map_err(|e| Error::InvalidInput(format!("{name} must be a u16: {e}")))
}

fn env_u64(name: &str) -> Result<Option<u64>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<u64>()
        .map(Some)
        .map_err(|e| Error::InvalidInput(format!("{name} must be a u64: {e}")))
}

fn env_usize(name: &str) -> Result<Option<usize>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<usize>()
        .map(Some)
        .map_err(|e| Error::InvalidInput(format!("{name} must be a usize: {e}")))
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    let value = value.trim().to_ascii_lowercase();
    match value.as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        _ => Err(Error::InvalidInput(format!(
            "{name} must be a boolean (true/false/1/0)"
        ))),
    }
}

fn env_bool(name: &str) -> Result<Option<bool>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    parse_bool(name, &v).map(Some)
}

fn parse_cors_allowed_origins(value: &str) -> Vec<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if trimmed == "*" {
        return vec!["*".to_string()];
    }

    trimmed
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
