//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: EGP_, nested keys separated by `__`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/egp-service/{service_name}/config.toml
//! 4. System directory: /etc/egp-service/{service_name}/config.toml
//! 5. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "EGP_";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,

    /// Middleware configuration
    #[serde(default)]
    pub middleware: MiddlewareConfig,

    /// Access rules, service user and password hashing
    #[serde(default)]
    pub security: SecurityConfig,

    /// Which user store backs the service
    #[serde(default)]
    pub storage: StorageConfig,

    /// Database configuration (required when `storage.backend = "postgres"`)
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Server-rendered shell pages
    #[serde(default)]
    pub shell: ShellConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    pub name: String,

    /// Address to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level or full `EnvFilter` directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Environment (dev, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl ServiceConfig {
    /// Request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Human-readable multi-line output
    Pretty,
}

/// Middleware configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// Request body size limit in MB
    #[serde(default = "default_body_limit_mb")]
    pub body_limit_mb: usize,

    /// Enable panic recovery middleware
    #[serde(default = "default_true")]
    pub catch_panic: bool,

    /// Enable compression
    #[serde(default = "default_true")]
    pub compression: bool,

    /// CORS mode: permissive, restrictive or disabled
    #[serde(default = "default_cors_mode")]
    pub cors_mode: String,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            body_limit_mb: default_body_limit_mb(),
            catch_panic: true,
            compression: true,
            cors_mode: default_cors_mode(),
        }
    }
}

/// Security configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Realm advertised in `WWW-Authenticate` challenges
    #[serde(default = "default_realm")]
    pub realm: String,

    /// Route patterns reachable without credentials
    ///
    /// Supports an optional method prefix (`GET /path`), `*` for one path
    /// segment, `**` for any number of segments and `{name}` placeholders.
    #[serde(default = "default_permit")]
    pub permit: Vec<String>,

    /// Credentials accepted by HTTP Basic authentication
    #[serde(default)]
    pub user: SecurityUserConfig,

    /// Password hashing parameters
    #[serde(default)]
    pub password: PasswordConfig,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            realm: default_realm(),
            permit: default_permit(),
            user: SecurityUserConfig::default(),
            password: PasswordConfig::default(),
        }
    }
}

/// The single service user for Basic authentication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityUserConfig {
    /// Username (default: "user")
    #[serde(default = "default_security_user")]
    pub name: String,

    /// Plaintext password; a random one is generated at startup when unset
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for SecurityUserConfig {
    fn default() -> Self {
        Self {
            name: default_security_user(),
            password: None,
        }
    }
}

/// Password hashing configuration following OWASP guidelines
///
/// Default values are based on OWASP recommendations for Argon2id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordConfig {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    #[serde(default = "default_memory_cost")]
    pub memory_cost_kib: u32,

    /// Time cost / iterations (default: 3)
    #[serde(default = "default_time_cost")]
    pub time_cost: u32,

    /// Parallelism degree (default: 4)
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,

    /// Minimum password length (default: 8)
    #[serde(default = "default_min_length")]
    pub min_password_length: usize,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_cost_kib: default_memory_cost(),
            time_cost: default_time_cost(),
            parallelism: default_parallelism(),
            min_password_length: default_min_length(),
        }
    }
}

/// Storage backend selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend kind
    #[serde(default)]
    pub backend: StorageBackend,
}

/// Available user stores
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local store, lost on restart
    #[default]
    Memory,
    /// PostgreSQL via sqlx (requires the `database` feature)
    Postgres,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum idle connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,

    /// Maximum retry attempts for establishing database connection
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between retry attempts in seconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

/// Server-rendered shell configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Serve `/`, `/about` and the HTML 404 page
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Application name shown in page headings
    #[serde(default = "default_app_name")]
    pub app_name: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            app_name: default_app_name(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_true() -> bool {
    true
}

fn default_body_limit_mb() -> usize {
    10 // 10 MB
}

fn default_cors_mode() -> String {
    "permissive".to_string()
}

fn default_realm() -> String {
    "egp".to_string()
}

fn default_permit() -> Vec<String> {
    vec![
        "/api/**".to_string(),
        "GET /health".to_string(),
        "GET /ready".to_string(),
    ]
}

fn default_security_user() -> String {
    "user".to_string()
}

fn default_memory_cost() -> u32 {
    65536 // 64 MiB
}

fn default_time_cost() -> u32 {
    3
}

fn default_parallelism() -> u32 {
    4
}

fn default_min_length() -> usize {
    8
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    2
}

fn default_connection_timeout() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_delay() -> u64 {
    2
}

fn default_app_name() -> String {
    "Legacy EGP Application".to_string()
}

impl Config {
    /// Load configuration from all sources
    ///
    /// Searches for config files in this order (first found is used):
    /// 1. Current working directory: ./config.toml
    /// 2. XDG config directory: ~/.config/egp-service/{service_name}/config.toml
    /// 3. System directory: /etc/egp-service/{service_name}/config.toml
    ///
    /// Environment variables (EGP_ prefix) override all file-based configs.
    pub fn load() -> Result<Self> {
        Self::load_with_sources().map(|(config, _)| config)
    }

    /// Like [`Config::load`], also returning the files that were read
    ///
    /// Files are listed lowest precedence first. Loading happens before
    /// tracing is installed, so callers log these afterwards.
    pub fn load_with_sources() -> Result<(Self, Vec<PathBuf>)> {
        let service_name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "egp-service".to_string());

        Self::load_for_service(&service_name)
    }

    /// Load configuration for a specific service name
    pub fn load_for_service(service_name: &str) -> Result<(Self, Vec<PathBuf>)> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Lowest priority first so higher priority files override
        let sources: Vec<PathBuf> = Self::find_config_paths(service_name)
            .into_iter()
            .rev()
            .filter(|path| path.exists())
            .collect();
        for path in &sources {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config = figment.extract()?;
        Ok((config, sources))
    }

    /// Load configuration from a specific file
    ///
    /// This bypasses XDG directories and loads directly from the given path.
    /// Environment variables still take precedence.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }

    /// Find all possible config file paths for a service
    ///
    /// Returns paths in priority order (highest first).
    fn find_config_paths(service_name: &str) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix("egp-service");
        if let Some(path) = xdg_dirs.find_config_file(Path::new(service_name).join("config.toml"))
        {
            paths.push(path);
        }

        paths.push(
            PathBuf::from("/etc/egp-service")
                .join(service_name)
                .join("config.toml"),
        );

        paths
    }

    /// Get database URL
    pub fn database_url(&self) -> Option<&str> {
        self.database.as_ref().map(|db| db.url.as_str())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: "egp-service".to_string(),
                host: default_host(),
                port: default_port(),
                log_level: default_log_level(),
                log_format: LogFormat::default(),
                timeout_secs: default_timeout(),
                environment: default_environment(),
            },
            middleware: MiddlewareConfig::default(),
            security: SecurityConfig::default(),
            storage: StorageConfig::default(),
            database: None,
            shell: ShellConfig::default(),
        }
    }
}
