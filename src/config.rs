//! Configuration module for the application server.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - `roost.toml` in the application home
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `ROOST_` and use double underscores
//! to separate nested levels:
//! - `ROOST_HOME=/srv/app` sets `home`
//! - `ROOST_SERVER__PORT=9000` sets `server.port`
//! - `ROOST_WORKERS__COUNT=2` sets `workers.count`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the settings file inside the application home.
pub const CONFIG_FILE: &str = "roost.toml";

/// Environment variable carrying the supervisor's settings to its workers.
pub const WORKER_SETTINGS_ENV: &str = "ROOST_WORKER_SETTINGS";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Name of the application
    #[serde(default = "default_name")]
    pub name: String,

    /// Application home; components live in `{home}/components`
    #[serde(default = "default_home")]
    pub home: PathBuf,

    /// Deployment mode
    #[serde(default)]
    pub mode: RunMode,

    /// HTTP settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Shared config cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Worker pool settings
    #[serde(default)]
    pub workers: WorkerConfig,

    /// Build watcher settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Development,
    Production,
}

impl RunMode {
    pub fn is_production(self) -> bool {
        self == RunMode::Production
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Development => f.write_str("development"),
            RunMode::Production => f.write_str("production"),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Address to bind
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Port shared by every worker
    #[serde(default = "default_port")]
    pub port: u16,

    /// Where unmatched requests are redirected
    #[serde(default = "default_entrypoint")]
    pub entrypoint: String,

    /// Directory (relative to home) served at `/`
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Directory (relative to home) served at `/assets`
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,

    /// Gzip responses (always on in production)
    #[serde(default = "default_false")]
    pub compression: bool,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Directory store shared by all workers
    #[default]
    File,
    /// Per-process store
    Memory,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,

    /// Store directory for the file backend (defaults to `{home}/.roost/cache`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Upper bound on a store round-trip before falling back to disk
    #[serde(default = "default_cache_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WorkerConfig {
    /// Number of worker processes
    #[serde(default = "default_worker_count")]
    pub count: usize,

    /// How long a draining worker may finish in-flight requests
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    /// Delay before replacing a crashed worker
    #[serde(default = "default_restart_delay_ms")]
    pub restart_delay_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BuildConfig {
    /// Watch component sources and restart the pool on rebuild
    #[serde(default = "default_true")]
    pub watch: bool,

    /// Build command (program followed by arguments), run from home
    #[serde(default)]
    pub command: Vec<String>,

    /// Quiet period that closes a burst of source changes
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Paths (relative to home) whose changes never trigger a build
    #[serde(default)]
    pub ignore: Vec<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level for all targets
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-target overrides, e.g. `roost::supervisor = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}
fn default_home() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_entrypoint() -> String {
    "index".to_string()
}
fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}
fn default_assets_dir() -> PathBuf {
    PathBuf::from("assets")
}
fn default_cache_timeout_ms() -> u64 {
    500
}
fn default_worker_count() -> usize {
    num_cpus::get()
}
fn default_grace_period_ms() -> u64 {
    10_000
}
fn default_restart_delay_ms() -> u64 {
    250
}
fn default_debounce_ms() -> u64 {
    300
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: default_name(),
            home: default_home(),
            mode: RunMode::default(),
            server: ServerConfig::default(),
            cache: CacheConfig::default(),
            workers: WorkerConfig::default(),
            build: BuildConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            entrypoint: default_entrypoint(),
            static_dir: default_static_dir(),
            assets_dir: default_assets_dir(),
            compression: false,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            dir: None,
            timeout_ms: default_cache_timeout_ms(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: default_worker_count(),
            grace_period_ms: default_grace_period_ms(),
            restart_delay_ms: default_restart_delay_ms(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            watch: true,
            command: Vec::new(),
            debounce_ms: default_debounce_ms(),
            ignore: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

/// Values given on the command line; they win over every other layer.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub name: Option<String>,
    pub home: Option<PathBuf>,
    pub mode: Option<RunMode>,
    pub port: Option<u16>,
    pub workers: Option<usize>,
}

impl Settings {
    /// Load configuration from all sources.
    ///
    /// The settings file is `config_path` when given, otherwise `roost.toml`
    /// inside the home directory (from the CLI, `ROOST_HOME`, or the
    /// current directory).
    pub fn load(config_path: Option<&Path>, overrides: &Overrides) -> Result<Self, Box<figment::Error>> {
        let config_path = match config_path {
            Some(path) => path.to_path_buf(),
            None => {
                let home = overrides
                    .home
                    .clone()
                    .or_else(|| std::env::var_os("ROOST_HOME").map(PathBuf::from))
                    .unwrap_or_else(default_home);
                home.join(CONFIG_FILE)
            }
        };

        Self::figment(&config_path)
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                settings.apply(overrides);
                settings
            })
    }

    /// Load configuration from a specific file, without CLI overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(path.as_ref()).extract().map_err(Box::new)
    }

    fn figment(config_path: &Path) -> Figment {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(config_path))
            // Layer in environment variables with ROOST_ prefix
            // Use double underscore (__) to separate nested levels
            .merge(
                Env::prefixed("ROOST_")
                    .ignore(&["worker_settings", "worker_id"])
                    .map(|key| key.as_str().to_lowercase().replace("__", ".").into()),
            )
    }

    /// Apply CLI overrides on top of the loaded settings.
    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(name) = &overrides.name {
            self.name = name.clone();
        }
        if let Some(home) = &overrides.home {
            self.home = home.clone();
        }
        if let Some(mode) = overrides.mode {
            self.mode = mode;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(workers) = overrides.workers {
            self.workers.count = workers;
        }
    }

    /// Settings handed down by the supervisor, if this process is a worker.
    pub fn from_worker_env() -> Option<Result<Self, serde_json::Error>> {
        let raw = std::env::var(WORKER_SETTINGS_ENV).ok()?;
        Some(serde_json::from_str(&raw))
    }

    /// Serialized form passed to worker processes.
    pub fn to_worker_env(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn components_dir(&self) -> PathBuf {
        self.home.join("components")
    }

    pub fn static_dir(&self) -> PathBuf {
        self.home.join(&self.server.static_dir)
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.home.join(&self.server.assets_dir)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache
            .dir
            .clone()
            .unwrap_or_else(|| self.home.join(".roost").join("cache"))
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache.timeout_ms)
    }

    /// Path redirected to by the catch-all, always starting with `/`.
    pub fn entrypoint_path(&self) -> String {
        let entrypoint = self.server.entrypoint.trim_start_matches('/');
        format!("/{entrypoint}")
    }

    /// Entrypoint as a component name.
    pub fn entrypoint_component(&self) -> &str {
        self.server.entrypoint.trim_start_matches('/')
    }

    pub fn compression_enabled(&self) -> bool {
        self.server.compression || self.mode.is_production()
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default `roost.toml` in `home`.
    pub fn init_config_file(home: &Path, force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = home.join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        let settings = Settings {
            home: home.to_path_buf(),
            ..Settings::default()
        };
        settings.save(&config_path)?;

        let components = home.join("components");
        if !components.exists() {
            std::fs::create_dir_all(&components)?;
        }

        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.entrypoint, "index");
        assert!(settings.workers.count > 0);
        assert_eq!(settings.cache.backend, CacheBackend::File);
        assert_eq!(settings.mode, RunMode::Development);
        assert!(settings.build.watch);
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE);

        let toml_content = r#"
name = "shop"
mode = "production"

[server]
port = 9000
entrypoint = "home"

[workers]
count = 3
grace_period_ms = 2000

[cache]
backend = "memory"

[build]
command = ["npm", "run", "build"]
"#;

        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.name, "shop");
        assert!(settings.mode.is_production());
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.entrypoint_path(), "/home");
        assert_eq!(settings.workers.count, 3);
        assert_eq!(settings.workers.grace_period_ms, 2000);
        assert_eq!(settings.cache.backend, CacheBackend::Memory);
        assert_eq!(settings.build.command, vec!["npm", "run", "build"]);
        // Production forces compression on
        assert!(settings.compression_enabled());
    }

    #[test]
    fn test_partial_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE);

        fs::write(&config_path, "[server]\nport = 7000\n").unwrap();

        let settings = Settings::load_from(&config_path).unwrap();

        // Modified values
        assert_eq!(settings.server.port, 7000);

        // Default values should still be present
        assert_eq!(settings.server.entrypoint, "index");
        assert_eq!(settings.cache.timeout_ms, 500);
        assert_eq!(settings.build.debounce_ms, 300);
    }

    #[test]
    fn test_overrides_win() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&config_path, "[server]\nport = 7000\n").unwrap();

        let overrides = Overrides {
            home: Some(temp_dir.path().to_path_buf()),
            port: Some(7100),
            workers: Some(1),
            ..Overrides::default()
        };
        let settings = Settings::load(Some(&config_path), &overrides).unwrap();
        assert_eq!(settings.server.port, 7100);
        assert_eq!(settings.workers.count, 1);
        assert_eq!(settings.home, temp_dir.path());
        assert_eq!(settings.components_dir(), temp_dir.path().join("components"));
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE);

        let mut settings = Settings::default();
        settings.server.port = 9999;
        settings.workers.count = 2;
        settings.save(&config_path).unwrap();

        let loaded = Settings::load_from(&config_path).unwrap();
        assert_eq!(loaded.server.port, 9999);
        assert_eq!(loaded.workers.count, 2);
    }

    #[test]
    fn test_worker_env_round_trip_keeps_paths() {
        let mut settings = Settings::default();
        settings.home = PathBuf::from("/srv/app");
        settings.cache.dir = Some(PathBuf::from("/var/cache/roost"));

        let encoded = settings.to_worker_env().unwrap();
        let decoded: Settings = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.home, PathBuf::from("/srv/app"));
        assert_eq!(decoded.cache_dir(), PathBuf::from("/var/cache/roost"));
    }

    #[test]
    fn test_default_cache_dir_under_home() {
        let settings = Settings {
            home: PathBuf::from("/srv/app"),
            ..Settings::default()
        };
        assert_eq!(settings.cache_dir(), PathBuf::from("/srv/app/.roost/cache"));
    }
}
