use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// Placeholder secret shipped in the default config. Startup warns when it is still in use.
pub const DEFAULT_SECRET_KEY: &str = "change-me-in-production";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub security: SecurityConfig,

    pub rate_limits: RateLimitConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/faststack.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Whether to set the Secure flag on the auth cookie.
    /// Set to false for local development without HTTPS.
    pub secure_cookies: bool,

    /// Proxy addresses allowed to supply `X-Forwarded-For`.
    ///
    /// When empty, forwarded headers are ignored for rate-limiting identity and
    /// the socket peer address is used.
    pub trusted_proxy_ips: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_allowed_origins: vec![
                "http://localhost:8000".to_string(),
                "http://127.0.0.1:8000".to_string(),
            ],
            secure_cookies: true,
            trusted_proxy_ips: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// HMAC secret used to sign access tokens.
    pub secret_key: String,

    /// JWT signing algorithm (HS256, HS384 or HS512).
    pub algorithm: String,

    /// Lifetime of an issued access token.
    pub access_token_expire_minutes: u32,

    /// Clock-skew tolerance applied to the `exp` claim.
    pub token_leeway_seconds: u64,

    /// Cookie carrying the access token for web routes.
    pub cookie_name: String,

    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,

    /// Password for the bootstrap `root` account. A random one is generated
    /// and logged once when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_password: Option<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            secret_key: DEFAULT_SECRET_KEY.to_string(),
            algorithm: "HS256".to_string(),
            access_token_expire_minutes: 30,
            token_leeway_seconds: 0,
            cookie_name: "access_token".to_string(),
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            root_password: None,
        }
    }
}

/// A single `limit` per `window_seconds` policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRule {
    pub limit: u32,
    pub window_seconds: u64,
}

impl RateLimitRule {
    #[must_use]
    pub const fn per_minute(limit: u32) -> Self {
        Self {
            limit,
            window_seconds: 60,
        }
    }

    #[must_use]
    pub const fn window(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.window_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub login: RateLimitRule,

    pub register: RateLimitRule,

    pub password_change: RateLimitRule,

    pub subscribe: RateLimitRule,

    pub server_stats: RateLimitRule,

    /// How often idle counters are swept from memory.
    pub sweep_interval_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            login: RateLimitRule::per_minute(5),
            register: RateLimitRule::per_minute(5),
            password_change: RateLimitRule::per_minute(3),
            subscribe: RateLimitRule::per_minute(5),
            server_stats: RateLimitRule::per_minute(10),
            sweep_interval_seconds: 300,
        }
    }
}

impl RateLimitConfig {
    fn rules(&self) -> [(&'static str, RateLimitRule); 5] {
        [
            ("login", self.login),
            ("register", self.register),
            ("password_change", self.password_change),
            ("subscribe", self.subscribe),
            ("server_stats", self.server_stats),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub json_logs: bool,

    pub loki_enabled: bool,

    pub loki_url: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            json_logs: false,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
        }
    }
}

impl Config {
    /// Loads `.env`, the first config file found, then environment overrides.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = Self::load_file()?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        for path in &Self::config_paths() {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Applies the conventional environment variables on top of file values.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.general.database_path = url;
        }
        if let Some(secret) = lookup("SECRET_KEY") {
            self.security.secret_key = secret;
        }
        if let Some(algorithm) = lookup("ALGORITHM") {
            self.security.algorithm = algorithm;
        }
        if let Some(minutes) = lookup("ACCESS_TOKEN_EXPIRE_MINUTES") {
            self.security.access_token_expire_minutes = minutes
                .parse()
                .with_context(|| format!("Invalid ACCESS_TOKEN_EXPIRE_MINUTES: {minutes}"))?;
        }
        if let Some(password) = lookup("ROOT_PASSWORD") {
            self.security.root_password = Some(password);
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid PORT: {port}"))?;
        }
        Ok(())
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("faststack").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".faststack").join("config.toml"));
        }

        paths
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = PathBuf::from("config.toml");
        if path.exists() {
            Ok(false)
        } else {
            Self::default().save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.security.secret_key.is_empty() {
            anyhow::bail!("security.secret_key cannot be empty");
        }

        if self.security.secret_key == DEFAULT_SECRET_KEY {
            warn!("security.secret_key is the shipped default; set SECRET_KEY before deploying");
        }

        if self.security.access_token_expire_minutes == 0 {
            anyhow::bail!("security.access_token_expire_minutes must be > 0");
        }

        let algorithm = jsonwebtoken::Algorithm::from_str(&self.security.algorithm)
            .map_err(|_| anyhow::anyhow!("Unknown algorithm: {}", self.security.algorithm))?;
        if !matches!(
            algorithm,
            jsonwebtoken::Algorithm::HS256
                | jsonwebtoken::Algorithm::HS384
                | jsonwebtoken::Algorithm::HS512
        ) {
            anyhow::bail!(
                "security.algorithm must be an HMAC algorithm, got {}",
                self.security.algorithm
            );
        }

        if self.security.cookie_name.is_empty() {
            anyhow::bail!("security.cookie_name cannot be empty");
        }

        for (name, rule) in self.rate_limits.rules() {
            if rule.limit == 0 || rule.window_seconds == 0 {
                anyhow::bail!("rate_limits.{name} must have a non-zero limit and window");
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.security.access_token_expire_minutes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.security.access_token_expire_minutes, 30);
        assert_eq!(config.security.cookie_name, "access_token");
        assert_eq!(config.rate_limits.login, RateLimitRule::per_minute(5));
        assert_eq!(config.rate_limits.password_change.limit, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[security]"));
        assert!(toml_str.contains("[rate_limits.login]"));
        assert!(!toml_str.contains("root_password"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [rate_limits.login]
            limit = 10
            window_seconds = 30
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.rate_limits.login.limit, 10);
        assert_eq!(config.rate_limits.login.window_seconds, 30);

        assert_eq!(config.rate_limits.register, RateLimitRule::per_minute(5));
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("SECRET_KEY", "s3cret"),
            ("ACCESS_TOKEN_EXPIRE_MINUTES", "45"),
            ("DATABASE_URL", "sqlite:/tmp/other.db"),
            ("ROOT_PASSWORD", "hunter22"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env_overrides(|key| env.get(key).map(ToString::to_string))
            .unwrap();

        assert_eq!(config.security.secret_key, "s3cret");
        assert_eq!(config.security.access_token_expire_minutes, 45);
        assert_eq!(config.general.database_path, "sqlite:/tmp/other.db");
        assert_eq!(config.security.root_password.as_deref(), Some("hunter22"));
        assert_eq!(config.token_ttl(), chrono::Duration::minutes(45));
    }

    #[test]
    fn test_invalid_ttl_override_is_rejected() {
        let mut config = Config::default();
        let result = config.apply_env_overrides(|key| {
            (key == "ACCESS_TOKEN_EXPIRE_MINUTES").then(|| "soon".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.security.secret_key.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.security.algorithm = "RS256".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.security.algorithm = "nope".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.rate_limits.subscribe.limit = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.security.access_token_expire_minutes = 0;
        assert!(config.validate().is_err());
    }
}
