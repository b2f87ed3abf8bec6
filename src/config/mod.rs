//! Configuration loading for the gantry API.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `GANTRY_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, net::SocketAddr, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

const ENV_PREFIX: &str = "GANTRY_";

/// Application configuration derived from `GANTRY_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operator_tokens: Vec<String>,
    /// Redis connection handed to provisioning jobs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_url: Option<String>,
    /// HTTP endpoint receiving analytics events; events are only logged when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics_endpoint: Option<String>,
    #[serde(default)]
    pub github_app: GithubAppConfig,
    #[serde(default)]
    pub token_refresh: TokenRefreshConfig,
    #[serde(default)]
    pub provisioner: ProvisionerConfig,
}

/// GitHub App registration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct GithubAppConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Path to the App's RSA private key (PEM)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_path: Option<PathBuf>,
    #[serde(default = "default_github_oauth_base")]
    pub oauth_base: String,
    #[serde(default = "default_github_api_base")]
    pub api_base: String,
    /// Number of per-installation clients kept alive
    #[serde(default = "default_github_client_cache_size")]
    pub client_cache_size: usize,
}

impl GithubAppConfig {
    /// OAuth token endpoint used for the refresh-token grant
    pub fn token_url(&self) -> String {
        format!(
            "{}/login/oauth/access_token",
            self.oauth_base.trim_end_matches('/')
        )
    }
}

impl Default for GithubAppConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            client_id: None,
            client_secret: None,
            secret_path: None,
            oauth_base: default_github_oauth_base(),
            api_base: default_github_api_base(),
            client_cache_size: default_github_client_cache_size(),
        }
    }
}

/// User token refresh parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct TokenRefreshConfig {
    /// Tokens are treated as expired this many seconds early (default: 10)
    #[serde(default = "default_token_refresh_expiry_leeway_seconds")]
    pub expiry_leeway_seconds: u64,

    /// Lifetime assumed when the token endpoint omits `expires_in` (default: 28800)
    #[serde(default = "default_token_refresh_fallback_ttl_seconds")]
    pub fallback_ttl_seconds: u64,

    /// Timeout for token endpoint requests (default: 30)
    #[serde(default = "default_token_refresh_http_timeout_seconds")]
    pub http_timeout_seconds: u64,
}

/// Thirty days; longer lifetimes are treated as a misconfiguration
const MAX_FALLBACK_TTL_SECONDS: u64 = 30 * 24 * 60 * 60;

impl TokenRefreshConfig {
    /// Validate token refresh configuration bounds
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.expiry_leeway_seconds > 3600 {
            return Err(ConfigError::InvalidTokenRefreshLeeway {
                value: self.expiry_leeway_seconds,
            });
        }

        if !(60..=MAX_FALLBACK_TTL_SECONDS).contains(&self.fallback_ttl_seconds) {
            return Err(ConfigError::InvalidTokenRefreshFallbackTtl {
                value: self.fallback_ttl_seconds,
            });
        }

        if self.http_timeout_seconds == 0 || self.http_timeout_seconds > 300 {
            return Err(ConfigError::InvalidTokenRefreshHttpTimeout {
                value: self.http_timeout_seconds,
            });
        }

        Ok(())
    }
}

impl Default for TokenRefreshConfig {
    fn default() -> Self {
        Self {
            expiry_leeway_seconds: default_token_refresh_expiry_leeway_seconds(),
            fallback_ttl_seconds: default_token_refresh_fallback_ttl_seconds(),
            http_timeout_seconds: default_token_refresh_http_timeout_seconds(),
        }
    }
}

/// Runtime image used by provisioning jobs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ProvisionerConfig {
    #[serde(default)]
    pub image_tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_secret: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_bind_addr: default_api_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            operator_tokens: Vec::new(),
            redis_url: None,
            analytics_endpoint: None,
            github_app: GithubAppConfig::default(),
            token_refresh: TokenRefreshConfig::default(),
            provisioner: ProvisionerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Returns the configured bind address as a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.api_bind_addr.parse()
    }

    pub fn is_local_profile(&self) -> bool {
        matches!(self.profile.as_str(), "local" | "test")
    }

    /// Returns a redacted JSON representation (secrets are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if !config.operator_tokens.is_empty() {
            config.operator_tokens = vec!["[REDACTED]".to_string()];
        }
        config.database_url = strip_password(&config.database_url);
        config.redis_url = config.redis_url.as_deref().map(strip_password);
        if config.github_app.client_secret.is_some() {
            config.github_app.client_secret = Some("[REDACTED]".to_string());
        }
        if config.provisioner.image_pull_secret.is_some() {
            config.provisioner.image_pull_secret = Some("[REDACTED]".to_string());
        }
        serde_json::to_string_pretty(&config)
    }

    /// Validates the configuration, returning an error if required settings are missing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.operator_tokens.is_empty() {
            return Err(ConfigError::MissingOperatorTokens);
        }

        // The GitHub App registration is only required outside local/test
        if !self.is_local_profile() {
            if self.github_app.app_id.is_none() {
                return Err(ConfigError::MissingGithubAppId);
            }
            if self.github_app.client_id.is_none() {
                return Err(ConfigError::MissingGithubClientId);
            }
            if self.github_app.client_secret.is_none() {
                return Err(ConfigError::MissingGithubClientSecret);
            }
            if self.github_app.secret_path.is_none() {
                return Err(ConfigError::MissingGithubAppSecretPath);
            }
            if self.provisioner.image_tag.is_empty() {
                return Err(ConfigError::MissingProvisionerImageTag);
            }
        }

        for (name, value) in [
            ("GITHUB_OAUTH_BASE", &self.github_app.oauth_base),
            ("GITHUB_API_BASE", &self.github_app.api_base),
        ] {
            Url::parse(value).map_err(|source| ConfigError::InvalidUrl {
                name,
                value: value.clone(),
                source,
            })?;
        }
        if let Some(endpoint) = &self.analytics_endpoint {
            Url::parse(endpoint).map_err(|source| ConfigError::InvalidUrl {
                name: "ANALYTICS_ENDPOINT",
                value: endpoint.clone(),
                source,
            })?;
        }

        if self.github_app.client_cache_size == 0 {
            return Err(ConfigError::InvalidGithubClientCacheSize);
        }

        self.token_refresh.validate()?;

        Ok(())
    }
}

/// Removes the password component of a connection URL.
///
/// Values that do not parse as URLs are returned unchanged.
pub fn strip_password(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut parsed) if parsed.password().is_some() => {
            // Only fails for cannot-be-a-base URLs, which carry no password
            let _ = parsed.set_password(None);
            parsed.to_string()
        }
        _ => raw.to_string(),
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_api_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "postgresql://gantry@localhost:5432/gantry".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_ms() -> u64 {
    5000
}

fn default_github_oauth_base() -> String {
    "https://github.com".to_string()
}

fn default_github_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_github_client_cache_size() -> usize {
    128
}

fn default_token_refresh_expiry_leeway_seconds() -> u64 {
    10
}

fn default_token_refresh_fallback_ttl_seconds() -> u64 {
    28800 // 8 hours, GitHub's user-to-server token lifetime
}

fn default_token_refresh_http_timeout_seconds() -> u64 {
    30
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid api bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
    #[error("invalid URL '{value}' for {name}: {source}")]
    InvalidUrl {
        name: &'static str,
        value: String,
        source: url::ParseError,
    },
    #[error("no operator tokens configured; set GANTRY_OPERATOR_TOKEN or GANTRY_OPERATOR_TOKENS")]
    MissingOperatorTokens,
    #[error("GitHub App id is missing; set GANTRY_GITHUB_APP_ID")]
    MissingGithubAppId,
    #[error("GitHub App client ID is missing; set GANTRY_GITHUB_CLIENT_ID")]
    MissingGithubClientId,
    #[error("GitHub App client secret is missing; set GANTRY_GITHUB_CLIENT_SECRET")]
    MissingGithubClientSecret,
    #[error("GitHub App private key path is missing; set GANTRY_GITHUB_APP_SECRET_PATH")]
    MissingGithubAppSecretPath,
    #[error("provisioner image tag is missing; set GANTRY_PROVISIONER_IMAGE_TAG")]
    MissingProvisionerImageTag,
    #[error("GitHub client cache size must be positive")]
    InvalidGithubClientCacheSize,
    #[error("token refresh expiry leeway must be at most 3600 seconds, got {value}")]
    InvalidTokenRefreshLeeway { value: u64 },
    #[error("token refresh fallback TTL must be between 60 and 2592000 seconds, got {value}")]
    InvalidTokenRefreshFallbackTtl { value: u64 },
    #[error("token refresh HTTP timeout must be between 1 and 300 seconds, got {value}")]
    InvalidTokenRefreshHttpTimeout { value: u64 },
}

/// Loads configuration using layered `.env` files and `GANTRY_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads, validates and returns the configuration.
    ///
    /// Precedence, lowest first: `.env`, `.env.local`, `.env.{profile}`,
    /// `.env.{profile}.local`, process environment.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = take_string(&mut layered, "PROFILE").unwrap_or(profile_hint);
        let api_bind_addr =
            take_string(&mut layered, "API_BIND_ADDR").unwrap_or_else(default_api_bind_addr);
        let log_level = take_string(&mut layered, "LOG_LEVEL").unwrap_or_else(default_log_level);
        let log_format =
            take_string(&mut layered, "LOG_FORMAT").unwrap_or_else(default_log_format);
        let database_url =
            take_string(&mut layered, "DATABASE_URL").unwrap_or_else(default_database_url);
        let db_max_connections = take_parsed(&mut layered, "DB_MAX_CONNECTIONS")?
            .unwrap_or_else(default_db_max_connections);
        let db_acquire_timeout_ms = take_parsed(&mut layered, "DB_ACQUIRE_TIMEOUT_MS")?
            .unwrap_or_else(default_db_acquire_timeout_ms);

        // Support both a single token and a comma-separated list
        let operator_tokens = if let Some(tokens) = layered.remove("OPERATOR_TOKENS") {
            split_list(&tokens)
        } else if let Some(token) = take_string(&mut layered, "OPERATOR_TOKEN") {
            vec![token]
        } else {
            Vec::new()
        };

        let redis_url = take_string(&mut layered, "REDIS_URL");
        let analytics_endpoint = take_string(&mut layered, "ANALYTICS_ENDPOINT");

        let github_app = GithubAppConfig {
            app_id: take_parsed(&mut layered, "GITHUB_APP_ID")?,
            client_id: take_string(&mut layered, "GITHUB_CLIENT_ID"),
            client_secret: take_string(&mut layered, "GITHUB_CLIENT_SECRET"),
            secret_path: take_string(&mut layered, "GITHUB_APP_SECRET_PATH").map(PathBuf::from),
            oauth_base: take_string(&mut layered, "GITHUB_OAUTH_BASE")
                .unwrap_or_else(default_github_oauth_base),
            api_base: take_string(&mut layered, "GITHUB_API_BASE")
                .unwrap_or_else(default_github_api_base),
            client_cache_size: take_parsed(&mut layered, "GITHUB_CLIENT_CACHE_SIZE")?
                .unwrap_or_else(default_github_client_cache_size),
        };

        let token_refresh = TokenRefreshConfig {
            expiry_leeway_seconds: take_parsed(&mut layered, "TOKEN_REFRESH_EXPIRY_LEEWAY_SECONDS")?
                .unwrap_or_else(default_token_refresh_expiry_leeway_seconds),
            fallback_ttl_seconds: take_parsed(&mut layered, "TOKEN_REFRESH_FALLBACK_TTL_SECONDS")?
                .unwrap_or_else(default_token_refresh_fallback_ttl_seconds),
            http_timeout_seconds: take_parsed(&mut layered, "TOKEN_REFRESH_HTTP_TIMEOUT_SECONDS")?
                .unwrap_or_else(default_token_refresh_http_timeout_seconds),
        };

        let provisioner = ProvisionerConfig {
            image_tag: take_string(&mut layered, "PROVISIONER_IMAGE_TAG").unwrap_or_default(),
            image_pull_secret: take_string(&mut layered, "PROVISIONER_IMAGE_PULL_SECRET"),
        };

        let config = AppConfig {
            profile,
            api_bind_addr,
            log_level,
            log_format,
            database_url,
            db_max_connections,
            db_acquire_timeout_ms,
            operator_tokens,
            redis_url,
            analytics_endpoint,
            github_app,
            token_refresh,
            provisioner,
        };

        config.validate()?;

        match config.bind_addr() {
            Ok(_) => Ok(config),
            Err(source) => Err(ConfigError::InvalidBindAddr {
                value: config.api_bind_addr.clone(),
                source,
            }),
        }
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var(format!("{ENV_PREFIX}PROFILE"))
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn take_string(values: &mut BTreeMap<String, String>, key: &str) -> Option<String> {
    values
        .remove(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn take_parsed<T: std::str::FromStr>(
    values: &mut BTreeMap<String, String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    take_string(values, key)
        .map(|raw| {
            raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: format!("{ENV_PREFIX}{key}"),
                value: raw,
            })
        })
        .transpose()
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            operator_tokens: vec!["op-token".into()],
            ..AppConfig::default()
        }
    }

    #[test]
    fn default_config_with_operator_token_validates() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn production_profile_requires_github_app() {
        let config = AppConfig {
            profile: "prod".into(),
            ..valid_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingGithubAppId)
        ));

        let config = AppConfig {
            profile: "prod".into(),
            github_app: GithubAppConfig {
                app_id: Some(42),
                client_id: Some("Iv1.abc".into()),
                client_secret: Some("secret".into()),
                secret_path: Some(PathBuf::from("/etc/gantry/app.pem")),
                ..GithubAppConfig::default()
            },
            provisioner: ProvisionerConfig {
                image_tag: "v1.2.3".into(),
                image_pull_secret: None,
            },
            ..valid_config()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn token_refresh_bounds_are_enforced() {
        let mut config = TokenRefreshConfig::default();
        assert!(config.validate().is_ok());

        config.fallback_ttl_seconds = 10;
        assert!(config.validate().is_err());

        config.fallback_ttl_seconds = u64::MAX;
        assert!(config.validate().is_err());

        config = TokenRefreshConfig {
            http_timeout_seconds: 0,
            ..TokenRefreshConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn redacted_json_hides_secrets() {
        let config = AppConfig {
            database_url: "postgresql://gantry:hunter2@db:5432/gantry".into(),
            redis_url: Some("redis://:redispass@cache:6379".into()),
            github_app: GithubAppConfig {
                client_secret: Some("client-secret".into()),
                ..GithubAppConfig::default()
            },
            ..valid_config()
        };

        let json = config.redacted_json().unwrap();
        assert!(!json.contains("op-token"));
        assert!(!json.contains("hunter2"));
        assert!(!json.contains("redispass"));
        assert!(!json.contains("client-secret"));
        assert!(json.contains("db:5432"));
    }

    #[test]
    fn strip_password_leaves_plain_values_alone() {
        assert_eq!(strip_password("not a url"), "not a url");
        assert_eq!(
            strip_password("postgresql://user@host/db"),
            "postgresql://user@host/db"
        );
        assert_eq!(
            strip_password("postgresql://user:pw@host/db"),
            "postgresql://user@host/db"
        );
    }

    #[test]
    fn token_url_joins_oauth_base() {
        let config = GithubAppConfig {
            oauth_base: "https://github.example.com/".into(),
            ..GithubAppConfig::default()
        };
        assert_eq!(
            config.token_url(),
            "https://github.example.com/login/oauth/access_token"
        );
    }
}
