//! Configuration management for the ATM backend
//!
//! Settings come from environment variables (after loading `.env` if
//! present), with support for different environments (development, staging,
//! production). Any error here aborts startup.

use std::env;
use std::time::Duration;
use thiserror::Error;

use crate::audit::WritePolicy;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid environment value: {0}")]
    InvalidValue(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),
}

/// Application environment
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Parse environment from string
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid environment: '{}'. Expected: dev, staging, or prod",
                s
            ))),
        }
    }

    /// Secure cookies are only set in production
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

/// Settings consumed when wiring the session and ledger services
#[derive(Debug, Clone)]
pub struct SecuritySettings {
    pub jwt_secret: String,
    pub secure_cookies: bool,
    pub secondary_writes: WritePolicy,
    pub login_lockout_threshold: Option<i32>,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Current environment
    pub environment: Environment,

    /// Server port
    pub port: u16,

    /// Maximum database connections
    pub db_max_connections: u32,

    /// Upper bound on any single store call
    pub store_timeout: Duration,

    /// Comma-separated CORS origins allowed to send credentials
    pub cors_allowed_origins: String,

    /// Log level (RUST_LOG)
    pub log_level: String,

    /// HS256 signing secret
    pub jwt_secret: String,

    /// bcrypt work factor for new password and PIN hashes
    pub bcrypt_cost: u32,

    /// Failure policy for audit and history writes
    pub secondary_writes: WritePolicy,

    /// Wrong passwords before a login is locked; `None` disables the lockout
    pub login_lockout_threshold: Option<i32>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .map(|s| Environment::from_str(&s))
            .unwrap_or(Ok(Environment::Development))?;

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?;

        let jwt_secret = lookup("JWT_SECRET")
            .or_else(|| lookup("SECRET_KEY"))
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("JWT_SECRET".to_string()))?;

        let port = lookup("PORT")
            .unwrap_or_else(|| "8000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort("PORT must be a valid number".to_string()))?;

        let db_max_connections = lookup("DB_MAX_CONNECTIONS")
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(5);

        let store_timeout = lookup("STORE_TIMEOUT_SECONDS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(5));

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string());

        let log_level = lookup("RUST_LOG").unwrap_or_else(|| "info".to_string());

        let bcrypt_cost = lookup("BCRYPT_COST")
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(bcrypt::DEFAULT_COST);

        let secondary_writes = match lookup("SECONDARY_WRITES") {
            Some(raw) => WritePolicy::parse(&raw).ok_or_else(|| {
                ConfigError::InvalidValue(format!(
                    "Invalid SECONDARY_WRITES: '{}'. Expected: best_effort or strict",
                    raw
                ))
            })?,
            None => WritePolicy::BestEffort,
        };

        let login_lockout_threshold = match lookup("LOGIN_LOCKOUT_THRESHOLD") {
            Some(raw) => Some(
                raw.parse::<i32>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| {
                        ConfigError::InvalidValue(format!(
                            "Invalid LOGIN_LOCKOUT_THRESHOLD: '{}'",
                            raw
                        ))
                    })?,
            ),
            None => None,
        };

        Ok(Config {
            database_url,
            environment,
            port,
            db_max_connections,
            store_timeout,
            cors_allowed_origins,
            log_level,
            jwt_secret,
            bcrypt_cost,
            secondary_writes,
            login_lockout_threshold,
        })
    }

    /// Origins for the CORS layer
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn security(&self) -> SecuritySettings {
        SecuritySettings {
            jwt_secret: self.jwt_secret.clone(),
            secure_cookies: self.environment.is_production(),
            secondary_writes: self.secondary_writes,
            login_lockout_threshold: self.login_lockout_threshold,
        }
    }

    /// Database URL with the password masked, for logging
    pub fn database_url_masked(&self) -> String {
        if let Some(at_pos) = self.database_url.find('@') {
            if let Some(colon_pos) = self.database_url[..at_pos].rfind(':') {
                let prefix = &self.database_url[..colon_pos + 1];
                let suffix = &self.database_url[at_pos..];
                return format!("{}****{}", prefix, suffix);
            }
        }
        self.database_url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("DATABASE_URL", "postgresql://atm:pw@localhost/atm"),
        ("JWT_SECRET", "test-secret"),
    ];

    #[test]
    fn test_environment_from_str() {
        assert_eq!(
            Environment::from_str("dev").unwrap(),
            Environment::Development
        );
        assert_eq!(
            Environment::from_str("staging").unwrap(),
            Environment::Staging
        );
        assert_eq!(
            Environment::from_str("PROD").unwrap(),
            Environment::Production
        );
        assert!(Environment::from_str("invalid").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&REQUIRED)).unwrap();

        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.port, 8000);
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.store_timeout, Duration::from_secs(5));
        assert_eq!(config.secondary_writes, WritePolicy::BestEffort);
        assert_eq!(config.login_lockout_threshold, None);
        assert!(!config.security().secure_cookies);
    }

    #[test]
    fn test_secret_key_fallback() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgresql://localhost/atm"),
            ("SECRET_KEY", "legacy-secret"),
        ]))
        .unwrap();
        assert_eq!(config.jwt_secret, "legacy-secret");
    }

    #[test]
    fn test_missing_secret_is_error() {
        let err = Config::from_lookup(lookup_from(&[(
            "DATABASE_URL",
            "postgresql://localhost/atm",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref v) if v == "JWT_SECRET"));

        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgresql://localhost/atm"),
            ("JWT_SECRET", "  "),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn test_production_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("ENVIRONMENT", "prod"),
            ("PORT", "9000"),
            ("SECONDARY_WRITES", "strict"),
            ("LOGIN_LOCKOUT_THRESHOLD", "5"),
            ("CORS_ALLOWED_ORIGINS", "https://atm.example.com, https://ops.example.com"),
        ]);
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();

        let security = config.security();
        assert!(security.secure_cookies);
        assert_eq!(security.secondary_writes, WritePolicy::Strict);
        assert_eq!(security.login_lockout_threshold, Some(5));
        assert_eq!(config.port, 9000);
        assert_eq!(
            config.cors_origins(),
            vec!["https://atm.example.com", "https://ops.example.com"]
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "not-a-port"));
        assert!(matches!(
            Config::from_lookup(lookup_from(&pairs)),
            Err(ConfigError::InvalidPort(_))
        ));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SECONDARY_WRITES", "sometimes"));
        assert!(matches!(
            Config::from_lookup(lookup_from(&pairs)),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_database_url_masked() {
        let config = Config::from_lookup(lookup_from(&REQUIRED)).unwrap();
        let masked = config.database_url_masked();
        assert!(masked.contains("****"));
        assert!(!masked.contains(":pw@"));
    }
}
