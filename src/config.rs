use std::{path::PathBuf, str::FromStr};

use crate::error::config::ConfigError;

/// Minimum level of emitted log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub level: LogLevel,
    /// Log file path; logs go to stdout when absent.
    pub file: Option<PathBuf>,
}

#[derive(Clone, Default)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: String,
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("callback_url", &self.callback_url)
            .finish()
    }
}

/// Remote ID generator. Both fields empty selects the local snowflake source.
#[derive(Clone, Default)]
pub struct IdGenConfig {
    pub address: String,
    pub token: String,
}

impl IdGenConfig {
    pub fn is_remote(&self) -> bool {
        !self.address.is_empty()
    }
}

impl std::fmt::Debug for IdGenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdGenConfig")
            .field("address", &self.address)
            .field("token", &"[redacted]")
            .finish()
    }
}

#[derive(Clone)]
pub struct Config {
    pub maintenance_mode: bool,
    pub database_url: String,
    pub valkey_url: String,
    pub log: LogConfig,
    pub oauth: OAuthConfig,
    pub id_gen: IdGenConfig,
    /// Length of the trial subscription granted at registration, in days.
    pub trial_period_days: i64,
    /// Days after expiry during which a lapsed subscription still signs in with a warning.
    pub grace_period_days: i64,
    pub use_subscriptions: bool,
}

// Connection URLs may carry credentials
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("maintenance_mode", &self.maintenance_mode)
            .field("database_url", &"[redacted]")
            .field("valkey_url", &"[redacted]")
            .field("log", &self.log)
            .field("oauth", &self.oauth)
            .field("id_gen", &self.id_gen)
            .field("trial_period_days", &self.trial_period_days)
            .field("grace_period_days", &self.grace_period_days)
            .field("use_subscriptions", &self.use_subscriptions)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            maintenance_mode: false,
            database_url: String::new(),
            valkey_url: String::new(),
            log: LogConfig::default(),
            oauth: OAuthConfig::default(),
            id_gen: IdGenConfig::default(),
            trial_period_days: 14,
            grace_period_days: 3,
            use_subscriptions: true,
        }
    }
}

impl Config {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`, which returns the value of a variable if set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let required = |name: &str| -> Result<String, ConfigError> {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
        };
        let optional = |name: &str| lookup(name).filter(|value| !value.is_empty());

        Ok(Self {
            maintenance_mode: parse_or(&lookup, "MAINTENANCE_MODE", defaults.maintenance_mode)?,
            database_url: required("DATABASE_URL")?,
            valkey_url: required("VALKEY_URL")?,
            log: LogConfig {
                level: parse_or(&lookup, "LOG_LEVEL", defaults.log.level)?,
                file: optional("LOG_FILE").map(PathBuf::from),
            },
            oauth: OAuthConfig {
                client_id: required("OAUTH_CLIENT_ID")?,
                client_secret: required("OAUTH_CLIENT_SECRET")?,
                callback_url: required("OAUTH_CALLBACK_URL")?,
            },
            id_gen: IdGenConfig {
                address: optional("ID_GEN_ADDRESS").unwrap_or_default(),
                token: optional("ID_GEN_TOKEN").unwrap_or_default(),
            },
            trial_period_days: parse_days(&lookup, "TRIAL_PERIOD_DAYS", defaults.trial_period_days)?,
            grace_period_days: parse_days(&lookup, "GRACE_PERIOD_DAYS", defaults.grace_period_days)?,
            use_subscriptions: parse_or(&lookup, "USE_SUBSCRIPTIONS", defaults.use_subscriptions)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, var: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var).filter(|value| !value.is_empty()) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvValue {
                var: var.to_string(),
                reason: e.to_string(),
            }),
    }
}

fn parse_days<F>(lookup: &F, var: &str, default: i64) -> Result<i64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let days = parse_or(lookup, var, default)?;
    if days < 0 {
        return Err(ConfigError::InvalidEnvValue {
            var: var.to_string(),
            reason: format!("must not be negative, got {days}"),
        });
    }
    Ok(days)
}
