use std::time::Duration;

use config::{Config, Environment, File};
use sqlx::postgres::PgConnectOptions;

use crate::error::ConfigError;
use crate::store::Role;

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub storage: StorageSettings,
    pub jwt: JwtSettings,
    pub security: SecuritySettings,
    #[serde(default)]
    pub admin: Option<AdminSettings>,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

#[derive(serde::Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct StorageSettings {
    pub backend: StorageBackend,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    pub acquire_timeout_secs: u64,
}

impl DatabaseSettings {
    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db().database(&self.database_name)
    }

    pub fn without_db(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .username(&self.username)
            .password(&self.password)
            .port(self.port)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

/// Token signing settings
///
/// The secrets are optional here so that a missing value surfaces as a
/// dedicated startup error from `TokenIssuer::from_settings` rather than a
/// generic deserialization failure.
#[derive(serde::Deserialize, Clone, Debug)]
pub struct JwtSettings {
    #[serde(default)]
    pub access_secret: Option<String>,
    #[serde(default)]
    pub refresh_secret: Option<String>,
    /// Human duration, e.g. "15m"
    pub access_token_ttl: String,
    /// Human duration, e.g. "7d"
    pub refresh_token_ttl: String,
    pub issuer: String,
}

impl JwtSettings {
    pub fn access_ttl(&self) -> Result<Duration, ConfigError> {
        parse_ttl("jwt.access_token_ttl", &self.access_token_ttl)
    }

    pub fn refresh_ttl(&self) -> Result<Duration, ConfigError> {
        parse_ttl("jwt.refresh_token_ttl", &self.refresh_token_ttl)
    }
}

/// bcrypt work factors
#[derive(serde::Deserialize, Clone, Debug)]
pub struct SecuritySettings {
    pub password_hash_cost: u32,
    pub session_hash_cost: u32,
}

/// Account created at startup if no user with this username exists yet
#[derive(serde::Deserialize, Clone, Debug)]
pub struct AdminSettings {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default = "default_admin_role")]
    pub role: Role,
}

fn default_admin_role() -> Role {
    Role::Admin
}

fn parse_ttl(key: &str, value: &str) -> Result<Duration, ConfigError> {
    let ttl = humantime::parse_duration(value.trim())
        .map_err(|e| ConfigError::InvalidValue(format!("{} = {:?}: {}", key, value, e)))?;
    if ttl.is_zero() {
        return Err(ConfigError::InvalidValue(format!("{} must be positive", key)));
    }
    Ok(ttl)
}

/// Load settings from defaults, an optional `configuration.*` file, `APP__*`
/// variables and finally the conventional `JWT_*` / `PORT` variables.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let port = std::env::var("PORT").ok();

    let settings = Config::builder()
        .set_default("application.host", "127.0.0.1")?
        .set_default("application.port", 3000)?
        .set_default("storage.backend", "postgres")?
        .set_default("database.username", "postgres")?
        .set_default("database.host", "localhost")?
        .set_default("database.port", 5432)?
        .set_default("database.database_name", "session_auth")?
        .set_default("database.acquire_timeout_secs", 2)?
        .set_default("jwt.access_token_ttl", "15m")?
        .set_default("jwt.refresh_token_ttl", "7d")?
        .set_default("jwt.issuer", "session-auth")?
        .set_default("security.password_hash_cost", 12)?
        .set_default("security.session_hash_cost", 10)?
        .add_source(File::with_name("configuration").required(false))
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__"),
        )
        .set_override_option("jwt.access_secret", std::env::var("JWT_SECRET").ok())?
        .set_override_option(
            "jwt.refresh_secret",
            std::env::var("JWT_REFRESH_SECRET").ok(),
        )?
        .set_override_option(
            "jwt.access_token_ttl",
            std::env::var("JWT_EXPIRATION_TIME").ok(),
        )?
        .set_override_option(
            "jwt.refresh_token_ttl",
            std::env::var("JWT_REFRESH_EXPIRATION_TIME").ok(),
        )?
        .set_override_option("application.port", port)?
        .build()?;

    settings
        .try_deserialize::<Settings>()
        .map_err(ConfigError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt(access: &str, refresh: &str) -> JwtSettings {
        JwtSettings {
            access_secret: None,
            refresh_secret: None,
            access_token_ttl: access.to_string(),
            refresh_token_ttl: refresh.to_string(),
            issuer: "test".to_string(),
        }
    }

    #[test]
    fn test_default_ttls_parse() {
        let settings = jwt("15m", "7d");
        assert_eq!(settings.access_ttl().unwrap(), Duration::from_secs(15 * 60));
        assert_eq!(
            settings.refresh_ttl().unwrap(),
            Duration::from_secs(7 * 24 * 60 * 60)
        );
    }

    #[test]
    fn test_invalid_ttl_is_config_error() {
        let settings = jwt("fifteen minutes", "7d");
        assert!(matches!(
            settings.access_ttl(),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_zero_ttl_is_rejected() {
        let settings = jwt("15m", "0s");
        assert!(settings.refresh_ttl().is_err());
    }
}
