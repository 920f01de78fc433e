use config::ConfigError;
use serde::Deserialize;

use crate::auth::HashParams;
use crate::revocation::RevocationPolicy;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub redis: RedisSettings,
    pub jwt: JwtSettings,
    #[serde(default)]
    pub hashing: HashingSettings,
    #[serde(default)]
    pub uploads: UploadSettings,
}

#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

#[derive(Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

/// Revocation store connection settings
#[derive(Deserialize, Clone)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub db: i64,
}

impl RedisSettings {
    pub fn connection_url(&self) -> String {
        match &self.password {
            Some(password) if !password.is_empty() => format!(
                "redis://:{}@{}:{}/{}",
                password, self.host, self.port, self.db
            ),
            _ => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

/// JWT authentication settings
///
/// Lifetimes are expressed in minutes, the store timeout in milliseconds.
#[derive(Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    #[serde(default = "default_access_expiry")]
    pub access_token_expiry_minutes: i64,
    #[serde(default = "default_refresh_expiry")]
    pub refresh_token_expiry_minutes: i64,
    #[serde(default = "default_store_timeout")]
    pub store_timeout_ms: u64,
    #[serde(default)]
    pub revocation_policy: RevocationPolicy,
}

fn default_access_expiry() -> i64 {
    15
}

fn default_refresh_expiry() -> i64 {
    60 * 24
}

fn default_store_timeout() -> u64 {
    2000
}

impl JwtSettings {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_token_expiry_minutes: default_access_expiry(),
            refresh_token_expiry_minutes: default_refresh_expiry(),
            store_timeout_ms: default_store_timeout(),
            revocation_policy: RevocationPolicy::default(),
        }
    }
}

/// Argon2id cost parameters, defaults match [`HashParams::default`]
#[derive(Deserialize, Clone)]
pub struct HashingSettings {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingSettings {
    fn default() -> Self {
        let params = HashParams::default();
        Self {
            memory_kib: params.memory_kib,
            iterations: params.iterations,
            parallelism: params.parallelism,
        }
    }
}

impl From<&HashingSettings> for HashParams {
    fn from(settings: &HashingSettings) -> Self {
        HashParams {
            memory_kib: settings.memory_kib,
            iterations: settings.iterations,
            parallelism: settings.parallelism,
            ..HashParams::default()
        }
    }
}

#[derive(Deserialize, Clone)]
pub struct UploadSettings {
    pub directory: String,
    pub max_file_size_bytes: usize,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            directory: "./uploads".to_string(),
            max_file_size_bytes: 5 * 1024 * 1024,
        }
    }
}

/// Loads `configuration.{yaml,toml,json}` and applies `APP__SECTION__KEY`
/// environment overrides on top.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;
    let settings = settings.try_deserialize::<Settings>()?;

    if settings.jwt.secret.trim().is_empty() {
        return Err(ConfigError::Message("jwt.secret must not be empty".to_string()));
    }

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_settings_defaults() {
        let settings = JwtSettings::new("secret");
        assert_eq!(settings.access_token_expiry_minutes, 15);
        assert_eq!(settings.refresh_token_expiry_minutes, 1440);
        assert_eq!(settings.revocation_policy, RevocationPolicy::FailOpen);
    }

    #[test]
    fn test_redis_url_with_and_without_password() {
        let mut redis = RedisSettings {
            host: "localhost".to_string(),
            port: 6379,
            password: None,
            db: 0,
        };
        assert_eq!(redis.connection_url(), "redis://localhost:6379/0");

        redis.password = Some("hunter2".to_string());
        assert_eq!(redis.connection_url(), "redis://:hunter2@localhost:6379/0");
    }

    #[test]
    fn test_hashing_settings_map_to_params() {
        let params = HashParams::from(&HashingSettings::default());
        assert_eq!(params.memory_kib, 19 * 1024);
        assert_eq!(params.iterations, 2);
        assert_eq!(params.parallelism, 1);
    }
}
