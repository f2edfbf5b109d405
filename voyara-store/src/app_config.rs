use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub kafka: KafkaConfig,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
    #[serde(default)]
    pub rate_limits: RateLimits,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    /// Adds error detail to 500 responses.
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default = "default_request_ttl_hours")]
    pub request_ttl_hours: u64,
    #[serde(default = "default_expiry_sweep_seconds")]
    pub expiry_sweep_seconds: u64,
    #[serde(default = "default_room_occupancy")]
    pub default_room_occupancy: u32,
}

fn default_request_ttl_hours() -> u64 { 48 }
fn default_expiry_sweep_seconds() -> u64 { 60 }
fn default_room_occupancy() -> u32 { 3 }

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            request_ttl_hours: default_request_ttl_hours(),
            expiry_sweep_seconds: default_expiry_sweep_seconds(),
            default_room_occupancy: default_room_occupancy(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimits {
    pub impressions_per_minute: u32,
    pub clicks_per_minute: u32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            impressions_per_minute: 60,
            clicks_per_minute: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    #[serde(default)]
    pub enabled: bool,
    pub brokers: String,
    pub topic: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides are optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Untracked local overrides
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `VOYARA__APP__DEBUG=true` sets `app.debug`
            .add_source(config::Environment::with_prefix("VOYARA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_optional_sections() {
        let raw = r#"
            [server]
            port = 8080
            [database]
            url = "postgres://localhost/voyara"
            [redis]
            url = "redis://localhost"
            [kafka]
            brokers = "localhost:9092"
            topic = "service-requests.events"
            [auth]
            jwt_secret = "secret"
            [business_rules]
        "#;

        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert!(!config.app.debug);
        assert_eq!(config.storage.backend, StorageBackend::Postgres);
        assert_eq!(config.business_rules.request_ttl_hours, 48);
        assert_eq!(config.business_rules.default_room_occupancy, 3);
        assert_eq!(config.rate_limits.impressions_per_minute, 60);
        assert_eq!(config.rate_limits.clicks_per_minute, 30);
        assert!(!config.kafka.enabled);
    }
}
