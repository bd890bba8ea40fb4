use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub redis: RedisConfig,
    pub admin: AdminConfig,
    pub session: SessionConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Redis,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
    pub namespace: String,  // plays the role of the database name
}

#[derive(Debug, Deserialize, Clone)]
pub struct AdminConfig {
    pub username: String,
    // Either a bcrypt hash or a plaintext password that gets hashed at startup
    pub password_hash: Option<String>,
    pub password: Option<String>,
    pub cpu_sample_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub secure: bool,
    pub inactivity_minutes: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SecurityConfig {
    pub bcrypt_cost: u32,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
impl Config {
    // In-memory configuration with the cheapest bcrypt cost
    pub fn for_tests() -> Self {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 0,
            },
            store: StoreConfig {
                backend: StoreBackend::Memory,
            },
            redis: RedisConfig {
                url: "redis://127.0.0.1:6379/".into(),
                namespace: "bmi_test".into(),
            },
            admin: AdminConfig {
                username: "root".into(),
                password_hash: None,
                password: Some("root-pass".into()),
                cpu_sample_ms: 0,
            },
            session: SessionConfig {
                secure: false,
                inactivity_minutes: 30,
            },
            security: SecurityConfig { bcrypt_cost: 4 },
        }
    }
}
