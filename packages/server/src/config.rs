use common::StorageConfig;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use worker::MediaConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
    /// Largest accepted upload body in bytes. Default: 2 GiB.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: u64,
}

fn default_max_upload_size() -> u64 {
    2 * 1024 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ModerationConfig {
    /// Tags rejected at upload, seeded into the database at startup.
    #[serde(default)]
    pub banned_tags: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub moderation: ModerationConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("storage.backend", "filesystem")?
            .set_default("storage.path", "./data/blobs")?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., VIDSHARE__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("VIDSHARE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
