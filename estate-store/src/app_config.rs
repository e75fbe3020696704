use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// Photos accepted by a single upload request.
    #[serde(default = "default_max_photos")]
    pub max_photos_per_upload: usize,
    /// Events a slow subscriber may fall behind before it starts losing them.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_max_photos() -> usize { 50 }

fn default_event_buffer() -> usize { 256 }

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            max_photos_per_upload: default_max_photos(),
            event_buffer: default_event_buffer(),
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

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Machine-local overrides, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `ESTATE__SERVER__PORT=8080`
            .add_source(config::Environment::with_prefix("ESTATE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
