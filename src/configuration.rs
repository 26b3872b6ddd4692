use std::time::Duration;

use config::Config;

#[derive(Debug, serde::Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Settings {
    /// Load settings from the given files (later files override earlier ones),
    /// then from `APP_*` environment variables, e.g. `APP_DATABASE__URL`.
    pub fn try_load<P: AsRef<str>>(paths: &[P]) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder();
        for path in paths {
            builder = builder.add_source(config::File::with_name(path.as_ref()));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        settings.try_deserialize::<Self>()
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

#[derive(Debug, serde::Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

#[derive(Debug, serde::Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_access_token_ttl")]
    pub access_token_ttl_secs: u64,
    /// Lifetime of email verification and password reset tokens.
    #[serde(default = "default_action_token_ttl")]
    pub action_token_ttl_secs: u64,
}

impl AuthConfig {
    pub fn access_token_ttl(&self) -> Duration {
        Duration::from_secs(self.access_token_ttl_secs)
    }

    pub fn action_token_ttl(&self) -> Duration {
        Duration::from_secs(self.action_token_ttl_secs)
    }
}

fn default_access_token_ttl() -> u64 {
    60 * 60
}

fn default_action_token_ttl() -> u64 {
    24 * 60 * 60
}

#[derive(Debug, serde::Deserialize)]
pub struct LogConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info,sqlx=warn".to_string()
}
