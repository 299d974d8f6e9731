use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub use common::MqAppConfig;

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
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

/// Public identity of the site, used in mail bodies and the sitemap.
#[derive(Debug, Deserialize, Clone)]
pub struct SiteConfig {
    pub name: String,
    /// Absolute base URL without a trailing slash, e.g. `https://example.com`.
    pub base_url: String,
}

impl SiteConfig {
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Root directory for uploaded media.
    pub media_dir: PathBuf,
    /// URL prefix under which `media_dir` is served.
    pub public_url: String,
    /// Maximum upload size in bytes.
    pub max_upload_size: u64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MailBackend {
    /// Deliver through an SMTP relay.
    Smtp,
    /// Write each message to the log instead of sending it.
    Log,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailConfig {
    pub backend: MailBackend,
    /// `From:` mailbox, e.g. `Beacon <noreply@example.com>`.
    pub from: String,
    pub smtp: SmtpConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutboxConfig {
    /// How often the sweeper scans for undispatched publication events.
    pub sweep_interval_secs: u64,
    /// Events younger than this are left alone; their first delivery may still be in flight.
    pub redeliver_after_secs: i64,
}

/// Account created on startup when no user with `email` exists.
#[derive(Debug, Deserialize, Clone)]
pub struct AdminBootstrapConfig {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub site: SiteConfig,
    pub storage: StorageConfig,
    pub mail: MailConfig,
    #[serde(default)]
    pub mq: MqAppConfig,
    pub outbox: OutboxConfig,
    #[serde(default)]
    pub admin: Option<AdminBootstrapConfig>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder()?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., BEACON__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("BEACON").separator("__"))
            .build()?
            .try_deserialize()
    }

    fn builder() -> Result<config::builder::ConfigBuilder<config::builder::DefaultState>, ConfigError>
    {
        Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("site.name", "Beacon")?
            .set_default("site.base_url", "http://localhost:3000")?
            .set_default("storage.media_dir", "./data/media")?
            .set_default("storage.public_url", "/media")?
            .set_default("storage.max_upload_size", 10 * 1024 * 1024)?
            .set_default("mail.backend", "log")?
            .set_default("mail.from", "Beacon <noreply@localhost>")?
            .set_default("mail.smtp.host", "localhost")?
            .set_default("mail.smtp.port", 587)?
            .set_default("outbox.sweep_interval_secs", 60)?
            .set_default("outbox.redeliver_after_secs", 300)
    }
}
