use std::env;
use std::time::Duration;

use dotenvy::dotenv;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// How long a toast stays visible before it is removed automatically.
    pub ttl_seconds: u64,
    /// Cap on simultaneously held notifications; oldest are evicted first.
    pub max_visible: usize,
}

impl NotificationConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".into(),
                port: 8080,
            },
            notifications: NotificationConfig {
                ttl_seconds: 5,
                max_visible: 50,
            },
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        dotenv().ok();
        let defaults = AppConfig::default();

        Ok(Self {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: match env::var("SERVER_PORT") {
                    Ok(raw) => raw.parse()?,
                    Err(_) => defaults.server.port,
                },
            },
            notifications: NotificationConfig {
                ttl_seconds: match env::var("NOTIFICATION_TTL_SECONDS") {
                    Ok(raw) => raw.parse()?,
                    Err(_) => defaults.notifications.ttl_seconds,
                },
                max_visible: match env::var("NOTIFICATION_MAX_VISIBLE") {
                    Ok(raw) => raw.parse()?,
                    Err(_) => defaults.notifications.max_visible,
                },
            },
        })
    }
}
