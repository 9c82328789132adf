//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//!
//! ## Optional
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 8083)
//! - `DB_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `NATS_URL` - Message bus for domain events; events are not published when unset
//! - `STOREFRONT_BASE_DOMAIN` - Parent domain of supplier subdomains (default: toprest.sa)

use std::net::{IpAddr, SocketAddr};
use thiserror::Error;

pub const DEFAULT_BASE_DOMAIN: &str = "toprest.sa";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: IpAddr,
    pub port: u16,
    pub max_connections: u32,
    pub nats_url: Option<String>,
    pub storefront_base_domain: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &"[REDACTED]")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("max_connections", &self.max_connections)
            .field("nats_url", &self.nats_url)
            .field("storefront_base_domain", &self.storefront_base_domain)
            .finish()
    }
}

impl AppConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or_default = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            database_url: get("DATABASE_URL").ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".into()))?,
            host: parse("HOST", &or_default("HOST", "0.0.0.0"))?,
            port: parse("PORT", &or_default("PORT", "8083"))?,
            max_connections: parse("DB_MAX_CONNECTIONS", &or_default("DB_MAX_CONNECTIONS", "10"))?,
            nats_url: get("NATS_URL"),
            storefront_base_domain: or_default("STOREFRONT_BASE_DOMAIN", DEFAULT_BASE_DOMAIN).trim().to_lowercase(),
        })
    }

    pub fn socket_addr(&self) -> SocketAddr { SocketAddr::new(self.host, self.port) }
}

fn parse<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = load(&[("DATABASE_URL", "postgres://localhost/toprest")]).unwrap();
        assert_eq!(cfg.socket_addr().to_string(), "0.0.0.0:8083");
        assert_eq!(cfg.max_connections, 10);
        assert_eq!(cfg.nats_url, None);
        assert_eq!(cfg.storefront_base_domain, "toprest.sa");
    }

    #[test]
    fn test_database_url_required() {
        assert_eq!(load(&[]).unwrap_err(), ConfigError::MissingEnvVar("DATABASE_URL".into()));
        assert!(load(&[("DATABASE_URL", "  ")]).is_err());
    }

    #[test]
    fn test_invalid_port() {
        let err = load(&[("DATABASE_URL", "postgres://x"), ("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(k, _) if k == "PORT"));
    }

    #[test]
    fn test_debug_redacts_database_url() {
        let cfg = load(&[("DATABASE_URL", "postgres://admin:hunter2@db/toprest")]).unwrap();
        assert!(!format!("{cfg:?}").contains("hunter2"));
    }
}
