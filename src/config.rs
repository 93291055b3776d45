use std::time::Duration;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub request_timeout: Duration,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;

        let secret = std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        if secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET is empty");
        }

        let jwt = JwtConfig {
            secret,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "authsvc".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "authsvc-users".into()),
        };
        let db_max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);
        let request_timeout = std::env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(10));

        Ok(Self {
            database_url,
            db_max_connections,
            request_timeout,
            jwt,
        })
    }
}
