//! Environment configuration

use anyhow::Context;

use rewards_core::progress::DEFAULT_EFFICIENCY_WINDOW;

/// Runtime configuration read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub admin_token: String,
    pub daily_reset_hour: u32,
    pub efficiency_window: usize,
    pub max_connections: u32,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let admin_token = std::env::var("ADMIN_TOKEN").context("ADMIN_TOKEN must be set")?;

        let config = Self {
            database_url,
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("PORT", 3000)?,
            admin_token,
            daily_reset_hour: parse_var("DAILY_RESET_HOUR", 0)?,
            efficiency_window: parse_var("EFFICIENCY_WINDOW", DEFAULT_EFFICIENCY_WINDOW)?,
            max_connections: parse_var("DB_MAX_CONNECTIONS", 10)?,
        };

        anyhow::ensure!(
            config.daily_reset_hour < 24,
            "DAILY_RESET_HOUR must be between 0 and 23"
        );
        Ok(config)
    }

    /// Address the server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {}={}: {}", name, raw, e)),
        Err(_) => Ok(default),
    }
}
