use std::str::FromStr;

use anyhow::{Context, Result, anyhow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DatabaseDriver {
    Postgres,
    Memory,
}

impl FromStr for DatabaseDriver {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(DatabaseDriver::Postgres),
            "memory" => Ok(DatabaseDriver::Memory),
            other => Err(anyhow!(
                "unsupported DATABASE_DRIVER '{other}', expecting postgres or memory"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(crate) database_driver: DatabaseDriver,
    pub(crate) database_url: Option<String>,
    pub(crate) database_max_connections: u32,
    pub(crate) jwt_secret: String,
    pub(crate) jwt_access_ttl_seconds: i64,
    pub(crate) jwt_refresh_ttl_seconds: i64,
    pub(crate) http_addr: String,
    pub(crate) cors_origins: Vec<String>,
    pub(crate) log_level: String,
    pub(crate) http_request_body_limit_bytes: usize,
    pub(crate) http_concurrency_limit: usize,
    pub(crate) http_request_timeout_secs: u64,
    pub(crate) rate_limit_per_second: u64,
}

impl Settings {
    pub(crate) fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let database_driver: DatabaseDriver = env
            .get("DATABASE_DRIVER")
            .unwrap_or_else(|| "postgres".to_string())
            .parse()?;
        let database_url = match database_driver {
            DatabaseDriver::Postgres => {
                Some(env.required("DATABASE_URL").context("DATABASE_URL is required")?)
            }
            DatabaseDriver::Memory => env.get("DATABASE_URL"),
        };
        let database_max_connections = env.positive("DATABASE_MAX_CONNECTIONS", 10u32)?;

        let jwt_secret = env.required("JWT_SECRET").context("JWT_SECRET is required")?;
        if jwt_secret.chars().count() < 32 {
            return Err(anyhow!("JWT_SECRET must be at least 32 characters"));
        }
        let jwt_access_ttl_seconds = env.positive("JWT_ACCESS_TTL_SECONDS", 3600i64)?;
        let jwt_refresh_ttl_seconds = env.positive("JWT_REFRESH_TTL_SECONDS", 86400i64)?;
        if jwt_refresh_ttl_seconds < jwt_access_ttl_seconds {
            return Err(anyhow!(
                "JWT_REFRESH_TTL_SECONDS must be >= JWT_ACCESS_TTL_SECONDS"
            ));
        }

        let http_addr = env
            .get("HTTP_ADDR")
            .unwrap_or_else(|| "127.0.0.1:8081".to_string());
        let cors_origins =
            parse_cors_origins(&env.get("CORS_ORIGINS").unwrap_or_else(|| "*".to_string()));
        let log_level = env
            .get("LOG_LEVEL")
            .or_else(|| env.get("RUST_LOG"))
            .unwrap_or_else(|| "info".to_string());

        Ok(Self {
            database_driver,
            database_url,
            database_max_connections,
            jwt_secret,
            jwt_access_ttl_seconds,
            jwt_refresh_ttl_seconds,
            http_addr,
            cors_origins,
            log_level,
            http_request_body_limit_bytes: env
                .positive("HTTP_REQUEST_BODY_LIMIT_BYTES", 1024 * 1024usize)?,
            http_concurrency_limit: env.positive("HTTP_CONCURRENCY_LIMIT", 256usize)?,
            http_request_timeout_secs: env.positive("HTTP_REQUEST_TIMEOUT_SECS", 10u64)?,
            rate_limit_per_second: env.positive("RATE_LIMIT_PER_SECOND", 10u64)?,
        })
    }
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, key: &str) -> Result<String> {
        self.get(key)
            .ok_or_else(|| anyhow!("{key} must be set and not empty"))
    }

    fn positive<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr + PartialOrd + Default + Copy,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        let value = match self.get(key) {
            Some(raw) => raw
                .parse::<T>()
                .with_context(|| format!("Failed to parse {key}, expecting positive integer"))?,
            None => default,
        };

        if value <= T::default() {
            return Err(anyhow!("{key} must be > 0"));
        }
        Ok(value)
    }
}

fn parse_cors_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}
