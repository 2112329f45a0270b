use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};

/// Placeholder secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me",
    "changeme",
    "secret",
    "dev-secret-change-me",
    "carlos",
];

/// Runtime configuration, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    pub addr: SocketAddr,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub request_timeout: Duration,
    pub max_body_bytes: usize,
}

impl Config {
    /// Database location only; enough for `denuncias migrate`.
    pub fn db_path_from_env() -> PathBuf {
        std::env::var("DENUNCIAS_DB_PATH")
            .unwrap_or_else(|_| "denuncias.db".into())
            .into()
    }

    pub fn from_env() -> Result<Self> {
        let jwt_secret = std::env::var("DENUNCIAS_JWT_SECRET").unwrap_or_default();
        validate_secret(&jwt_secret)?;

        let host = std::env::var("DENUNCIAS_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = parse_var("DENUNCIAS_PORT", 5000)?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", host, port))?;

        let upload_dir: PathBuf = std::env::var("DENUNCIAS_UPLOAD_DIR")
            .unwrap_or_else(|_| "uploads".into())
            .into();

        let ttl_minutes: i64 = parse_var("DENUNCIAS_TOKEN_TTL_MINUTES", 15)?;
        if ttl_minutes <= 0 {
            bail!("DENUNCIAS_TOKEN_TTL_MINUTES must be positive");
        }

        let timeout_secs: u64 = parse_var("DENUNCIAS_REQUEST_TIMEOUT_SECS", 30)?;
        let max_body_bytes: usize = parse_var("DENUNCIAS_MAX_BODY_BYTES", 16 * 1024 * 1024)?;

        Ok(Self {
            db_path: Self::db_path_from_env(),
            upload_dir,
            addr,
            jwt_secret,
            token_ttl: chrono::Duration::minutes(ttl_minutes),
            request_timeout: Duration::from_secs(timeout_secs),
            max_body_bytes,
        })
    }
}

fn validate_secret(secret: &str) -> Result<()> {
    if secret.trim().is_empty() {
        bail!("DENUNCIAS_JWT_SECRET is unset; provide a signing secret through the environment");
    }
    if PLACEHOLDER_SECRETS.contains(&secret) {
        bail!("DENUNCIAS_JWT_SECRET is still a placeholder value");
    }
    Ok(())
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", name, raw)),
        Err(_) => Ok(default),
    }
}
