use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub token_ttl: chrono::Duration,
    /// Username or email promoted to admin at startup.
    pub bootstrap_admin: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = get("DOCKET_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("DOCKET_JWT_SECRET is unset or still a placeholder");
        }

        let db_path: PathBuf = get("DOCKET_DB_PATH").unwrap_or_else(|| "docket.db".into()).into();
        let host = get("DOCKET_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = get("DOCKET_PORT")
            .unwrap_or_else(|| "5000".into())
            .parse()
            .context("DOCKET_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", host, port))?;
        let ttl_hours: i64 = get("DOCKET_TOKEN_TTL_HOURS")
            .unwrap_or_else(|| "24".into())
            .parse()
            .context("DOCKET_TOKEN_TTL_HOURS must be a whole number of hours")?;
        if ttl_hours <= 0 {
            bail!("DOCKET_TOKEN_TTL_HOURS must be positive");
        }
        let bootstrap_admin = get("DOCKET_BOOTSTRAP_ADMIN").filter(|v| !v.is_empty());

        Ok(Self {
            jwt_secret,
            db_path,
            addr,
            token_ttl: chrono::Duration::hours(ttl_hours),
            bootstrap_admin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("DOCKET_JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.addr, "0.0.0.0:5000".parse().unwrap());
        assert_eq!(config.db_path, PathBuf::from("docket.db"));
        assert_eq!(config.token_ttl, chrono::Duration::hours(24));
        assert!(config.bootstrap_admin.is_none());
    }

    #[test]
    fn placeholder_secret_is_refused() {
        assert!(load(&[]).is_err());
        assert!(load(&[("DOCKET_JWT_SECRET", "dev-secret-change-me")]).is_err());
    }

    #[test]
    fn malformed_numbers_are_errors() {
        assert!(load(&[("DOCKET_JWT_SECRET", "s"), ("DOCKET_PORT", "http")]).is_err());
        assert!(load(&[("DOCKET_JWT_SECRET", "s"), ("DOCKET_TOKEN_TTL_HOURS", "0")]).is_err());
    }
}
