use std::net::SocketAddr;
use std::path::PathBuf;

/// Admin keys shipped in sample `.env` files. The server refuses them.
const PLACEHOLDER_ADMIN_KEYS: &[&str] = &["change-me", "change-me-to-a-random-string", "dev-admin-key"];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("NOOR_ADMIN_KEY is unset or still a placeholder")]
    MissingAdminKey,

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub admin_key: String,
    pub token_ttl_hours: i64,
    pub cleanup_interval_secs: u64,
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
    valid: impl Fn(&T) -> bool,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => match value.trim().parse::<T>() {
            Ok(parsed) if valid(&parsed) => Ok(parsed),
            _ => Err(ConfigError::Invalid { name, value }),
        },
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let admin_key = lookup("NOOR_ADMIN_KEY").unwrap_or_default().trim().to_string();
        if admin_key.is_empty() || PLACEHOLDER_ADMIN_KEYS.contains(&admin_key.as_str()) {
            return Err(ConfigError::MissingAdminKey);
        }

        Ok(Self {
            host: lookup("NOOR_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&lookup, "NOOR_PORT", 3000, |_| true)?,
            db_path: lookup("NOOR_DB_PATH").unwrap_or_else(|| "noor.db".into()).into(),
            admin_key,
            token_ttl_hours: parse_or(&lookup, "NOOR_TOKEN_TTL_HOURS", 24, |h: &i64| (1..=720).contains(h))?,
            cleanup_interval_secs: parse_or(&lookup, "NOOR_CLEANUP_INTERVAL_SECS", 300, |s: &u64| *s > 0)?,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|_| ConfigError::Invalid {
            name: "NOOR_HOST",
            value: self.host.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_the_admin_key_is_set() {
        let cfg = config(&[("NOOR_ADMIN_KEY", "s3cr3t-key")]).unwrap();
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.db_path, PathBuf::from("noor.db"));
        assert_eq!(cfg.token_ttl_hours, 24);
        assert_eq!(cfg.cleanup_interval_secs, 300);
        assert_eq!(cfg.addr().unwrap().port(), 3000);
    }

    #[test]
    fn missing_or_placeholder_admin_key_is_fatal() {
        assert_eq!(config(&[]).unwrap_err(), ConfigError::MissingAdminKey);
        assert_eq!(config(&[("NOOR_ADMIN_KEY", "  ")]).unwrap_err(), ConfigError::MissingAdminKey);
        assert_eq!(
            config(&[("NOOR_ADMIN_KEY", "change-me")]).unwrap_err(),
            ConfigError::MissingAdminKey
        );
    }

    #[test]
    fn malformed_numbers_are_reported_by_name() {
        let err = config(&[("NOOR_ADMIN_KEY", "k"), ("NOOR_PORT", "http")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                name: "NOOR_PORT",
                value: "http".into()
            }
        );

        let err = config(&[("NOOR_ADMIN_KEY", "k"), ("NOOR_TOKEN_TTL_HOURS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "NOOR_TOKEN_TTL_HOURS", .. }));
    }

    #[test]
    fn overrides_are_honoured() {
        let cfg = config(&[
            ("NOOR_ADMIN_KEY", "k"),
            ("NOOR_HOST", "127.0.0.1"),
            ("NOOR_PORT", "8080"),
            ("NOOR_DB_PATH", "/var/lib/noor/canvas.db"),
            ("NOOR_TOKEN_TTL_HOURS", "48"),
        ])
        .unwrap();
        assert_eq!(cfg.addr().unwrap().to_string(), "127.0.0.1:8080");
        assert_eq!(cfg.db_path, PathBuf::from("/var/lib/noor/canvas.db"));
        assert_eq!(cfg.token_ttl_hours, 48);
    }
}
