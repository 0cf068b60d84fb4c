//! Process settings from environment variables (`.env` is loaded by the binary).

use crate::error::ConfigError;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Memory,
}

/// Which HTTP façade serves the route table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrontEnd {
    Router,
    Dispatcher,
}

#[derive(Clone, Debug)]
pub struct MailgunSettings {
    pub domain: String,
    pub api_key: String,
    pub sender: String,
    pub api_base: String,
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: Option<String>,
    pub db_schema: String,
    pub db_max_connections: u32,
    pub auto_create_tables: bool,
    pub store: StoreKind,
    pub bind_addr: SocketAddr,
    pub api_prefix: String,
    pub front_end: FrontEnd,
    pub cors_origin: String,
    pub session_ttl: Duration,
    pub admin_guard: bool,
    pub resources_path: Option<PathBuf>,
    /// Present only when domain, key and sender are all set.
    pub mailgun: Option<MailgunSettings>,
    pub feedback_email: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = get("DATABASE_URL");
        let store = match get("STORE").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("postgres") => StoreKind::Postgres,
            Some("memory") => StoreKind::Memory,
            Some(other) => return Err(setting("STORE", format!("expected postgres or memory, got {}", other))),
        };
        if store == StoreKind::Postgres && database_url.is_none() {
            return Err(setting("DATABASE_URL", "required when STORE=postgres"));
        }

        let front_end = match get("FRONT_END").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("router") => FrontEnd::Router,
            Some("dispatcher") => FrontEnd::Dispatcher,
            Some(other) => return Err(setting("FRONT_END", format!("expected router or dispatcher, got {}", other))),
        };

        let mut api_prefix = get("API_PREFIX").unwrap_or_else(|| "/api".into());
        if !api_prefix.starts_with('/') {
            api_prefix.insert(0, '/');
        }
        while api_prefix.len() > 1 && api_prefix.ends_with('/') {
            api_prefix.pop();
        }

        let mailgun = match (get("MAILGUN_DOMAIN"), get("MAILGUN_API_KEY"), get("MAILGUN_SENDER")) {
            (Some(domain), Some(api_key), Some(sender)) => Some(MailgunSettings {
                domain,
                api_key,
                sender,
                api_base: get("MAILGUN_API_BASE").unwrap_or_else(|| "https://api.mailgun.net/v3".into()),
            }),
            _ => None,
        };

        Ok(Settings {
            database_url,
            db_schema: get("DB_SCHEMA").unwrap_or_else(|| "public".into()),
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", get("DB_MAX_CONNECTIONS"), 5)?,
            auto_create_tables: parse_bool("AUTO_CREATE_TABLES", get("AUTO_CREATE_TABLES"), true)?,
            store,
            bind_addr: parse_or("BIND_ADDR", get("BIND_ADDR"), SocketAddr::from(([0, 0, 0, 0], 8080)))?,
            api_prefix,
            front_end,
            cors_origin: get("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".into()),
            session_ttl: Duration::from_secs(parse_or("SESSION_TTL_SECS", get("SESSION_TTL_SECS"), 12 * 60 * 60)?),
            admin_guard: parse_bool("ADMIN_GUARD", get("ADMIN_GUARD"), false)?,
            resources_path: get("RESOURCES_PATH").map(PathBuf::from),
            mailgun,
            feedback_email: get("FEEDBACK_EMAIL"),
        })
    }
}

fn setting(key: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Setting {
        key,
        message: message.into(),
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(s) => s.parse().map_err(|e: T::Err| setting(key, format!("{}: {}", s, e))),
    }
}

fn parse_bool(key: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match raw.as_deref().map(str::to_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(setting(key, format!("not a boolean: {}", other))),
    }
}
